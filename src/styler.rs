//! Prompt validation and style templating.

use std::fmt;

use crate::constants::MAX_PROMPT_CHARS;

/// The fixed set of style tags offered in the generate form.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StyleTag {
    /// Photorealistic output
    Realistic,
    /// Neon/futuristic output
    Cyberpunk,
    /// Flat illustrated output
    Cartoon,
}

impl StyleTag {
    /// All known tags, in form display order.
    pub const ALL: [StyleTag; 3] = [StyleTag::Realistic, StyleTag::Cyberpunk, StyleTag::Cartoon];

    /// Canonical lowercase name for the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            StyleTag::Realistic => "realistic",
            StyleTag::Cyberpunk => "cyberpunk",
            StyleTag::Cartoon => "cartoon",
        }
    }

    /// Parses a tag case-insensitively, `None` for anything unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "realistic" => Some(StyleTag::Realistic),
            "cyberpunk" => Some(StyleTag::Cyberpunk),
            "cartoon" => Some(StyleTag::Cartoon),
            _ => None,
        }
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a submitted prompt was refused.
#[derive(Debug, Eq, PartialEq)]
pub enum PromptValidationError {
    /// Empty or whitespace-only input
    Empty,
    /// Input over the character cap
    TooLong,
}

impl fmt::Display for PromptValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptValidationError::Empty => f.write_str("Prompt cannot be empty."),
            PromptValidationError::TooLong => write!(
                f,
                "Prompt is too long (max {} characters).",
                MAX_PROMPT_CHARS
            ),
        }
    }
}

/// Cleans up a submitted prompt: trims, collapses whitespace runs, enforces
/// the length cap.
pub fn validate_prompt(raw: &str) -> Result<String, PromptValidationError> {
    if raw.trim().is_empty() {
        return Err(PromptValidationError::Empty);
    }
    if raw.chars().count() > MAX_PROMPT_CHARS {
        return Err(PromptValidationError::TooLong);
    }
    Ok(raw.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Appends the fixed style template to the prompt. An unrecognized tag
/// (`None`) leaves the prompt untouched.
pub fn augment_prompt(prompt: &str, style: Option<StyleTag>) -> String {
    match style {
        Some(StyleTag::Realistic) => {
            format!("{prompt}, photorealistic, ultra detailed, natural lighting")
        }
        Some(StyleTag::Cyberpunk) => {
            format!("{prompt}, cyberpunk style, neon lights, futuristic cityscape")
        }
        Some(StyleTag::Cartoon) => {
            format!("{prompt}, cartoon style, bold outlines, flat vibrant colors")
        }
        None => prompt.to_string(),
    }
}
