//! Fixed-window rate limiting for generation requests.
//!
//! Process-scoped only; nothing is persisted across restarts.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Counts generation requests within a fixed window.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    window_start: Instant,
    count: u32,
}

impl RateLimiter {
    /// Builds a limiter allowing `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Returns true when another request fits in the current window.
    ///
    /// The window restarts once it has fully elapsed; rejected calls do not
    /// count against it or extend it.
    pub fn allow(&self) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.count = 0;
        }
        if state.count >= self.max_requests {
            return false;
        }
        state.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_once_threshold_is_hit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
        // still rejected, the window has not moved
        assert!(!limiter.allow());
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.allow());
        assert!(!limiter.allow());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow());
    }

    #[test]
    fn zero_threshold_rejects_everything() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        assert!(!limiter.allow());
    }
}
