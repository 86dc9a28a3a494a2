use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket refilled continuously at `per_minute` tokens per minute, with a
/// burst of `per_minute`.
#[derive(Clone)]
pub struct RateLimiter {
    per_minute: u32,
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    pub fn new(per_minute: u32) -> Option<Self> {
        (per_minute > 0).then(|| Self {
            per_minute,
            state: Arc::new(Mutex::new(State {
                tokens: per_minute as f64,
                last: Instant::now(),
            })),
        })
    }

    pub async fn check(&self) -> Result<(), String> {
        let capacity = self.per_minute as f64;
        let per_sec = capacity / 60.0;

        let mut state = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(state.last);
        state.last = now;
        state.tokens = (state.tokens + elapsed.as_secs_f64() * per_sec).min(capacity);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }

        let wait = Duration::from_secs_f64((1.0 - state.tokens) / per_sec);
        Err(format!(
            "rate limit exceeded ({} analyses per minute): try again in ~{}s",
            self.per_minute,
            wait.as_secs().max(1)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_disables_limiting() {
        assert!(RateLimiter::new(0).is_none());
    }

    #[tokio::test]
    async fn allows_burst_then_rejects() {
        let limiter = RateLimiter::new(2).unwrap();
        assert!(limiter.check().await.is_ok());
        assert!(limiter.check().await.is_ok());
        let err = limiter.check().await.unwrap_err();
        assert!(err.contains("2 analyses per minute"));
    }

    #[tokio::test]
    async fn clones_share_one_bucket() {
        let limiter = RateLimiter::new(1).unwrap();
        let clone = limiter.clone();
        assert!(limiter.check().await.is_ok());
        assert!(clone.check().await.is_err());
    }
}
