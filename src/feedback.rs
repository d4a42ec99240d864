use std::time::Duration;

use tokio::time::sleep;

pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(1000);

/// Pause between locking an answer and moving on, so the player sees whether
/// the answer was right. Runs on tokio's clock, which tests can pause and
/// advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackDelay(Duration);

impl FeedbackDelay {
    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn none() -> Self {
        Self(Duration::ZERO)
    }

    pub fn duration(&self) -> Duration {
        self.0
    }

    pub async fn pause(&self) {
        if !self.0.is_zero() {
            sleep(self.0).await;
        }
    }
}

impl Default for FeedbackDelay {
    fn default() -> Self {
        Self(DEFAULT_FEEDBACK_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pause_waits_for_the_configured_delay() {
        let delay = FeedbackDelay::new(Duration::from_millis(1500));
        let started = Instant::now();

        delay.pause().await;

        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_returns_immediately() {
        let started = Instant::now();
        FeedbackDelay::none().pause().await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
