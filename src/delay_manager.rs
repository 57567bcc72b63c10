use std::time::Duration;

use log::info;
use rand::Rng;

/// Politeness delays between chunks and between categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub chunk_delay: Duration,
    pub category_delay: Duration,
    /// Upper bound of the random extra added to each delay.
    pub jitter: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Pacing {
            chunk_delay: Duration::ZERO,
            category_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    pub async fn after_chunk(&self) {
        wait(self.chunk_delay, self.jitter, "Chunk Delay").await;
    }

    pub async fn after_category(&self) {
        wait(self.category_delay, self.jitter, "Category Delay").await;
    }
}

fn with_jitter(base: Duration, jitter: Duration) -> Duration {
    if jitter.is_zero() {
        return base;
    }
    let mut rng = rand::thread_rng();
    base + Duration::from_millis(rng.gen_range(0..=jitter.as_millis() as u64))
}

async fn wait(base: Duration, jitter: Duration, label: &str) {
    let delay = with_jitter(base, jitter);
    if delay.is_zero() {
        return;
    }
    info!("Waiting for {:.1} seconds ({})...", delay.as_secs_f64(), label);
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_stays_within_bounds() {
        let base = Duration::from_secs(2);
        let jitter = Duration::from_millis(500);
        for _ in 0..50 {
            let d = with_jitter(base, jitter);
            assert!(d >= base && d <= base + jitter);
        }
    }

    #[test]
    fn test_no_jitter_is_exact() {
        assert_eq!(
            with_jitter(Duration::from_secs(10), Duration::ZERO),
            Duration::from_secs(10)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_delay_sleeps() {
        let pacing = Pacing {
            chunk_delay: Duration::from_secs(10),
            category_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        };
        let start = tokio::time::Instant::now();
        pacing.after_chunk().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
