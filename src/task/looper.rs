//! Fixed-interval background loops.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::error;
use log::info;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A unit of work repeated every [`Looper::interval`]. The first run happens immediately.
#[async_trait]
pub trait Looper: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn interval(&self) -> Duration;

    async fn loop_func(&self) -> anyhow::Result<()>;

    /// Runs forever. A failed iteration is logged and the loop carries on.
    async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Starting {} loop every {:.0}s",
            self.name(),
            self.interval().as_secs_f64()
        );
        loop {
            interval.tick().await;
            if let Err(err) = self.loop_func().await {
                error!("{} error: {:?}", self.name(), err);
            }
        }
    }

    fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    struct Counter {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Looper for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(10)
        }

        async fn loop_func(&self) -> anyhow::Result<()> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if run == 0 {
                anyhow::bail!("first run fails");
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_keeps_running_after_errors() {
        let counter = Arc::new(Counter {
            runs: AtomicUsize::new(0),
        });
        let handle = counter.clone().spawn();

        tokio::time::sleep(Duration::from_secs(25)).await;
        handle.abort();

        assert_eq!(counter.runs.load(Ordering::SeqCst), 3);
    }
}
