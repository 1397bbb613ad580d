use std::collections::HashMap;
use std::sync::Arc;

use jobfeed_storage::LivenessCheck;
use tokio::sync::{Mutex, OnceCell};

/// One liveness outcome per distinct URL for the lifetime of a run.
///
/// A caller claims the URL's cell under the map lock, then probes outside
/// it; a second caller for the same URL awaits the first one's result
/// instead of issuing its own request.
#[derive(Debug, Default)]
pub struct ProbeCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<bool>>>>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_open(&self, url: &str, check: &dyn LivenessCheck) -> bool {
        let cell = {
            let mut entries = self.entries.lock().await;
            entries.entry(url.to_string()).or_default().clone()
        };
        *cell.get_or_init(|| check.probe(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowCounter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LivenessCheck for SlowCounter {
        async fn probe(&self, url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            !url.ends_with("/dead")
        }
    }

    #[tokio::test]
    async fn probes_each_url_once() {
        let cache = ProbeCache::new();
        let check = SlowCounter { calls: AtomicUsize::new(0) };
        assert!(cache.is_open("https://a.io/jobs/1", &check).await);
        assert!(cache.is_open("https://a.io/jobs/1", &check).await);
        assert!(!cache.is_open("https://a.io/jobs/dead", &check).await);
        assert!(!cache.is_open("https://a.io/jobs/dead", &check).await);
        assert_eq!(check.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.entries.lock().await.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_probe() {
        let cache = Arc::new(ProbeCache::new());
        let check = Arc::new(SlowCounter { calls: AtomicUsize::new(0) });

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let check = Arc::clone(&check);
                tokio::spawn(async move { cache.is_open("https://a.io/jobs/7", &*check).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(check.calls.load(Ordering::SeqCst), 1);
    }
}
