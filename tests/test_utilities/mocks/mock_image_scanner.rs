use async_trait::async_trait;
use kube_sensor::detection::domain::ImageScan;
use kube_sensor::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock ImageScanner for testing
///
/// Scans succeed with an empty component list unless the image name was
/// registered as failing. Every call is counted, and an optional delay keeps
/// scans in flight long enough for concurrent callers to pile up.
pub struct MockImageScanner {
    pub delay: Duration,
    pub failing: HashSet<String>,
    pub digests: HashMap<String, String>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockImageScanner {
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            failing: HashSet::new(),
            digests: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_failure(mut self, full_name: &str) -> Self {
        self.failing.insert(full_name.to_string());
        self
    }

    /// Resolved digest reported for an image name
    pub fn with_digest(mut self, full_name: &str, digest: &str) -> Self {
        self.digests
            .insert(full_name.to_string(), digest.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockImageScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageScanner for MockImageScanner {
    async fn scan_image(&self, image: &ImageReference) -> Result<Image> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.contains(&image.full_name) {
            anyhow::bail!("scan service rejected {}", image.full_name);
        }

        let mut scanned = Image::placeholder(image);
        if let Some(digest) = self.digests.get(&image.full_name) {
            scanned.id = digest.clone();
        }
        scanned.scan = Some(ImageScan {
            scan_time: chrono::Utc::now(),
            components: vec![],
        });
        Ok(scanned)
    }
}
