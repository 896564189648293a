use crate::detection::domain::{Deployment, Image, ImageCacheKey, ImageReference};
use crate::ports::outbound::ImageScanner;
use crate::shared::{Capability, CapabilityHandle};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OnceCell, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default ceiling on concurrent scans across all deployments
pub const DEFAULT_MAX_CONCURRENT_SCANS: usize = 20;

/// Default hard timeout for a single scan call
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(6 * 60);

#[derive(Debug, Clone, Copy)]
pub struct EnricherSettings {
    pub max_concurrent_scans: usize,
    pub scan_timeout: Duration,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            max_concurrent_scans: DEFAULT_MAX_CONCURRENT_SCANS,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

/// Resolved value of a cache entry
#[derive(Debug, Clone)]
struct Resolution {
    image: Image,
    /// The image is a placeholder standing in for a failed scan
    fallback: bool,
}

/// One slot per image identity; resolved exactly once and then only read
#[derive(Debug, Default)]
struct ScanCacheEntry {
    resolution: OnceCell<Resolution>,
}

impl ScanCacheEntry {
    fn resolved(image: Image) -> Self {
        Self {
            resolution: OnceCell::from(Resolution {
                image,
                fallback: false,
            }),
        }
    }
}

/// ImageEnricher - resolves container images to vulnerability scans
///
/// All deployments share one cache keyed by image identity. For each key at
/// most one scan is in flight; concurrent callers wait on the same entry.
/// Scans are capped by a global semaphore and a per-call timeout. Failures
/// resolve to an unscanned placeholder so enrichment always completes.
pub struct ImageEnricher {
    scanner: Arc<dyn ImageScanner>,
    cache: DashMap<ImageCacheKey, Arc<ScanCacheEntry>>,
    scan_slots: Arc<Semaphore>,
    scan_timeout: Duration,
    capabilities: CapabilityHandle,
    shutdown: CancellationToken,
}

impl ImageEnricher {
    pub fn new(
        scanner: Arc<dyn ImageScanner>,
        settings: EnricherSettings,
        capabilities: CapabilityHandle,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            scanner,
            cache: DashMap::new(),
            scan_slots: Arc::new(Semaphore::new(
                settings.max_concurrent_scans.min(Semaphore::MAX_PERMITS),
            )),
            scan_timeout: settings.scan_timeout,
            capabilities,
            shutdown,
        }
    }

    /// Resolves every container image of a deployment.
    ///
    /// Containers are resolved concurrently; the result follows container
    /// order regardless of completion order.
    pub async fn enrich(&self, deployment: &Deployment) -> Vec<Image> {
        join_all(
            deployment
                .containers
                .iter()
                .map(|container| self.resolve(&container.image)),
        )
        .await
    }

    /// Resolves one image reference, scanning it on a cache miss
    pub async fn resolve(&self, reference: &ImageReference) -> Image {
        if !self.capabilities.supports(Capability::ImageScanning) {
            return Image::placeholder(reference);
        }

        let key = ImageCacheKey::from_reference(reference);
        if let Some(image) = self.lookup(&key) {
            return with_display_name(image, reference);
        }

        // Atomic get-or-create; the map guard is released before awaiting
        let entry = self
            .cache
            .entry(key.clone())
            .or_insert_with(|| Arc::new(ScanCacheEntry::default()))
            .value()
            .clone();

        let resolution = entry
            .resolution
            .get_or_init(|| self.scan(reference))
            .await
            .clone();

        if resolution.fallback {
            // Let the next lookup retry, unless the entry was already replaced
            self.cache
                .remove_if(&key, |_, current| Arc::ptr_eq(current, &entry));
        }

        with_display_name(resolution.image, reference)
    }

    /// Resolves images from the cache only, never scanning.
    ///
    /// Used by runtime detection, which must not wait on the scan service.
    pub fn cached_images(&self, deployment: &Deployment) -> Vec<Image> {
        deployment
            .containers
            .iter()
            .map(|container| {
                let reference = &container.image;
                match self.lookup(&ImageCacheKey::from_reference(reference)) {
                    Some(image) => with_display_name(image, reference),
                    None => Image::placeholder(reference),
                }
            })
            .collect()
    }

    /// Removes entries matching the given references by id or by full name
    pub fn invalidate(&self, references: &[ImageReference]) {
        for reference in references {
            if !reference.id.is_empty() {
                self.cache.remove(&ImageCacheKey::Id(reference.id.clone()));
            }
            self.cache
                .remove(&ImageCacheKey::Name(reference.full_name.clone()));
        }
        debug!(count = references.len(), "Invalidated image cache entries");
    }

    pub fn remove_all(&self) {
        self.cache.clear();
    }

    /// Installs an image pushed by the control plane as a resolved entry
    pub fn update_image(&self, image: Image) {
        let key = ImageCacheKey::from_image(&image);
        debug!(image = %image.name, "Updating image cache from control plane");
        self.cache
            .insert(key, Arc::new(ScanCacheEntry::resolved(image)));
    }

    /// Makes pending and future scan-slot acquisitions fail fast
    pub fn stop(&self) {
        self.scan_slots.close();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    fn lookup(&self, key: &ImageCacheKey) -> Option<Image> {
        self.cache
            .get(key)
            .and_then(|entry| entry.resolution.get().map(|r| r.image.clone()))
    }

    async fn scan(&self, reference: &ImageReference) -> Resolution {
        let permit = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            permit = self.scan_slots.clone().acquire_owned() => permit.ok(),
        };
        let Some(_permit) = permit else {
            debug!(image = %reference.full_name, "Scan slot unavailable, using unscanned image");
            return fallback(reference);
        };

        let scan = tokio::time::timeout(self.scan_timeout, self.scanner.scan_image(reference));
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                debug!(image = %reference.full_name, "Scan abandoned on shutdown");
                return fallback(reference);
            }
            outcome = scan => outcome,
        };

        match outcome {
            Ok(Ok(image)) => Resolution {
                image,
                fallback: false,
            },
            Ok(Err(e)) => {
                warn!(image = %reference.full_name, error = %e, "Image scan failed");
                fallback(reference)
            }
            Err(_) => {
                warn!(
                    image = %reference.full_name,
                    timeout_secs = self.scan_timeout.as_secs(),
                    "Image scan timed out"
                );
                fallback(reference)
            }
        }
    }
}

fn fallback(reference: &ImageReference) -> Resolution {
    Resolution {
        image: Image::placeholder(reference),
        fallback: true,
    }
}

/// The same digest can be referenced under several names; each caller sees
/// the name its own container used
fn with_display_name(mut image: Image, reference: &ImageReference) -> Image {
    image.name = reference.full_name.clone();
    image
}
