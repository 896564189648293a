use crate::detection::domain::{Image, ImageReference};
use crate::shared::Result;
use async_trait::async_trait;

/// ImageScanner port for resolving an image to its vulnerability scan
///
/// A single stateless call. The enricher guarantees it is invoked at most
/// once per cache miss per image identity, and absorbs every error into an
/// unscanned placeholder.
///
/// Implementations must be `Send + Sync` to support concurrent access.
#[async_trait]
pub trait ImageScanner: Send + Sync {
    /// Scans the image a container references
    ///
    /// # Errors
    /// Returns an error if the scan service is unreachable, rejects the
    /// request, or returns a malformed response.
    async fn scan_image(&self, image: &ImageReference) -> Result<Image>;
}
