use crate::detection::domain::{Image, ImageReference};
use crate::ports::outbound::ImageScanner;
use crate::shared::Result;
use async_trait::async_trait;

/// Scanner used when no scan service is configured
///
/// Every scan fails, so the enricher falls back to unscanned images and
/// retries on the next lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableScanner;

#[async_trait]
impl ImageScanner for UnavailableScanner {
    async fn scan_image(&self, image: &ImageReference) -> Result<Image> {
        anyhow::bail!(
            "No image scan service configured; cannot scan {}",
            image.full_name
        )
    }
}
