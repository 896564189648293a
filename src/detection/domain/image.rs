use super::deployment::ImageReference;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vulnerability severity levels, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Maps a CVSS base score onto the CVSS v3 qualitative rating scale
    pub fn from_cvss_score(score: f32) -> Self {
        match score {
            s if s >= 9.0 => Severity::Critical,
            s if s >= 7.0 => Severity::High,
            s if s >= 4.0 => Severity::Medium,
            s if s > 0.0 => Severity::Low,
            _ => Severity::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub cve: String,
    #[serde(default)]
    pub cvss: f32,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub fixed_by: Option<String>,
}

fn default_severity() -> Severity {
    Severity::None
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageComponent {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub vulns: Vec<Vulnerability>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageScan {
    pub scan_time: DateTime<Utc>,
    #[serde(default)]
    pub components: Vec<ImageComponent>,
}

impl ImageScan {
    pub fn vulnerabilities(&self) -> impl Iterator<Item = &Vulnerability> {
        self.components.iter().flat_map(|c| c.vulns.iter())
    }
}

/// Result of resolving an image reference.
///
/// An image without `scan` is an unscanned placeholder: the scan service was
/// unavailable, timed out or failed, and detection proceeds on metadata only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub scan: Option<ImageScan>,
    #[serde(default)]
    pub not_pullable: bool,
}

impl Image {
    /// Builds the unscanned placeholder for a container's image reference
    pub fn placeholder(reference: &ImageReference) -> Self {
        Self {
            id: reference.id.clone(),
            name: reference.full_name.clone(),
            scan: None,
            not_pullable: false,
        }
    }

    pub fn is_scanned(&self) -> bool {
        self.scan.is_some()
    }

    /// Highest CVSS score across all components, 0.0 when unscanned
    pub fn max_cvss(&self) -> f32 {
        self.scan
            .as_ref()
            .map(|scan| scan.vulnerabilities().map(|v| v.cvss).fold(0.0, f32::max))
            .unwrap_or(0.0)
    }
}

/// Key under which an image is cached.
///
/// The content digest is preferred: the same digest referenced under several
/// names shares one entry. Images whose digest is not known yet are keyed by
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageCacheKey {
    Id(String),
    Name(String),
}

impl ImageCacheKey {
    pub fn from_reference(reference: &ImageReference) -> Self {
        if reference.id.is_empty() {
            ImageCacheKey::Name(reference.full_name.clone())
        } else {
            ImageCacheKey::Id(reference.id.clone())
        }
    }

    pub fn from_image(image: &Image) -> Self {
        if image.id.is_empty() {
            ImageCacheKey::Name(image.name.clone())
        } else {
            ImageCacheKey::Id(image.id.clone())
        }
    }
}
