use crate::detection::domain::{
    Image, ImageComponent, ImageReference, ImageScan, Severity, Vulnerability,
};
use crate::ports::outbound::ImageScanner;
use crate::shared::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    id: &'a str,
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    not_pullable: bool,
    #[serde(default)]
    scan: Option<WireScan>,
}

#[derive(Debug, Deserialize)]
struct WireScan {
    #[serde(default)]
    scan_time: Option<DateTime<Utc>>,
    #[serde(default)]
    components: Vec<WireComponent>,
}

#[derive(Debug, Deserialize)]
struct WireComponent {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    vulns: Vec<WireVulnerability>,
}

#[derive(Debug, Deserialize)]
struct WireVulnerability {
    cve: String,
    #[serde(default)]
    cvss: f32,
    #[serde(default)]
    severity: Option<Severity>,
    #[serde(default)]
    fixed_by: Option<String>,
}

/// HttpImageScanner adapter for the remote image scan service
///
/// This adapter implements the ImageScanner port by posting the image
/// reference to `{endpoint}/v1/images/scan` and converting the JSON reply
/// into the domain model. Transport errors are retried a few times; overall
/// time is bounded by the enricher's scan timeout.
pub struct HttpImageScanner {
    client: reqwest::Client,
    scan_url: String,
    max_retries: u32,
}

impl HttpImageScanner {
    const REQUEST_TIMEOUT_SECONDS: u64 = 60;

    /// Creates a scanner client for the given service endpoint
    pub fn new(endpoint: &str) -> Result<Self> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("kube-sensor/{}", version);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::REQUEST_TIMEOUT_SECONDS))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            scan_url: format!("{}/v1/images/scan", endpoint.trim_end_matches('/')),
            max_retries: 3,
        })
    }

    pub fn scan_url(&self) -> &str {
        &self.scan_url
    }

    async fn request_scan(&self, image: &ImageReference) -> Result<ScanResponse> {
        let request = ScanRequest {
            id: &image.id,
            name: &image.full_name,
        };
        let response = self.client.post(&self.scan_url).json(&request).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Scan service returned status code {}", response.status());
        }

        Ok(response.json().await?)
    }

    async fn request_with_retry(&self, image: &ImageReference) -> Result<ScanResponse> {
        let mut attempt = 1;
        loop {
            match self.request_scan(image).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.max_retries => {
                    debug!(image = %image.full_name, attempt, error = %e, "Retrying image scan");
                    tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ImageScanner for HttpImageScanner {
    async fn scan_image(&self, image: &ImageReference) -> Result<Image> {
        let response = self.request_with_retry(image).await?;
        Ok(into_image(image, response))
    }
}

fn into_image(reference: &ImageReference, response: ScanResponse) -> Image {
    Image {
        id: if response.id.is_empty() {
            reference.id.clone()
        } else {
            response.id
        },
        name: reference.full_name.clone(),
        scan: response.scan.map(|scan| ImageScan {
            scan_time: scan.scan_time.unwrap_or_else(Utc::now),
            components: scan
                .components
                .into_iter()
                .map(|component| ImageComponent {
                    name: component.name,
                    version: component.version,
                    vulns: component
                        .vulns
                        .into_iter()
                        .map(|vuln| Vulnerability {
                            severity: vuln
                                .severity
                                .unwrap_or_else(|| Severity::from_cvss_score(vuln.cvss)),
                            cve: vuln.cve,
                            cvss: vuln.cvss,
                            fixed_by: vuln.fixed_by,
                        })
                        .collect(),
                })
                .collect(),
        }),
        not_pullable: response.not_pullable,
    }
}
