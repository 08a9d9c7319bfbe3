//! CRL download adapter.
//! Fetches CRLs from the HTTP(S) distribution points named in a certificate,
//! retrying each URL before failing over to the next one.

use crate::domain::{CrlInfo, ParsedCertificate};
use crate::infra::error::{ValidatorError, ValidatorResult};
use crate::services::collaborators::CrlClient;
use async_trait::async_trait;
use std::time::Duration;

/// Configuration for CRL HTTP downloads.
#[derive(Debug, Clone)]
pub struct CrlHttpConfig {
    pub timeout: Duration,
    pub retries_per_url: usize,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for CrlHttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries_per_url: 2,
            retry_delay: Duration::from_millis(500),
            user_agent: concat!("sigchain-validator/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Online CRL client over `reqwest`.
pub struct HttpCrlClient {
    cfg: CrlHttpConfig,
    http: reqwest::Client,
}

impl HttpCrlClient {
    pub fn new(cfg: CrlHttpConfig) -> ValidatorResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self { cfg, http })
    }

    /// Download and parse the first CRL any distribution point serves.
    async fn fetch_first(&self, urls: &[&String]) -> ValidatorResult<CrlInfo> {
        let mut last_err: Option<ValidatorError> = None;
        for (idx, url) in urls.iter().enumerate() {
            log::info!("CRL download attempt {}: {}", idx + 1, url);
            match self.get_with_retries(url).await.and_then(|body| CrlInfo::from_der(&body)) {
                Ok(crl) => return Ok(crl),
                Err(e) => {
                    log::warn!("CRL distribution point {url} failed: {e}");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ValidatorError::RevocationDataError("All CRL distribution points failed".into())
        }))
    }

    async fn get_with_retries(&self, url: &str) -> ValidatorResult<Vec<u8>> {
        let attempts = self.cfg.retries_per_url.max(1);
        let mut last_err: Option<ValidatorError> = None;
        for attempt in 1..=attempts {
            log::debug!("CRL http attempt {attempt} of {attempts} -> {url}");
            match self.single_get(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(self.cfg.retry_delay).await;
                    }
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| ValidatorError::NetworkError(format!("No attempt made for {url}"))))
    }

    async fn single_get(&self, url: &str) -> ValidatorResult<Vec<u8>> {
        let resp = self
            .http
            .get(url)
            .header("Accept", "application/pkix-crl")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ValidatorError::NetworkError(format!(
                "HTTP {} from {url}",
                resp.status()
            )));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl CrlClient for HttpCrlClient {
    async fn fetch(&self, certificate: &ParsedCertificate) -> ValidatorResult<Vec<CrlInfo>> {
        let urls: Vec<&String> = certificate
            .crl_distribution_points
            .iter()
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
            .collect();
        if urls.is_empty() {
            log::debug!("{} names no HTTP CRL distribution point", certificate.display_name());
            return Ok(Vec::new());
        }
        Ok(vec![self.fetch_first(&urls).await?])
    }

    fn is_online(&self) -> bool {
        true
    }
}
