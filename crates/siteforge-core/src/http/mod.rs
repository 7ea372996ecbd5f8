//! Outbound HTTP used for the admin callback and runtime downloads.

use std::time::Duration;

use anyhow::Context;

pub trait HttpClient {
    /// POST url-encoded form fields; any non-success status is an error.
    fn post_form(&self, url: &str, fields: &[(String, String)]) -> anyhow::Result<()>;

    /// GET a resource body; any non-success status is an error.
    fn get_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>>;
}

/// Blocking reqwest client with separate timeouts for calls and downloads.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    download_timeout: Duration,
}

impl ReqwestClient {
    pub fn new(timeout: Duration, download_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("siteforge/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            download_timeout,
        })
    }
}

impl HttpClient for ReqwestClient {
    fn post_form(&self, url: &str, fields: &[(String, String)]) -> anyhow::Result<()> {
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .with_context(|| format!("Failed to POST {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("POST {} returned HTTP {}", url, response.status());
        }
        Ok(())
    }

    fn get_bytes(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .with_context(|| format!("Failed to download {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download: HTTP {} from {}", response.status(), url);
        }

        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read response body from {}", url))?;
        Ok(bytes.to_vec())
    }
}
