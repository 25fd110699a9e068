use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Result, SdkError};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::CouponService(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET and decode; a 404 is `Ok(None)`
    pub async fn get_json_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SdkError::CouponService(format!("GET {} failed: {}", url, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SdkError::CouponService(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let body = response
            .json()
            .await
            .map_err(|e| SdkError::CouponService(format!("JSON parse failed: {}", e)))?;
        Ok(Some(body))
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SdkError::CouponService(format!("GET {} failed: {}", url, e)))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SdkError::CouponService(format!("read body failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new("http://localhost:8080/").unwrap();
        assert_eq!(
            client.url("/coupons/presale/0xab"),
            "http://localhost:8080/coupons/presale/0xab"
        );
        assert_eq!(client.url("health"), "http://localhost:8080/health");
    }
}
