use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response body of an ipinfo.io style lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpInfo {
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub loc: Option<String>,
    pub org: Option<String>,
    pub timezone: Option<String>,
}

#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn fetch_public_ip(&self) -> Result<IpInfo>;
}

pub struct IpInfoClient {
    client: Client,
    endpoint: String,
}

impl IpInfoClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl IpLookup for IpInfoClient {
    async fn fetch_public_ip(&self) -> Result<IpInfo> {
        let info = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json::<IpInfo>()
            .await?;

        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ipinfo_body_with_missing_fields() {
        let body = r#"{"ip": "203.0.113.9", "city": "Lisbon", "country": "PT", "readme": "https://ipinfo.io/missingauth"}"#;
        let info: IpInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.ip, "203.0.113.9");
        assert_eq!(info.city.as_deref(), Some("Lisbon"));
        assert_eq!(info.org, None);
    }

    #[test]
    fn body_without_ip_is_rejected() {
        assert!(serde_json::from_str::<IpInfo>(r#"{"city": "Lisbon"}"#).is_err());
    }
}
