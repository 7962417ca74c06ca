//! Token Metadata Lookup
//!
//! Best-effort name/symbol/decimals lookup for a token contract, backed by
//! CoinGecko's contract endpoint. Callers must treat every failure as
//! "no metadata".

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::config::MetadataConfig;
use crate::error::{DashboardError, DashboardResult};

/// Decimals assumed when the lookup yields nothing
pub const DEFAULT_DECIMALS: u32 = 18;

/// What a lookup found; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
}

/// Source of token metadata keyed by `(platform, address)`
#[async_trait]
pub trait TokenMetadataProvider: Send + Sync {
    async fn lookup(&self, platform: &str, address: &str) -> DashboardResult<TokenMetadata>;
}

/// CoinGecko contract lookup
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CoinGeckoClient {
    pub fn new(config: &MetadataConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn contract_url(&self, platform: &str, address: &str) -> String {
        format!(
            "{}/coins/{}/contract/{}",
            self.base_url,
            urlencoding::encode(platform),
            urlencoding::encode(address)
        )
    }
}

#[async_trait]
impl TokenMetadataProvider for CoinGeckoClient {
    async fn lookup(&self, platform: &str, address: &str) -> DashboardResult<TokenMetadata> {
        let url = self.contract_url(platform, address);
        tracing::debug!(%url, "Token metadata lookup");

        let mut request = self.client.get(&url).header("accept", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("x-cg-demo-api-key", &self.api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DashboardError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let contract: ContractResponse = response
            .json()
            .await
            .map_err(|e| DashboardError::Decode(e.to_string()))?;

        Ok(contract.into_metadata(platform))
    }
}

/// Provider used when lookups are switched off
pub struct NoMetadata;

#[async_trait]
impl TokenMetadataProvider for NoMetadata {
    async fn lookup(&self, _platform: &str, _address: &str) -> DashboardResult<TokenMetadata> {
        Ok(TokenMetadata::default())
    }
}

#[derive(Debug, Deserialize)]
struct ContractResponse {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    detail_platforms: HashMap<String, PlatformDetail>,
}

#[derive(Debug, Deserialize)]
struct PlatformDetail {
    #[serde(default)]
    decimal_place: Option<u32>,
}

impl ContractResponse {
    fn into_metadata(self, platform: &str) -> TokenMetadata {
        let decimals = self
            .detail_platforms
            .get(platform)
            .and_then(|detail| detail.decimal_place);

        TokenMetadata {
            name: self.name.filter(|n| !n.is_empty()),
            symbol: self.symbol.filter(|s| !s.is_empty()),
            decimals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contract_response_decimals_for_platform() {
        let response: ContractResponse = serde_json::from_value(json!({
            "name": "Tether",
            "symbol": "usdt",
            "detail_platforms": {
                "ethereum": {"decimal_place": 6, "contract_address": "0xdac17f958d2ee523a2206206994597c13d831ec7"},
                "tron": {"decimal_place": 6}
            }
        }))
        .unwrap();

        let metadata = response.into_metadata("ethereum");
        assert_eq!(metadata.name.as_deref(), Some("Tether"));
        assert_eq!(metadata.symbol.as_deref(), Some("usdt"));
        assert_eq!(metadata.decimals, Some(6));
    }

    #[test]
    fn test_contract_response_missing_platform() {
        let response: ContractResponse = serde_json::from_value(json!({
            "name": "",
            "detail_platforms": {"ethereum": {"decimal_place": null}}
        }))
        .unwrap();

        let metadata = response.into_metadata("solana");
        assert_eq!(metadata, TokenMetadata::default());
    }

    #[test]
    fn test_contract_url_is_encoded() {
        let client = CoinGeckoClient::new(&MetadataConfig {
            base_url: "https://api.coingecko.com/api/v3/".into(),
            api_key: String::new(),
            enabled: true,
        });

        assert_eq!(
            client.contract_url("ethereum", "0xabc/def"),
            "https://api.coingecko.com/api/v3/coins/ethereum/contract/0xabc%2Fdef"
        );
    }
}
