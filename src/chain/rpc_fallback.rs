use alloy::providers::{ProviderBuilder, RootProvider};
use alloy::transports::http::{Client, Http};

use crate::error::RelayError;

/// Parse a comma-separated RPC URL string into individual trimmed URLs.
pub fn parse_rpc_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Create alloy HTTP providers for each RPC URL.
pub fn create_providers(urls: &[String]) -> Result<Vec<RootProvider<Http<Client>>>, RelayError> {
    if urls.is_empty() {
        return Err(RelayError::Config(
            "At least one RPC URL is required".to_string(),
        ));
    }
    urls.iter()
        .map(|url| {
            let parsed = url
                .parse()
                .map_err(|e| RelayError::Config(format!("Invalid RPC URL {}: {}", url, e)))?;
            Ok(ProviderBuilder::new().on_http(parsed))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_url() {
        let urls = parse_rpc_urls("https://api.avax-test.network/ext/bc/C/rpc");
        assert_eq!(urls, vec!["https://api.avax-test.network/ext/bc/C/rpc"]);
    }

    #[test]
    fn test_parse_multiple_urls() {
        let urls = parse_rpc_urls(
            "https://data-seed-prebsc-1-s1.binance.org:8545/,https://bsc-testnet.publicnode.com",
        );
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "https://data-seed-prebsc-1-s1.binance.org:8545/");
        assert_eq!(urls[1], "https://bsc-testnet.publicnode.com");
    }

    #[test]
    fn test_parse_trims_and_ignores_empty() {
        let urls = parse_rpc_urls(" https://a.com ,, https://b.com ,");
        assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(parse_rpc_urls("").is_empty());
    }

    #[test]
    fn test_create_providers_multiple() {
        let providers = create_providers(&[
            "http://localhost:8545".to_string(),
            "http://localhost:8546".to_string(),
        ])
        .unwrap();
        assert_eq!(providers.len(), 2);
    }

    #[test]
    fn test_create_providers_rejects_bad_url() {
        assert!(matches!(
            create_providers(&["not a url".to_string()]),
            Err(RelayError::Config(_))
        ));
    }

    #[test]
    fn test_create_providers_empty_fails() {
        assert!(create_providers(&[]).is_err());
    }
}
