// DeFi Llama protocol listing - no auth, no pagination, one big array
use serde_json::{Map, Value};

use crate::http::{HttpFetcher, Result};

const LLAMA_API_BASE: &str = "https://api.llama.fi";

/// A protocol entry exactly as the API returns it. The schema is open-ended.
pub type RawProtocol = Map<String, Value>;

pub struct LlamaClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl LlamaClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(LLAMA_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(None, "application/json")?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Every protocol DeFi Llama tracks
    pub async fn list_protocols(&self) -> Result<Vec<RawProtocol>> {
        let url = format!("{}/protocols", self.base_url);
        let response = self
            .fetcher
            .get_json::<Vec<RawProtocol>>(&url, "protocol listing")
            .await?;
        Ok(response.body)
    }
}

/// Whether a raw entry lists `chain` in its `chains` array (exact match)
pub fn lists_chain(protocol: &RawProtocol, chain: &str) -> bool {
    protocol
        .get("chains")
        .and_then(Value::as_array)
        .map(|chains| chains.iter().any(|c| c.as_str() == Some(chain)))
        .unwrap_or(false)
}
