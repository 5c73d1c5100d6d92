// DeFi protocol listing: chain filter and the column set derived from the data
use chainscout_api::{llama::lists_chain, LlamaClient, RawProtocol};
use std::collections::BTreeSet;
use tracing::info;

use crate::{models::ProtocolRecord, Result};

pub const DEFAULT_CHAIN: &str = "Solana";

/// Columns worth showing in the short table, in display order
pub const KEY_COLUMNS: [&str; 6] = ["name", "tvl", "category", "change_1d", "change_7d", "url"];

/// Keep entries whose `chains` lists `chain`, in listing order
pub fn filter_by_chain(raw: Vec<RawProtocol>, chain: &str) -> Vec<ProtocolRecord> {
    raw.into_iter()
        .filter(|p| lists_chain(p, chain))
        .map(|p| p.into_iter().collect())
        .collect()
}

/// Protocol rows plus their derived schema.
///
/// The API has no fixed field set, so `columns` is the sorted union of every
/// key seen across `records`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolTable {
    pub columns: Vec<String>,
    pub records: Vec<ProtocolRecord>,
}

impl ProtocolTable {
    pub fn new(records: Vec<ProtocolRecord>) -> Self {
        let columns = records
            .iter()
            .flat_map(|r| r.fields.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self { columns, records }
    }

    /// The subset of `KEY_COLUMNS` that actually shows up in the data
    pub fn key_columns(&self) -> Vec<String> {
        KEY_COLUMNS
            .iter()
            .filter(|k| self.columns.iter().any(|c| c == *k))
            .map(|k| k.to_string())
            .collect()
    }

    /// Cell text for every record, restricted to `columns`
    pub fn rows(&self, columns: &[String]) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| columns.iter().map(|c| r.cell(c)).collect())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetch the full listing and keep the protocols deployed on `chain`
pub async fn fetch_chain_protocols(client: &LlamaClient, chain: &str) -> Result<ProtocolTable> {
    let raw = client.list_protocols().await?;
    let total = raw.len();
    let table = ProtocolTable::new(filter_by_chain(raw, chain));

    info!(
        "{} of {} protocols list {} ({} columns)",
        table.len(),
        total,
        chain,
        table.columns.len()
    );

    Ok(table)
}
