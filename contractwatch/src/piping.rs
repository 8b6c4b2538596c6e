use std::collections::HashMap;
use std::sync::Arc;

use ethers::abi::Token;
use tokio::sync::Mutex;

/// One persisted event row as the poller sees it: the block it occurred at
/// and its indexed arguments by name.
#[derive(Debug, Clone)]
pub struct PipedRow {
    pub block_number: i64,
    pub fields: HashMap<String, Token>,
}

/// Append-only log of persisted event rows, keyed by contract address and
/// event name. The event repository writes it; the method poller reads it
/// strictly afterwards within the same tick.
#[derive(Clone, Default)]
pub struct PipeCache {
    inner: Arc<Mutex<HashMap<(String, String), Vec<PipedRow>>>>,
}

impl PipeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, address: &str, event_name: &str, rows: Vec<PipedRow>) {
        if rows.is_empty() {
            return;
        }

        let mut inner = self.inner.lock().await;
        inner
            .entry((address.to_lowercase(), event_name.to_string()))
            .or_default()
            .extend(rows);
    }

    /// Every cached row for `address` at or before `block_number`, across
    /// all of its events.
    pub async fn rows_for_contract(&self, address: &str, block_number: i64) -> Vec<PipedRow> {
        let address = address.to_lowercase();
        let inner = self.inner.lock().await;

        inner
            .iter()
            .filter(|((row_address, _), _)| *row_address == address)
            .flat_map(|(_, rows)| rows.iter())
            .filter(|row| row.block_number <= block_number)
            .cloned()
            .collect()
    }
}
