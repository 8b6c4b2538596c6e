use std::collections::HashMap;
use std::str::FromStr;

use contractwatch::{ProviderError, WatchProvider};
use ethers::types::{Bytes, Filter, FilterBlockOption, Log, H160, H256};

use super::header_hash;

/// Stub JSON-RPC provider: serves logs keyed by the block hash the filter
/// asks for and a fixed `eth_call` return.
#[derive(Default)]
pub struct StubProvider {
    logs_by_block_hash: HashMap<H256, Vec<Log>>,
    call_result: Option<Bytes>,
}

impl StubProvider {
    pub fn with_logs_at(mut self, block_number: i64, logs: Vec<Log>) -> Self {
        self.logs_by_block_hash
            .insert(H256::from_str(&header_hash(block_number)).unwrap(), logs);

        self
    }

    pub fn with_call_result(mut self, result: Bytes) -> Self {
        self.call_result = Some(result);

        self
    }
}

#[async_trait::async_trait]
impl WatchProvider for StubProvider {
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        let logs = match filter.block_option {
            FilterBlockOption::AtBlockHash(hash) => {
                self.logs_by_block_hash.get(&hash).cloned().unwrap_or_default()
            }
            FilterBlockOption::Range { .. } => vec![],
        };

        Ok(logs)
    }

    async fn call(
        &self,
        _to: H160,
        _data: Bytes,
        _block_number: Option<u64>,
    ) -> Result<Bytes, ProviderError> {
        match &self.call_result {
            Some(result) => Ok(result.clone()),
            None => Err(ProviderError::CustomError("execution reverted".to_string())),
        }
    }
}

pub fn empty_provider() -> StubProvider {
    StubProvider::default()
}

#[macro_export]
macro_rules! provider_with_filter_stubber {
    ($filter_stubber:expr) => {{
        use contractwatch::{ProviderError, WatchProvider};
        use ethers::types::{Bytes, Filter, Log, H160};

        struct FilterStubbingProvider;

        #[async_trait::async_trait]
        impl WatchProvider for FilterStubbingProvider {
            async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
                ($filter_stubber)(filter);

                Ok(vec![])
            }

            async fn call(
                &self,
                _to: H160,
                _data: Bytes,
                _block_number: Option<u64>,
            ) -> Result<Bytes, ProviderError> {
                Err(ProviderError::CustomError("execution reverted".to_string()))
            }
        }

        FilterStubbingProvider
    }};
}
