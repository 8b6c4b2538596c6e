use std::sync::Arc;

use ethers::prelude::Middleware;
use ethers::providers::{Http, Provider as EthersProvider, ProviderError as EthersProviderError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{BlockId, BlockNumber, Bytes, Filter, Log, TransactionRequest, H160};

pub type ProviderError = EthersProviderError;

/// The JSON-RPC capabilities the watcher needs: `eth_getLogs` and `eth_call`.
/// Tests substitute stub implementations.
#[async_trait::async_trait]
pub trait WatchProvider: Sync + Send {
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError>;

    async fn call(
        &self,
        to: H160,
        data: Bytes,
        block_number: Option<u64>,
    ) -> Result<Bytes, ProviderError>;
}

#[async_trait::async_trait]
impl WatchProvider for EthersProvider<Http> {
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        Middleware::get_logs(self, filter).await
    }

    async fn call(
        &self,
        to: H160,
        data: Bytes,
        block_number: Option<u64>,
    ) -> Result<Bytes, ProviderError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        let block = match block_number {
            Some(number) => BlockId::Number(number.into()),
            None => BlockId::Number(BlockNumber::Latest),
        };

        Middleware::call(self, &tx, Some(block)).await
    }
}

pub fn get(json_rpc_url: &str) -> Result<Arc<EthersProvider<Http>>, ProviderError> {
    let provider = EthersProvider::<Http>::try_from(json_rpc_url)
        .map_err(|error| ProviderError::CustomError(error.to_string()))?;

    Ok(Arc::new(provider))
}
