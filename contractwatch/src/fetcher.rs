use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use derive_more::Display;
use ethers::abi::{Abi, Token};
use ethers::types::{Filter, Log, H160, H256};
use tokio::time::timeout;

use crate::header_repository::Header;
use crate::provider::{ProviderError, WatchProvider};

#[derive(Debug, Display)]
pub enum FetchError {
    #[display(fmt = "provider error: {}", _0)]
    Provider(ProviderError),
    #[display(fmt = "{} deadline exceeded", _0)]
    Timeout(&'static str),
    #[display(fmt = "abi error: {}", _0)]
    Abi(ethers::abi::Error),
    #[display(fmt = "bad header hash: {}", _0)]
    BadHeaderHash(String),
    #[display(fmt = "bad contract address: {}", _0)]
    BadAddress(String),
}

impl From<ProviderError> for FetchError {
    fn from(error: ProviderError) -> Self {
        FetchError::Provider(error)
    }
}

impl From<ethers::abi::Error> for FetchError {
    fn from(error: ethers::abi::Error) -> Self {
        FetchError::Abi(error)
    }
}

/// Issues timeout-bounded `eth_getLogs` and `eth_call` requests. On a
/// deadline the in-flight call is cancelled and the error surfaced; the
/// transformer restarts at the same header on the next tick.
pub struct Fetcher<P: WatchProvider> {
    provider: Arc<P>,
    timeout: Duration,
}

impl<P: WatchProvider> Fetcher<P> {
    pub fn new(provider: Arc<P>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// One batched `eth_getLogs` over every watched address and topic0 at a
    /// single header, filtered by block hash.
    pub async fn fetch_logs(
        &self,
        addresses: &[H160],
        topic0s: &[H256],
        header: &Header,
    ) -> Result<Vec<Log>, FetchError> {
        let block_hash = H256::from_str(&header.hash)
            .map_err(|_| FetchError::BadHeaderHash(header.hash.clone()))?;
        let filter = Filter::new()
            .at_block_hash(block_hash)
            .address(addresses.to_vec())
            .topic0(topic0s.to_vec());

        timeout(self.timeout, self.provider.get_logs(&filter))
            .await
            .map_err(|_| FetchError::Timeout("eth_getLogs"))?
            .map_err(FetchError::from)
    }

    /// Packs a call to `method` with `args`, invokes `eth_call` at
    /// `block_number` (latest when `None` or non-positive) and decodes the
    /// return into tokens.
    pub async fn fetch_contract_data(
        &self,
        abi: &Abi,
        address: &str,
        method: &str,
        args: &[Token],
        block_number: Option<i64>,
    ) -> Result<Vec<Token>, FetchError> {
        let function = abi.function(method)?;
        let calldata = function.encode_input(args)?;
        let to =
            H160::from_str(address).map_err(|_| FetchError::BadAddress(address.to_string()))?;
        let block = block_number.filter(|number| *number > 0).map(|number| number as u64);

        let output = timeout(self.timeout, self.provider.call(to, calldata.into(), block))
            .await
            .map_err(|_| FetchError::Timeout("eth_call"))?
            .map_err(FetchError::from)?;

        function.decode_output(&output).map_err(FetchError::from)
    }
}
