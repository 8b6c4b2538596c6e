use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use derive_more::Display;
use ethers::abi::Token;
use ethers::types::{Log, H160, H256};

use crate::config::{ConfigError, WatchConfig};
use crate::contracts::Contract;
use crate::converter::{ConvertError, Converter};
use crate::event_repository::EventRepository;
use crate::fetcher::{FetchError, Fetcher};
use crate::header_repository::{Header, HeaderRepository};
use crate::parser::{AbiError, AbiParser};
use crate::piping::PipeCache;
use crate::poller::{PollError, Poller};
use crate::provider::WatchProvider;
use crate::repos::{Pool, RepoError};
use crate::retriever::BlockRetriever;

#[derive(Debug, Display)]
pub enum WatchError {
    #[display(fmt = "config error: {}", _0)]
    Config(ConfigError),
    #[display(fmt = "abi error: {}", _0)]
    Abi(AbiError),
    #[display(fmt = "repo error: {}", _0)]
    Repo(RepoError),
    #[display(fmt = "fetch error: {}", _0)]
    Fetch(FetchError),
    #[display(fmt = "convert error: {}", _0)]
    Convert(ConvertError),
    #[display(fmt = "poll error: {}", _0)]
    Poll(PollError),
    #[display(fmt = "transformer has no initialized contracts")]
    NoContracts,
}

impl From<ConfigError> for WatchError {
    fn from(error: ConfigError) -> Self {
        WatchError::Config(error)
    }
}

impl From<AbiError> for WatchError {
    fn from(error: AbiError) -> Self {
        WatchError::Abi(error)
    }
}

impl From<RepoError> for WatchError {
    fn from(error: RepoError) -> Self {
        WatchError::Repo(error)
    }
}

impl From<FetchError> for WatchError {
    fn from(error: FetchError) -> Self {
        WatchError::Fetch(error)
    }
}

impl From<ConvertError> for WatchError {
    fn from(error: ConvertError) -> Self {
        WatchError::Convert(error)
    }
}

impl From<PollError> for WatchError {
    fn from(error: PollError) -> Self {
        WatchError::Poll(error)
    }
}

/// Orchestrates the watch pipeline: resolves contracts at init, then walks
/// unchecked headers dispatching fetch, convert, persist, poll and
/// mark-checked per header while advancing the resume cursor.
pub struct Transformer<P: WatchProvider> {
    config: WatchConfig,
    retriever: BlockRetriever,
    fetcher: Fetcher<P>,
    converter: Converter,
    header_repository: HeaderRepository,
    event_repository: EventRepository,
    poller: Poller<P>,
    contracts: HashMap<String, Arc<Contract>>,
    contract_addresses: Vec<H160>,
    event_ids: Vec<String>,
    event_filters: Vec<H256>,
    /// The lowest block the next tick resumes from. Never decreases across
    /// successful ticks.
    pub start: i64,
}

impl<P: WatchProvider> Transformer<P> {
    pub fn new(config: WatchConfig, provider: Arc<P>, pool: Pool) -> Self {
        let timeout = Duration::from_millis(config.call_timeout_ms);
        let cache = PipeCache::new();

        Self {
            retriever: BlockRetriever::new(pool.clone()),
            fetcher: Fetcher::new(provider.clone(), timeout),
            converter: Converter::default(),
            header_repository: HeaderRepository::new(pool.clone()),
            event_repository: EventRepository::new(pool.clone(), cache.clone()),
            poller: Poller::new(Fetcher::new(provider, timeout), pool, cache),
            contracts: HashMap::new(),
            contract_addresses: vec![],
            event_ids: vec![],
            event_filters: vec![],
            start: i64::MAX,
            config,
        }
    }

    /// One-shot setup: resolves each configured contract's ABI, selects its
    /// events and methods, adds a checked-header column per id and seeds the
    /// aggregate filter set. Deterministic for identical inputs; any failure
    /// here is fatal.
    pub async fn init(&mut self) -> Result<(), WatchError> {
        for entry in self.config.contracts.clone() {
            let mut parser = AbiParser::new(&self.config.network);
            match &entry.abi {
                Some(abi) => parser.parse_str(abi)?,
                None => parser.parse(&entry.address).await?,
            }

            let first_block = self.retriever.retrieve_first_block().await?.unwrap_or(0);
            let first_block = first_block.max(entry.starting_block);

            // "name" might not exist on the contract
            let name = match self
                .fetcher
                .fetch_contract_data(parser.parsed_abi()?, &entry.address, "name", &[], None)
                .await
            {
                Ok(tokens) => {
                    tokens.into_iter().next().and_then(Token::into_string).unwrap_or_default()
                }
                Err(error) => {
                    tracing::warn!(
                        address = %entry.address,
                        "error fetching contract name: {error}"
                    );
                    String::new()
                }
            };

            let contract = Contract {
                address: entry.address.clone(),
                name,
                abi: parser.abi()?.to_string(),
                parsed_abi: parser.parsed_abi()?.clone(),
                starting_block: first_block,
                events: parser.get_events(&entry.events)?,
                methods: parser.get_select_methods(&entry.methods)?,
                filter_args: entry.event_args.iter().cloned().collect(),
                method_args: entry.method_args.iter().cloned().collect(),
                piping: entry.piping,
                event_ids: HashMap::new(),
                method_ids: HashMap::new(),
            }
            .init();

            for event in contract.sorted_events() {
                let event_id = contract.event_ids[&event.name].clone();
                self.header_repository.add_check_column(&event_id).await?;
                self.event_ids.push(event_id);
                self.event_filters.push(event.signature());
            }
            for method_id in contract.sorted_method_ids() {
                self.header_repository.add_check_column(&method_id).await?;
            }

            let address: H160 = entry
                .address
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(entry.address.clone()))?;
            self.contract_addresses.push(address);

            if contract.starting_block < self.start {
                self.start = contract.starting_block;
            }

            self.contracts.insert(contract.address.clone(), Arc::new(contract));
        }

        Ok(())
    }

    /// One tick: walks every header missing an event checkmark from `start`
    /// upward. Within a header, event persistence completes before method
    /// polling begins; a failure leaves `start` at the failed header so the
    /// next tick retries it.
    pub async fn execute(&mut self) -> Result<(), WatchError> {
        if self.contracts.is_empty() {
            return Err(WatchError::NoContracts);
        }

        let missing_headers = self
            .header_repository
            .missing_headers_for_all(self.start, -1, &self.event_ids)
            .await?;

        for header in missing_headers {
            // Resume here if this header throws without bringing the
            // execution cycle down.
            self.start = header.block_number;

            let all_logs = self
                .fetcher
                .fetch_logs(&self.contract_addresses, &self.event_filters, &header)
                .await?;

            if all_logs.is_empty() {
                self.header_repository
                    .mark_header_checked_for_all(header.id, &self.event_ids)
                    .await?;
                self.method_polling(&header).await?;
                self.start = header.block_number + 1;
                tracing::trace!(
                    block_number = header.block_number,
                    "no logs found, continuing"
                );
                continue;
            }

            self.process_logs(all_logs, &header).await?;

            self.header_repository
                .mark_header_checked_for_all(header.id, &self.event_ids)
                .await?;
            self.method_polling(&header).await?;
            self.start = header.block_number + 1;
        }

        Ok(())
    }

    async fn process_logs(&mut self, all_logs: Vec<Log>, header: &Header) -> Result<(), WatchError> {
        let mut sorted_logs: HashMap<String, Vec<Log>> = HashMap::new();
        for log in all_logs {
            sorted_logs.entry(format!("{:#x}", log.address)).or_default().push(log);
        }

        let mut addresses: Vec<_> = sorted_logs.keys().cloned().collect();
        addresses.sort();

        for address in addresses {
            let Some(logs) = sorted_logs.remove(&address) else {
                continue;
            };
            let Some(contract) = self.contracts.get(&address).cloned() else {
                tracing::trace!(%address, "logs for unwatched address, skipping");
                continue;
            };

            self.converter.update(contract.clone());
            let converted = self.converter.convert_batch(logs, &contract.events, header.id)?;

            let mut event_names: Vec<_> = converted.keys().cloned().collect();
            event_names.sort();

            for event_name in event_names {
                let Some(rows) = converted.get(&event_name) else {
                    continue;
                };
                if rows.is_empty() {
                    tracing::trace!(
                        %address,
                        event = %event_name,
                        block_number = header.block_number,
                        "no logs found for event, continuing"
                    );
                    continue;
                }
                let Some(event) = contract.events.get(&event_name) else {
                    continue;
                };

                self.event_repository.persist_logs(rows, event, &contract).await?;
            }
        }

        Ok(())
    }

    /// Polls every initialized contract's methods at this header, not just
    /// those that had logs, so a method at height h sees all events at or
    /// before h.
    async fn method_polling(&mut self, header: &Header) -> Result<(), WatchError> {
        let mut addresses: Vec<_> = self.contracts.keys().cloned().collect();
        addresses.sort();

        for address in addresses {
            let Some(contract) = self.contracts.get(&address).cloned() else {
                continue;
            };

            if contract.methods.is_empty() || header.block_number < contract.starting_block {
                tracing::trace!(address = %contract.address, "not polling contract");
                continue;
            }

            self.poller.poll_contract_at(&contract, header.block_number).await?;
            self.header_repository
                .mark_header_checked_for_all(header.id, &contract.sorted_method_ids())
                .await?;
        }

        Ok(())
    }

    pub fn contract(&self, address: &str) -> Option<&Arc<Contract>> {
        self.contracts.get(&address.to_lowercase())
    }

    pub fn event_ids(&self) -> &[String] {
        &self.event_ids
    }
}
