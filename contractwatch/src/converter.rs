use std::collections::HashMap;
use std::sync::Arc;

use derive_more::Display;
use ethers::abi::{ParamType, RawLog, Token};
use ethers::types::Log;
use ethers::utils::rlp::RlpStream;

use crate::contracts::{Contract, ContractEvent};

#[derive(Debug, Display)]
pub enum ConvertError {
    #[display(fmt = "converter has no contract configured")]
    NoContract,
    #[display(fmt = "abi mismatch decoding log: {}", _0)]
    Decode(String),
    #[display(fmt = "log is missing block metadata")]
    IncompleteLog,
}

/// One decoded argument of an event log, in declaration order.
#[derive(Debug, Clone)]
pub struct LogField {
    pub name: String,
    pub kind: ParamType,
    pub indexed: bool,
    pub value: Token,
}

/// A typed row ready for persistence into the event's table.
#[derive(Debug, Clone)]
pub struct EventRow {
    pub event_name: String,
    pub header_id: i64,
    pub block_number: i64,
    pub log_idx: i64,
    pub tx_idx: i64,
    pub raw_log: Vec<u8>,
    pub fields: Vec<LogField>,
}

/// Turns raw logs into typed per-event rows using the active contract's
/// parsed ABI and filter-arg whitelist.
#[derive(Default)]
pub struct Converter {
    contract: Option<Arc<Contract>>,
}

impl Converter {
    pub fn update(&mut self, contract: Arc<Contract>) {
        self.contract = Some(contract);
    }

    /// Partitions `logs` by topic0 into the matching event's bucket and
    /// decodes each into a typed row. Every watched event gets a bucket,
    /// empty or not.
    pub fn convert_batch(
        &self,
        logs: Vec<Log>,
        events: &HashMap<String, ContractEvent>,
        header_id: i64,
    ) -> Result<HashMap<String, Vec<EventRow>>, ConvertError> {
        let contract = self.contract.as_ref().ok_or(ConvertError::NoContract)?;

        let mut rows_by_event: HashMap<String, Vec<EventRow>> =
            events.keys().map(|name| (name.clone(), vec![])).collect();
        let events_by_topic0: HashMap<_, _> =
            events.values().map(|event| (event.signature(), event)).collect();

        for log in logs {
            let Some(topic0) = log.topics.first() else {
                continue;
            };
            let Some(event) = events_by_topic0.get(topic0) else {
                tracing::trace!(address = %contract.address, "skipping log with unwatched topic0");
                continue;
            };

            if !passes_event_filter(contract, event) {
                tracing::trace!(
                    address = %contract.address,
                    event = %event.name,
                    "log dropped by event-argument filter"
                );
                continue;
            }

            let row = convert_log(&log, event, header_id)?;
            rows_by_event.entry(event.name.clone()).or_default().push(row);
        }

        Ok(rows_by_event)
    }
}

/// A non-empty filter-arg whitelist keeps only logs whose event declares
/// every whitelisted argument as an indexed input.
fn passes_event_filter(contract: &Contract, event: &ContractEvent) -> bool {
    if contract.filter_args.is_empty() {
        return true;
    }

    contract.filter_args.iter().all(|arg| {
        event
            .value
            .inputs
            .iter()
            .any(|input| input.indexed && input.name == *arg)
    })
}

fn convert_log(log: &Log, event: &ContractEvent, header_id: i64) -> Result<EventRow, ConvertError> {
    let raw: RawLog = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };
    let parsed = event
        .value
        .parse_log(raw)
        .map_err(|error| ConvertError::Decode(error.to_string()))?;

    let fields = event
        .value
        .inputs
        .iter()
        .zip(parsed.params)
        .map(|(input, param)| LogField {
            name: input.name.clone(),
            kind: input.kind.clone(),
            indexed: input.indexed,
            value: param.value,
        })
        .collect();

    let block_number = log.block_number.ok_or(ConvertError::IncompleteLog)?.as_u64() as i64;
    let log_idx = log.log_index.ok_or(ConvertError::IncompleteLog)?.as_u64() as i64;
    let tx_idx = log.transaction_index.ok_or(ConvertError::IncompleteLog)?.as_u64() as i64;

    Ok(EventRow {
        event_name: event.name.clone(),
        header_id,
        block_number,
        log_idx,
        tx_idx,
        raw_log: encode_raw_log(log),
        fields,
    })
}

fn encode_raw_log(log: &Log) -> Vec<u8> {
    let mut stream = RlpStream::new_list(3);
    stream.append(&log.address);
    stream.append_list(&log.topics);
    stream.append(&log.data.to_vec());

    stream.out().to_vec()
}
