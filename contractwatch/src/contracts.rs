use std::collections::{HashMap, HashSet};

use ethers::abi::{Abi, Event, Function};
use ethers::types::H256;

/// Checked-column identifier for one event or method of one contract.
pub fn checked_column_id(name: &str, address: &str) -> String {
    format!("{name}_{address}").to_lowercase()
}

#[derive(Debug, Clone)]
pub struct ContractEvent {
    pub name: String,
    pub value: Event,
}

impl ContractEvent {
    pub fn new(value: &Event) -> Self {
        Self {
            name: value.name.clone(),
            value: value.clone(),
        }
    }

    pub fn signature(&self) -> H256 {
        self.value.signature()
    }
}

#[derive(Debug, Clone)]
pub struct ContractMethod {
    pub name: String,
    pub value: Function,
}

impl ContractMethod {
    pub fn new(value: &Function) -> Self {
        Self {
            name: value.name.clone(),
            value: value.clone(),
        }
    }
}

/// Per-address user configuration, assembled with the builder and carried
/// inside `WatchConfig`.
#[derive(Debug, Clone, Default)]
pub struct ContractEntry {
    pub address: String,
    pub abi: Option<String>,
    pub starting_block: i64,
    pub events: Vec<String>,
    pub event_args: Vec<String>,
    pub methods: Vec<String>,
    pub method_args: Vec<String>,
    pub piping: bool,
}

impl ContractEntry {
    pub fn new(address: &str, starting_block: i64) -> Self {
        Self {
            address: address.to_lowercase(),
            starting_block,
            ..Default::default()
        }
    }

    pub fn with_abi(mut self, abi: &str) -> Self {
        self.abi = Some(abi.to_string());

        self
    }

    pub fn add_event(mut self, name: &str) -> Self {
        self.events.push(name.to_string());

        self
    }

    pub fn add_event_arg(mut self, name: &str) -> Self {
        self.event_args.push(name.to_string());

        self
    }

    pub fn add_method(mut self, name: &str) -> Self {
        self.methods.push(name.to_string());

        self
    }

    pub fn add_method_arg(mut self, name: &str) -> Self {
        self.method_args.push(name.to_string());

        self
    }

    pub fn with_piping(mut self) -> Self {
        self.piping = true;

        self
    }
}

/// A fully resolved contract, built once during transformer init and read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct Contract {
    pub address: String,
    pub name: String,
    pub abi: String,
    pub parsed_abi: Abi,
    pub starting_block: i64,
    pub events: HashMap<String, ContractEvent>,
    pub methods: HashMap<String, ContractMethod>,
    pub filter_args: HashSet<String>,
    pub method_args: HashSet<String>,
    pub piping: bool,
    pub event_ids: HashMap<String, String>,
    pub method_ids: HashMap<String, String>,
}

impl Contract {
    /// Precomputes the checked-column identifier maps. Call after all other
    /// fields are populated.
    pub fn init(mut self) -> Self {
        self.event_ids = self
            .events
            .keys()
            .map(|name| (name.clone(), checked_column_id(name, &self.address)))
            .collect();
        self.method_ids = self
            .methods
            .keys()
            .map(|name| (name.clone(), checked_column_id(name, &self.address)))
            .collect();

        self
    }

    pub fn wants_event_arg(&self, name: &str) -> bool {
        self.filter_args.contains(name)
    }

    /// Event checked-column ids in event-name order.
    pub fn sorted_event_ids(&self) -> Vec<String> {
        let mut names: Vec<_> = self.events.keys().collect();
        names.sort();

        names.iter().map(|name| self.event_ids[*name].clone()).collect()
    }

    /// Method checked-column ids in method-name order.
    pub fn sorted_method_ids(&self) -> Vec<String> {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();

        names.iter().map(|name| self.method_ids[*name].clone()).collect()
    }

    /// Methods in name order, for deterministic polling.
    pub fn sorted_methods(&self) -> Vec<&ContractMethod> {
        let mut methods: Vec<_> = self.methods.values().collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));

        methods
    }

    /// Events in name order, for deterministic column creation.
    pub fn sorted_events(&self) -> Vec<&ContractEvent> {
        let mut events: Vec<_> = self.events.values().collect();
        events.sort_by(|a, b| a.name.cmp(&b.name));

        events
    }
}

#[cfg(test)]
mod checked_column_id_test {
    use super::*;

    #[test]
    fn lowercases_the_name_and_address() {
        assert_eq!(
            checked_column_id("Transfer", "0x8dD5FbCe2F6a956C3022bA3663759011Dd51e73E"),
            "transfer_0x8dd5fbce2f6a956c3022ba3663759011dd51e73e"
        );
    }
}
