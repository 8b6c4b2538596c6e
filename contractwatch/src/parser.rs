use std::collections::HashMap;

use derive_more::Display;
use ethers::abi::{Abi, StateMutability};
use serde::Deserialize;

use crate::contracts::{ContractEvent, ContractMethod};

#[derive(Debug, Display)]
pub enum AbiError {
    #[display(fmt = "malformed abi: {}", _0)]
    Malformed(String),
    #[display(fmt = "no abi resolvable for address {}", _0)]
    Unresolvable(String),
    #[display(fmt = "unknown event: {}", _0)]
    UnknownEvent(String),
    #[display(fmt = "unknown method: {}", _0)]
    UnknownMethod(String),
    #[display(fmt = "no abi has been parsed yet")]
    NotParsed,
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: String,
    result: String,
}

/// Parses contract ABIs and answers which of their events and constant
/// methods the user selected.
pub struct AbiParser {
    network: String,
    lookup: HashMap<String, String>,
    abi: Option<String>,
    parsed: Option<Abi>,
}

impl AbiParser {
    pub fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
            lookup: HashMap::new(),
            abi: None,
            parsed: None,
        }
    }

    /// Registers a compiled-in ABI for an address, consulted before the
    /// public explorer API.
    pub fn add_known_abi(&mut self, address: &str, abi: &str) {
        self.lookup.insert(address.to_lowercase(), abi.to_string());
    }

    /// Resolves an ABI by address: lookup table first, then the network's
    /// public explorer API.
    pub async fn parse(&mut self, address: &str) -> Result<(), AbiError> {
        if let Some(abi) = self.lookup.get(&address.to_lowercase()).cloned() {
            return self.parse_str(&abi);
        }

        let abi = self.fetch_from_explorer(address).await?;

        self.parse_str(&abi)
    }

    /// Accepts an ABI JSON string literally.
    pub fn parse_str(&mut self, abi: &str) -> Result<(), AbiError> {
        let parsed: Abi =
            serde_json::from_str(abi).map_err(|error| AbiError::Malformed(error.to_string()))?;

        self.abi = Some(abi.to_string());
        self.parsed = Some(parsed);

        Ok(())
    }

    pub fn abi(&self) -> Result<&str, AbiError> {
        self.abi.as_deref().ok_or(AbiError::NotParsed)
    }

    pub fn parsed_abi(&self) -> Result<&Abi, AbiError> {
        self.parsed.as_ref().ok_or(AbiError::NotParsed)
    }

    /// Returns the selected events keyed by name. An empty selection means
    /// every event the ABI declares.
    pub fn get_events(&self, names: &[String]) -> Result<HashMap<String, ContractEvent>, AbiError> {
        let parsed = self.parsed_abi()?;

        if names.is_empty() {
            return Ok(parsed
                .events()
                .map(|event| (event.name.clone(), ContractEvent::new(event)))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                parsed
                    .event(name)
                    .map(|event| (name.clone(), ContractEvent::new(event)))
                    .map_err(|_| AbiError::UnknownEvent(name.clone()))
            })
            .collect()
    }

    /// Returns the selected constant (view/pure) methods keyed by name.
    /// Non-constant methods are never returned; selecting one is an error.
    pub fn get_select_methods(
        &self,
        names: &[String],
    ) -> Result<HashMap<String, ContractMethod>, AbiError> {
        let parsed = self.parsed_abi()?;

        names
            .iter()
            .map(|name| {
                parsed
                    .function(name)
                    .ok()
                    .filter(|function| is_constant(function))
                    .map(|function| (name.clone(), ContractMethod::new(function)))
                    .ok_or_else(|| AbiError::UnknownMethod(name.clone()))
            })
            .collect()
    }

    async fn fetch_from_explorer(&self, address: &str) -> Result<String, AbiError> {
        let url = format!(
            "{}/api?module=contract&action=getabi&address={}",
            explorer_url(&self.network),
            address
        );

        let response = reqwest::get(&url)
            .await
            .map_err(|error| AbiError::Unresolvable(format!("{address}: {error}")))?
            .json::<ExplorerResponse>()
            .await
            .map_err(|error| AbiError::Unresolvable(format!("{address}: {error}")))?;

        if response.status != "1" {
            return Err(AbiError::Unresolvable(format!(
                "{address}: explorer returned {}",
                response.result
            )));
        }

        Ok(response.result)
    }
}

fn is_constant(function: &ethers::abi::Function) -> bool {
    matches!(
        function.state_mutability,
        StateMutability::View | StateMutability::Pure
    )
}

fn explorer_url(network: &str) -> String {
    match network {
        "" | "mainnet" => "https://api.etherscan.io".to_string(),
        other => format!("https://api-{other}.etherscan.io"),
    }
}
