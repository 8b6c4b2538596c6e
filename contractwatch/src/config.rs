use std::collections::HashMap;
use std::env;
use std::path::Path;

use derive_more::Display;
use serde::Deserialize;

use crate::contracts::ContractEntry;

pub const DEFAULT_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_POOL_SIZE: u32 = 5;

#[derive(Debug, Display)]
pub enum ConfigError {
    #[display(fmt = "no contracts configured")]
    NoContracts,
    #[display(fmt = "no rpc path configured")]
    NoRpcPath,
    #[display(fmt = "invalid rpc path: {}", _0)]
    InvalidRpcPath(String),
    #[display(fmt = "invalid contract address: {}", _0)]
    InvalidAddress(String),
    #[display(fmt = "could not read config file: {}", _0)]
    Io(String),
    #[display(fmt = "could not parse config file: {}", _0)]
    Parse(String),
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: "contractwatch".to_string(),
            hostname: "localhost".to_string(),
            port: 5432,
            user: String::new(),
            password: String::new(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        let credentials = match (self.user.is_empty(), self.password.is_empty()) {
            (true, _) => String::new(),
            (false, true) => format!("{}@", self.user),
            (false, false) => format!("{}:{}@", self.user, self.password),
        };

        format!(
            "postgres://{credentials}{}:{}/{}",
            self.hostname, self.port, self.name
        )
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub network: String,
    pub rpc_path: String,
    pub database: DatabaseConfig,
    pub contracts: Vec<ContractEntry>,
    pub interval_ms: u64,
    pub call_timeout_ms: u64,
    pub pool_size: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            network: String::new(),
            rpc_path: String::new(),
            database: DatabaseConfig::default(),
            contracts: vec![],
            interval_ms: DEFAULT_INTERVAL_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl WatchConfig {
    pub fn new(rpc_path: &str, database: DatabaseConfig) -> Self {
        Self {
            rpc_path: rpc_path.to_string(),
            database,
            ..Default::default()
        }
    }

    pub fn with_network(mut self, network: &str) -> Self {
        self.network = network.to_string();

        self
    }

    pub fn add_contract(mut self, contract: ContractEntry) -> Self {
        self.contracts.push(contract);

        self
    }

    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;

        self
    }

    pub fn with_call_timeout_ms(mut self, call_timeout_ms: u64) -> Self {
        self.call_timeout_ms = call_timeout_ms;

        self
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = pool_size;

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contracts.is_empty() {
            return Err(ConfigError::NoContracts);
        }
        if self.rpc_path.is_empty() {
            return Err(ConfigError::NoRpcPath);
        }
        for contract in &self.contracts {
            if !is_hex_address(&contract.address) {
                return Err(ConfigError::InvalidAddress(contract.address.clone()));
            }
        }

        Ok(())
    }

    /// Loads a TOML config file, then applies environment overrides
    /// key-for-key with `.` replaced by `_` (e.g. `DATABASE_HOSTNAME`).
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|error| ConfigError::Io(error.to_string()))?;
        let file: ConfigFile =
            toml::from_str(&contents).map_err(|error| ConfigError::Parse(error.to_string()))?;

        let mut config = WatchConfig {
            network: file.contract.network.unwrap_or_default(),
            rpc_path: file.client.and_then(|client| client.rpc_path).unwrap_or_default(),
            database: file.database.map(DatabaseConfig::from).unwrap_or_default(),
            ..Default::default()
        };

        for address in &file.contract.addresses {
            let entry = file.contract.entries.get(address).cloned().unwrap_or_default();

            config.contracts.push(ContractEntry {
                address: address.to_lowercase(),
                abi: entry.abi,
                starting_block: entry.starting_block.unwrap_or(0),
                events: entry.events.unwrap_or_default(),
                event_args: entry.event_args.unwrap_or_default(),
                methods: entry.methods.unwrap_or_default(),
                method_args: entry.method_args.unwrap_or_default(),
                piping: entry.piping.unwrap_or(false),
            });
        }

        config.apply_env_overrides();

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("DATABASE_NAME") {
            self.database.name = name;
        }
        if let Ok(hostname) = env::var("DATABASE_HOSTNAME") {
            self.database.hostname = hostname;
        }
        if let Ok(port) = env::var("DATABASE_PORT") {
            if let Ok(port) = port.parse() {
                self.database.port = port;
            }
        }
        if let Ok(user) = env::var("DATABASE_USER") {
            self.database.user = user;
        }
        if let Ok(password) = env::var("DATABASE_PASSWORD") {
            self.database.password = password;
        }
        if let Ok(rpc_path) = env::var("CLIENT_RPCPATH") {
            self.rpc_path = rpc_path;
        }
    }
}

fn is_hex_address(address: &str) -> bool {
    address.len() == 42
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    database: Option<DatabaseFileSection>,
    client: Option<ClientFileSection>,
    contract: ContractFileSection,
}

#[derive(Debug, Deserialize)]
struct DatabaseFileSection {
    name: Option<String>,
    hostname: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
}

impl From<DatabaseFileSection> for DatabaseConfig {
    fn from(section: DatabaseFileSection) -> Self {
        let defaults = DatabaseConfig::default();

        DatabaseConfig {
            name: section.name.unwrap_or(defaults.name),
            hostname: section.hostname.unwrap_or(defaults.hostname),
            port: section.port.unwrap_or(defaults.port),
            user: section.user.unwrap_or(defaults.user),
            password: section.password.unwrap_or(defaults.password),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientFileSection {
    #[serde(rename = "rpcPath")]
    rpc_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContractFileSection {
    network: Option<String>,
    addresses: Vec<String>,
    #[serde(flatten)]
    entries: HashMap<String, ContractFileEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ContractFileEntry {
    abi: Option<String>,
    #[serde(rename = "startingBlock")]
    starting_block: Option<i64>,
    events: Option<Vec<String>>,
    #[serde(rename = "eventArgs")]
    event_args: Option<Vec<String>>,
    methods: Option<Vec<String>>,
    #[serde(rename = "methodArgs")]
    method_args: Option<Vec<String>>,
    piping: Option<bool>,
}
