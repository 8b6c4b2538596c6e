use std::collections::HashMap;

use contractwatch::{AbiParser, Contract, ContractEntry, DatabaseConfig, WatchConfig};

use crate::db;

/// ERC-20 style fixture ABI: a `Transfer` event, a `name` getter and a
/// `balanceOf` view method.
pub const TEST_TOKEN_ABI: &str = r#"[
    {"type":"event","name":"Transfer","anonymous":false,"inputs":[
        {"name":"from","type":"address","indexed":true},
        {"name":"to","type":"address","indexed":true},
        {"name":"value","type":"uint256","indexed":false}]},
    {"type":"function","name":"name","stateMutability":"view",
     "inputs":[],
     "outputs":[{"name":"","type":"string"}]},
    {"type":"function","name":"balanceOf","stateMutability":"view",
     "inputs":[{"name":"who","type":"address"}],
     "outputs":[{"name":"","type":"uint256"}]}
]"#;

/// Tests share one database, so each takes its own contract address (and with
/// it its own schema and checked-header columns) via a two-digit nonce.
pub fn test_contract_address(two_digit_nonce: &str) -> String {
    format!("0x931d387731bbbc988b312206c74f77d004d6b8{two_digit_nonce}")
}

pub fn token_entry(two_digit_nonce: &str, starting_block: i64) -> ContractEntry {
    ContractEntry::new(&test_contract_address(two_digit_nonce), starting_block)
        .with_abi(TEST_TOKEN_ABI)
        .add_event("Transfer")
}

pub fn piping_token_entry(two_digit_nonce: &str, starting_block: i64) -> ContractEntry {
    token_entry(two_digit_nonce, starting_block)
        .add_method("balanceOf")
        .add_method_arg("to")
        .with_piping()
}

/// A resolved contract, the way transformer init would build it, for tests
/// that drive the converter or poller directly.
pub fn token_contract(two_digit_nonce: &str) -> Contract {
    let mut parser = AbiParser::new("");
    parser.parse_str(TEST_TOKEN_ABI).unwrap();

    Contract {
        address: test_contract_address(two_digit_nonce),
        name: "TestToken".to_string(),
        abi: TEST_TOKEN_ABI.to_string(),
        parsed_abi: parser.parsed_abi().unwrap().clone(),
        starting_block: 0,
        events: parser.get_events(&["Transfer".to_string()]).unwrap(),
        methods: parser.get_select_methods(&["balanceOf".to_string()]).unwrap(),
        filter_args: Default::default(),
        method_args: Default::default(),
        piping: false,
        event_ids: HashMap::new(),
        method_ids: HashMap::new(),
    }
    .init()
}

pub fn watch_config(entry: ContractEntry) -> WatchConfig {
    let mut database = DatabaseConfig::default();
    database.name = db::database_url().rsplit('/').next().unwrap_or_default().to_string();

    WatchConfig::new("http://localhost:8545", database).add_contract(entry)
}
