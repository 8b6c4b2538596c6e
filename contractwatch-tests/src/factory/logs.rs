use std::str::FromStr;

use ethers::abi::Token;
use ethers::types::{Bytes, Log, H160, H256, U256};

use super::header_hash;

pub const TRANSFER_TOPIC0: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
pub const FROM_ADDRESS: &str = "0xb518b3136e491101f22b77f385fe22269c515188";
pub const TO_ADDRESS: &str = "0x7dfd6013cf8d92b751e63d481b51fe0e4c5abf5e";

/// A mined `Transfer(from, to, value)` log at `block_number` for the given
/// contract, with the block hash the header factory assigns to that block.
pub fn transfer_log(contract_address: &str, block_number: i64, value: u64) -> Log {
    let mut data = [0u8; 32];
    U256::from(value).to_big_endian(&mut data);

    Log {
        address: H160::from_str(contract_address).unwrap(),
        topics: vec![
            H256::from_str(TRANSFER_TOPIC0).unwrap(),
            address_topic(FROM_ADDRESS),
            address_topic(TO_ADDRESS),
        ],
        data: Bytes::from(data.to_vec()),
        block_hash: Some(H256::from_str(&header_hash(block_number)).unwrap()),
        block_number: Some((block_number as u64).into()),
        transaction_hash: Some(H256::from_low_u64_be(0x83d7)),
        transaction_index: Some(89.into()),
        log_index: Some(218.into()),
        transaction_log_index: None,
        log_type: None,
        removed: Some(false),
    }
}

/// Same shape as `transfer_log` but with truncated data, so decoding the
/// non-indexed `value` argument fails.
pub fn undecodable_transfer_log(contract_address: &str, block_number: i64) -> Log {
    let mut log = transfer_log(contract_address, block_number, 0);
    log.data = Bytes::from(vec![0u8; 4]);

    log
}

pub fn address_topic(address: &str) -> H256 {
    H256::from(H160::from_str(address).unwrap())
}

/// ABI-encodes a single uint256, the way `eth_call` returns `balanceOf`.
pub fn encoded_uint(value: u64) -> Bytes {
    Bytes::from(ethers::abi::encode(&[Token::Uint(U256::from(value))]))
}

/// ABI-encodes a single string, the way `eth_call` returns `name`.
pub fn encoded_string(value: &str) -> Bytes {
    Bytes::from(ethers::abi::encode(&[Token::String(value.to_string())]))
}
