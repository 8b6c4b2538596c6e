use ethers::abi::{ParamType, Token};
use ethers::types::I256;
use ethers::utils::hex;

/// Maps a solidity type to the column type its decoded values are stored in.
pub fn sql_type(kind: &ParamType) -> String {
    match kind {
        ParamType::Address => "CHARACTER VARYING(42)".to_string(),
        ParamType::Uint(_) | ParamType::Int(_) => "NUMERIC".to_string(),
        ParamType::Bool => "BOOLEAN".to_string(),
        ParamType::String => "TEXT".to_string(),
        ParamType::Bytes => "BYTEA".to_string(),
        ParamType::FixedBytes(size) => format!("CHARACTER VARYING({})", 2 + 2 * size),
        ParamType::Array(_) | ParamType::FixedArray(_, _) | ParamType::Tuple(_) => {
            "TEXT".to_string()
        }
    }
}

/// Renders a decoded value as a SQL literal for the column type `sql_type`
/// assigns to its solidity type.
pub fn sql_value(token: &Token) -> String {
    match token {
        Token::Address(address) => format!("'{:#x}'", address),
        Token::Uint(value) => value.to_string(),
        Token::Int(value) => I256::from_raw(*value).to_string(),
        Token::Bool(value) => {
            if *value {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Token::String(value) => quote_str(value),
        Token::Bytes(bytes) => format!("'\\x{}'", hex::encode(bytes)),
        Token::FixedBytes(bytes) => format!("'0x{}'", hex::encode(bytes)),
        Token::Array(tokens) | Token::FixedArray(tokens) | Token::Tuple(tokens) => {
            let rendered: Vec<String> = tokens.iter().map(display_value).collect();

            quote_str(&serde_json::to_string(&rendered).unwrap_or_default())
        }
    }
}

/// Renders a decoded value as plain text, the way it reads back out of its
/// column. Used for de-duplicating piped argument lists.
pub fn display_value(token: &Token) -> String {
    match token {
        Token::Address(address) => format!("{:#x}", address),
        Token::Uint(value) => value.to_string(),
        Token::Int(value) => I256::from_raw(*value).to_string(),
        Token::Bool(value) => value.to_string(),
        Token::String(value) => value.clone(),
        Token::Bytes(bytes) | Token::FixedBytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Token::Array(tokens) | Token::FixedArray(tokens) | Token::Tuple(tokens) => {
            let rendered: Vec<String> = tokens.iter().map(display_value).collect();

            serde_json::to_string(&rendered).unwrap_or_default()
        }
    }
}

pub fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Column name for an ABI-named argument. A trailing underscore keeps event
/// and method argument names from colliding with SQL keywords.
pub fn column_name(name: &str, position: usize) -> String {
    if name.is_empty() {
        format!("arg{position}_")
    } else {
        format!("{}_", name.to_lowercase())
    }
}
