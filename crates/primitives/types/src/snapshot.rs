use crate::AccountAddress;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoded state of one deployed contract instance.
///
/// Produced once per successful fetch; immutable after creation. `state`
/// maps variable names to decoded values, with binary payloads already
/// normalized via [`normalize_bytes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractStateSnapshot {
    pub address: AccountAddress,
    pub state: Value,
}

/// Render raw contract bytes in a display-safe form.
///
/// Fixed-width fields come back NUL-padded; the padding is stripped and
/// printable payloads stay text. Anything not valid printable UTF-8 becomes
/// `0x`-prefixed hex of the full raw value. All-zero values render as the
/// empty string.
pub fn normalize_bytes(bytes: &[u8]) -> String {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);
    let inner = &bytes[start..end];
    if inner.is_empty() {
        return String::new();
    }
    match std::str::from_utf8(inner) {
        Ok(text) if text.chars().all(|c| !c.is_control()) => text.to_owned(),
        _ => format!("0x{}", hex::encode(bytes)),
    }
}
