//! Storage-layout decoding: raw storage words into JSON values, driven by a
//! contract's declared variable kinds.
//!
//! Layout rules are the standard sequential-slot scheme the upload tooling
//! compiles against: one word per scalar at its declared slot, strings
//! in-slot when short and at keccak-derived data slots when long, mapping
//! entries at `keccak256(pad32(key) ++ pad32(slot))`. Absent slots read as
//! zero.

use crate::error::FetchError;
use ap_types::{normalize_bytes, StorageWord, VariableKind};
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

pub(crate) type Storage = BTreeMap<StorageWord, StorageWord>;

/// Sanity cap on decoded dynamic payloads, against corrupt length words.
const MAX_DYNAMIC_BYTES: usize = 64 * 1024;

fn word_at(storage: &Storage, location: StorageWord) -> StorageWord {
    storage.get(&location).copied().unwrap_or(StorageWord::ZERO)
}

pub(crate) fn keccak(bytes: &[u8]) -> StorageWord {
    let digest = Keccak256::digest(bytes);
    let mut word = [0u8; 32];
    word.copy_from_slice(&digest);
    StorageWord::new(word)
}

/// Storage location of `mapping[key]` for a mapping declared at `slot`.
pub(crate) fn mapping_slot(key: &StorageWord, slot: u64) -> StorageWord {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(key.as_bytes());
    preimage[32..].copy_from_slice(StorageWord::from_slot(slot).as_bytes());
    keccak(&preimage)
}

/// Mapping keys arrive as text. A full 64-digit hex key addresses the word
/// directly; anything else is taken as a short text key, left-padded into a
/// word — the same fallback the upload tooling applies.
pub(crate) fn encode_mapping_key(key: &str) -> Result<StorageWord, FetchError> {
    let bare = key.strip_prefix("0x").unwrap_or(key);
    if bare.len() == 64 {
        if let Ok(word) = bare.parse::<StorageWord>() {
            return Ok(word);
        }
    }
    let bytes = key.as_bytes();
    if bytes.len() > 32 {
        return Err(FetchError::BadMappingKey(key.to_owned()));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(StorageWord::new(word))
}

/// Decode the value of `kind` stored at `location`.
pub(crate) fn decode_at(
    storage: &Storage,
    name: &str,
    kind: &VariableKind,
    location: StorageWord,
) -> Result<Value, FetchError> {
    let word = word_at(storage, location);
    match kind {
        VariableKind::Uint => Ok(uint_value(&word)),
        VariableKind::Int => Ok(int_value(&word)),
        VariableKind::Bool => Ok(Value::Bool(word.last_byte() != 0)),
        VariableKind::Address => Ok(Value::String(hex::encode(&word.as_bytes()[12..]))),
        VariableKind::Bytes { length } => {
            // Fixed bytes are left-aligned in their word.
            let length = length.unwrap_or(32).min(32);
            Ok(Value::String(normalize_bytes(&word.as_bytes()[..length])))
        }
        VariableKind::String => decode_string(storage, name, location, word),
        VariableKind::Enum { variants } => {
            let index = word.last_byte() as usize;
            let key = variants.get(index).ok_or_else(|| {
                decode_err(name, format!("enum index {index} out of range ({} variants)", variants.len()))
            })?;
            Ok(json!({ "key": key, "index": index }))
        }
        // Mapping keys are not enumerable from storage; a full-state fetch
        // renders the variable as an empty document and point lookups go
        // through `mapping_entry`.
        VariableKind::Mapping { .. } => Ok(Value::Object(Default::default())),
    }
}

fn uint_value(word: &StorageWord) -> Value {
    match word.to_u128() {
        Some(n) if n <= u64::MAX as u128 => json!(n as u64),
        Some(n) => Value::String(n.to_string()),
        None => Value::String(format!("0x{}", hex::encode(word.as_bytes()))),
    }
}

fn int_value(word: &StorageWord) -> Value {
    let bytes = word.as_bytes();
    if bytes[0] & 0x80 == 0 {
        return uint_value(word);
    }
    // Negative two's complement; representable as i128 only when the upper
    // half is pure sign extension.
    if bytes[..16].iter().all(|b| *b == 0xff) && bytes[16] & 0x80 != 0 {
        let mut low = [0u8; 16];
        low.copy_from_slice(&bytes[16..]);
        let n = i128::from_be_bytes(low);
        if n >= i64::MIN as i128 {
            return json!(n as i64);
        }
        return Value::String(n.to_string());
    }
    Value::String(format!("0x{}", hex::encode(bytes)))
}

fn decode_string(storage: &Storage, name: &str, location: StorageWord, word: StorageWord) -> Result<Value, FetchError> {
    let marker = word.last_byte();
    let bytes = if marker % 2 == 0 {
        // Short form: payload shares the slot, length in the low byte.
        let length = (marker / 2) as usize;
        if length > 31 {
            return Err(decode_err(name, format!("short string length {length} exceeds a single word")));
        }
        word.as_bytes()[..length].to_vec()
    } else {
        // Long form: the slot holds 2*len + 1, payload lives at
        // keccak(location) and the following words.
        let raw = word.to_u128().ok_or_else(|| decode_err(name, "long string length overflows".to_owned()))?;
        let length = ((raw - 1) / 2) as usize;
        if length > MAX_DYNAMIC_BYTES {
            return Err(decode_err(name, format!("long string length {length} exceeds the sanity cap")));
        }
        let base = keccak(location.as_bytes());
        let mut data = Vec::with_capacity(length);
        let mut index = 0u64;
        while data.len() < length {
            let chunk = word_at(storage, base.wrapping_add(index));
            let take = (length - data.len()).min(32);
            data.extend_from_slice(&chunk.as_bytes()[..take]);
            index += 1;
        }
        data
    };
    String::from_utf8(bytes).map(Value::String).map_err(|_| decode_err(name, "payload is not valid utf-8".to_owned()))
}

fn decode_err(variable: &str, reason: String) -> FetchError {
    FetchError::Decode { variable: variable.to_owned(), reason }
}
