use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum WordParseError {
    #[error("invalid hex in storage word: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("storage word must be at most 32 bytes, got {got}")]
    TooLong { got: usize },
}

/// A 32-byte big-endian storage word.
///
/// The ledger's storage endpoint returns unpadded hex for both keys and
/// values; parsing left-pads to the full word. An absent slot reads as
/// [`StorageWord::ZERO`], matching ledger semantics for unset storage.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StorageWord([u8; 32]);

impl StorageWord {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Word addressing storage slot `slot` of a contract's scalar layout.
    pub fn from_slot(slot: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&slot.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn last_byte(&self) -> u8 {
        self.0[31]
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Numeric value of the word, if it fits in a u128.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    /// Big-endian addition of a small offset, wrapping on overflow.
    ///
    /// Used to step through the data slots of a dynamic value whose base slot
    /// is a hash.
    pub fn wrapping_add(mut self, rhs: u64) -> Self {
        let mut carry = rhs as u128;
        for i in (0..32).rev() {
            if carry == 0 {
                break;
            }
            let sum = self.0[i] as u128 + (carry & 0xff);
            self.0[i] = (sum & 0xff) as u8;
            carry = (carry >> 8) + (sum >> 8);
        }
        self
    }
}

impl fmt::Display for StorageWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for StorageWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageWord({})", self)
    }
}

impl FromStr for StorageWord {
    type Err = WordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let padded;
        let s = if s.len() % 2 == 1 {
            padded = format!("0{s}");
            &padded
        } else {
            s
        };
        let bytes = hex::decode(s)?;
        if bytes.len() > 32 {
            return Err(WordParseError::TooLong { got: bytes.len() });
        }
        let mut word = [0u8; 32];
        word[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(Self(word))
    }
}

impl Serialize for StorageWord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StorageWord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
