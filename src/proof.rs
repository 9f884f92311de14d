//! Serialized argument transcripts.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Proof bytes `salt ‖ transcript digest ‖ tail coefficients ‖ responses ‖
/// PCS opening proof`.
///
/// Serializes as a lowercase hex string.
#[derive(Clone, PartialEq, Eq)]
pub struct Proof {
    bytes: Vec<u8>,
}

impl Proof {
    /// Wraps raw proof bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Parses a hex-encoded proof.
    pub fn from_hex(text: &str) -> Result<Self> {
        hex::decode(text.trim())
            .map(Self::from_bytes)
            .map_err(|err| Error::Encoding(err.to_string()))
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the proof and returns its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty proof.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proof({} bytes)", self.bytes.len())
    }
}

impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Proof::from_hex(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_and_json_forms() {
        let proof = Proof::from_bytes(vec![0, 0xab, 0x10]);
        assert_eq!(proof.to_hex(), "00ab10");
        assert_eq!(Proof::from_hex("00AB10\n").unwrap(), proof);
        let json = serde_json::to_string(&proof).unwrap();
        assert_eq!(json, "\"00ab10\"");
        assert_eq!(serde_json::from_str::<Proof>(&json).unwrap(), proof);
        assert!(matches!(Proof::from_hex("abc"), Err(Error::Encoding(_))));
        assert!(serde_json::from_str::<Proof>("\"zz\"").is_err());
    }
}
