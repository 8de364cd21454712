//! Fixed-width identifiers used throughout the chain.
//!
//! Every identifier is a thin newtype over a byte array. They all render as
//! lowercase hex (without a `0x` prefix) and parse from hex with or without
//! the prefix. Serde uses the same hex string form so that evidence and
//! configuration files stay human readable.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::codec::CodecError;

/// Length of a node identity (uncompressed secp256k1 public key without the
/// leading `0x04` tag).
pub const NODE_ID_LEN: usize = 64;

/// Length of an account address.
pub const ADDRESS_LEN: usize = 20;

/// Length of a block or transaction hash.
pub const HASH_LEN: usize = 32;

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// Byte length of this identifier.
            pub const LEN: usize = $len;

            /// The all-zero value.
            pub const fn zero() -> Self {
                $name([0u8; $len])
            }

            /// Build from a slice, failing if the length does not match.
            pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
                if bytes.len() != $len {
                    return Err(CodecError::InvalidLength {
                        what: $label,
                        expected: $len,
                        actual: bytes.len(),
                    });
                }
                let mut out = [0u8; $len];
                out.copy_from_slice(bytes);
                Ok($name(out))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_vec(&self) -> Vec<u8> {
                self.0.to_vec()
            }

            /// Lowercase hex without prefix.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::zero()
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s
                    .strip_prefix("0x")
                    .or_else(|| s.strip_prefix("0X"))
                    .unwrap_or(s);
                let bytes = hex::decode(trimmed).map_err(|e| CodecError::InvalidHex {
                    what: $label,
                    reason: e.to_string(),
                })?;
                Self::from_slice(&bytes)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&format!("0x{}", hex::encode(self.0)))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct HexVisitor;

                impl<'de> Visitor<'de> for HexVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "a hex encoded {} of {} bytes", $label, $len)
                    }

                    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        v.parse::<$name>().map_err(E::custom)
                    }
                }

                deserializer.deserialize_str(HexVisitor)
            }
        }
    };
}

fixed_bytes!(
    /// Network identity of a validator node, recovered from the signature a
    /// block producer embeds in the header.
    NodeId,
    NODE_ID_LEN,
    "node id"
);

fixed_bytes!(
    /// Account address (staking address of a candidate).
    Address,
    ADDRESS_LEN,
    "address"
);

fixed_bytes!(
    /// Block hash. Also used as the branch selector for speculative state.
    BlockHash,
    HASH_LEN,
    "block hash"
);

fixed_bytes!(
    /// Transaction hash.
    TxHash,
    HASH_LEN,
    "tx hash"
);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parses_with_and_without_prefix() {
        let a: Address = "0x1000000000000000000000000000000000000004".parse().unwrap();
        let b: Address = "1000000000000000000000000000000000000004".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.0[0], 0x10);
        assert_eq!(a.0[19], 0x04);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let err = NodeId::from_slice(&[1u8; 63]).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidLength {
                what: "node id",
                expected: 64,
                actual: 63
            }
        );
    }

    #[test]
    fn display_is_plain_hex() {
        let h = BlockHash([0xab; 32]);
        assert_eq!(h.to_string(), "ab".repeat(32));
        assert!(format!("{:?}", h).starts_with("BlockHash("));
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert!(matches!(
            "zz".parse::<TxHash>(),
            Err(CodecError::InvalidHex { what: "tx hash", .. })
        ));
    }
}
