//! Fixed-length identifiers used by the announce protocol.
//!
//! Both `info_hash` and `peer_id` are 20 raw bytes. On the wire they travel
//! as "binary strings": JSON strings of exactly 20 characters where every
//! character is a code point in `U+0000..=U+00FF` carrying one byte. Plain
//! ASCII identifiers are a subset of that encoding.
//!
//! Identifiers display as lowercase hex for logs and notifications.

use std::fmt::{self, Debug, Display, Formatter};
use thiserror::Error;

/// Length in bytes of every swarm and peer identifier.
pub const ID_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("character outside the single-byte range")]
    NotBinary,
}

/// Decode a binary string into exactly [`ID_LEN`] bytes.
fn decode_binary(s: &str) -> Result<[u8; ID_LEN], IdError> {
    let mut bytes = [0u8; ID_LEN];
    let mut len = 0;
    for c in s.chars() {
        let byte = u8::try_from(u32::from(c)).map_err(|_| IdError::NotBinary)?;
        if len < ID_LEN {
            bytes[len] = byte;
        }
        len += 1;
    }
    if len != ID_LEN {
        return Err(IdError::WrongLength {
            expected: ID_LEN,
            actual: len,
        });
    }
    Ok(bytes)
}

fn encode_binary(bytes: &[u8; ID_LEN]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

macro_rules! binary_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; ID_LEN]);

        impl $name {
            /// Parse a wire binary string.
            pub fn from_binary_str(s: &str) -> Result<Self, IdError> {
                decode_binary(s).map(Self)
            }

            /// Encode back into the wire binary-string form.
            pub fn to_binary_string(&self) -> String {
                encode_binary(&self.0)
            }

            pub fn as_bytes(&self) -> &[u8; ID_LEN] {
                &self.0
            }
        }

        impl From<[u8; ID_LEN]> for $name {
            fn from(bytes: [u8; ID_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.to_binary_string())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(d)?;
                Self::from_binary_str(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

binary_id!(
    /// Identifier of a content swarm.
    InfoHash
);

binary_id!(
    /// Identifier a peer announces itself under.
    PeerId
);
