//! Library for parsing and handling LoRaWAN packets and the Semtech gateway
//! envelope that carries them.
#![deny(rust_2018_idioms)]
#![doc = include_str!("../README.md")]

pub mod creator;
pub mod keys;
pub mod packet_length;
pub mod parser;
pub mod semtech;
pub mod string;
pub mod types;

#[cfg(feature = "default-crypto")]
pub mod default_crypto;

mod securityhelpers;

use core::fmt;

/// Errors surfaced by packet parsing and crypto operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The bytes do not form a structurally valid packet. The payload names
    /// the part that failed.
    Malformed(&'static str),
    /// A crypto operation required a key the caller did not supply.
    MissingKey,
    /// Key material had the wrong length.
    InvalidKey,
    /// The crypto backend failed. Unreachable with the built-in factory and
    /// statically sized keys; reserved for host-provided
    /// [`CryptoFactory`](crate::keys::CryptoFactory) integrations.
    Crypto,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Malformed(what) => write!(f, "malformed packet ({what})"),
            Error::MissingKey => write!(f, "missing key"),
            Error::InvalidKey => write!(f, "invalid key material"),
            Error::Crypto => write!(f, "crypto backend failure"),
        }
    }
}

impl std::error::Error for Error {}
