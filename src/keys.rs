//! Types for LoRaWAN keys and the crypto abstraction the codec is built on.
use crate::parser::EUI64;
use crate::Error;

macro_rules! lorawan_key {
    (
        $(#[$outer:meta])*
        pub struct $type:ident(AES128);
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $type(pub(crate) AES128);

        impl $type {
            pub const fn byte_len() -> usize {
                16
            }

            pub fn inner(&self) -> &AES128 {
                &self.0
            }
        }

        impl From<[u8; 16]> for $type {
            fn from(key: [u8; 16]) -> Self {
                $type(AES128(key))
            }
        }

        impl TryFrom<&[u8]> for $type {
            type Error = Error;

            fn try_from(bytes: &[u8]) -> Result<Self, Error> {
                Ok($type(AES128::try_from(bytes)?))
            }
        }

        impl AsRef<[u8]> for $type {
            fn as_ref(&self) -> &[u8] {
                &self.0 .0
            }
        }
    };
}

lorawan_key!(
    /// The [`AppKey`] is the AES-128 root key of an end-device.
    ///
    /// It protects JoinRequest frames and both ciphers and authenticates
    /// JoinAccept frames; session keys are derived from it after a join.
    pub struct AppKey(AES128);
);

lorawan_key!(
    /// The [`AppSKey`] is the application session key (AES-128) of an
    /// end-device, used to cipher FRMPayloads on every port except 0.
    pub struct AppSKey(AES128);
);

lorawan_key!(
    /// The [`NwkSKey`] is the network session key (AES-128) of an
    /// end-device, used for data-frame MICs and for port-0 payloads.
    pub struct NwkSKey(AES128);
);

macro_rules! lorawan_eui {
    (
        $(#[$outer:meta])*
        pub struct $type:ident(EUI64<[u8; 8]>);
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $type(EUI64<[u8; 8]>);

        impl $type {
            pub const fn byte_len() -> usize {
                8
            }
        }

        impl From<[u8; 8]> for $type {
            fn from(eui: [u8; 8]) -> Self {
                $type(EUI64::from(eui))
            }
        }

        impl From<$type> for EUI64<[u8; 8]> {
            fn from(eui: $type) -> Self {
                eui.0
            }
        }

        impl AsRef<[u8]> for $type {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }
    };
}

lorawan_eui!(
    /// [`DevEui`] is a global end-device ID in the IEEE EUI64 address space.
    ///
    /// Its text form is hex in LSB order, as device labels print it.
    pub struct DevEui(EUI64<[u8; 8]>);
);
lorawan_eui!(
    /// [`AppEui`] is a global application ID in the IEEE EUI64 address
    /// space, identifying the entity able to process a JoinRequest.
    pub struct AppEui(EUI64<[u8; 8]>);
);

/// [`AES128`] represents a 128-bit AES key.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct AES128(pub [u8; 16]);

impl From<[u8; 16]> for AES128 {
    fn from(v: [u8; 16]) -> Self {
        AES128(v)
    }
}

impl TryFrom<&[u8]> for AES128 {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::byte_len() {
            return Err(Error::InvalidKey);
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(bytes);
        Ok(AES128(key))
    }
}

impl AES128 {
    pub const fn byte_len() -> usize {
        16
    }
}

/// [`MIC`] represents a LoRaWAN message integrity code.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct MIC(pub [u8; 4]);

impl From<[u8; 4]> for MIC {
    fn from(v: [u8; 4]) -> Self {
        MIC(v)
    }
}

/// Trait for implementations of AES128 encryption.
pub trait Encrypter {
    fn encrypt_block(&self, block: &mut [u8]);
}

/// Trait for implementations of AES128 decryption.
pub trait Decrypter {
    fn decrypt_block(&self, block: &mut [u8]);
}

/// Trait for implementations of CMAC (RFC 4493).
pub trait Mac {
    fn input(&mut self, data: &[u8]);
    fn reset(&mut self);
    fn result(self) -> [u8; 16];
}

/// Represents an abstraction over the crypto functions.
///
/// This trait provides a way to pick a different implementation of the
/// crypto primitives, for example one backed by hardware.
pub trait CryptoFactory {
    type E: Encrypter;
    type D: Decrypter;
    type M: Mac;

    /// Method that creates an Encrypter.
    fn new_enc(&self, key: &AES128) -> Self::E;

    /// Method that creates a Decrypter.
    fn new_dec(&self, key: &AES128) -> Self::D;

    /// Method that creates a MAC calculator.
    fn new_mac(&self, key: &AES128) -> Self::M;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn aes128_from_slice_of_wrong_length() {
        assert_eq!(AES128::try_from(&[1u8; 15][..]), Err(Error::InvalidKey));
        assert_eq!(AES128::try_from(&[1u8; 17][..]), Err(Error::InvalidKey));
    }

    #[test]
    fn key_from_slice_matches_array_form() {
        let bytes = [7u8; 16];
        assert_eq!(NwkSKey::try_from(&bytes[..]), Ok(NwkSKey::from(bytes)));
    }
}
