//! Provides types and methods for parsing LoRaWAN payloads.
//!
//! # Examples
//!
//! ```
//! use lorawan_packet::parser::*;
//! use lorawan_packet::keys::*;
//!
//! let data = vec![0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01,
//!     0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6, 0xc3, 0xb5, 0x82];
//! if let Ok(PhyPayload::Data(DataPayload::Encrypted(phy))) = parse(data) {
//!     let key = AppSKey::from([1; 16]);
//!     let decrypted = phy.decrypt(None, Some(&key), 1).unwrap();
//!     if let FRMPayload::Data(payload) = decrypted.frm_payload() {
//!         println!("{}", String::from_utf8_lossy(payload));
//!     }
//! } else {
//!     panic!("failed to parse data payload");
//! }
//! ```

use super::keys::{AppKey, AppSKey, CryptoFactory, Encrypter, NwkSKey, AES128, MIC};
use super::securityhelpers::{self, BlockContext};
use super::types::{DLSettings, Frequency};
use super::Error;

#[cfg(feature = "default-crypto")]
use super::default_crypto::DefaultFactory;

macro_rules! fixed_len_struct {
    (
        $(#[$outer:meta])*
        struct $type:ident[$size:expr];
    ) => {
        $(#[$outer])*
        #[derive(Debug, Eq)]
        pub struct $type<T: AsRef<[u8]>>(T);

        impl<T: AsRef<[u8]>> $type<T> {
            pub(crate) fn new_from_raw(bytes: T) -> $type<T> {
                $type(bytes)
            }

            pub fn new(data: T) -> Option<$type<T>> {
                let bytes = data.as_ref();
                if bytes.len() != $size {
                    None
                } else {
                    Some($type(data))
                }
            }
        }

        impl<T: AsRef<[u8]> + Clone> Clone for $type<T> {
            fn clone(&self) -> Self {
                Self(self.0.clone())
            }
        }

        impl<T: AsRef<[u8]> + Copy> Copy for $type<T> {
        }

        impl<T: AsRef<[u8]>, V: AsRef<[u8]>> PartialEq<$type<T>> for $type<V> {
            fn eq(&self, other: &$type<T>) -> bool {
                self.as_ref() == other.as_ref()
            }
        }

        impl<'a> From<&'a [u8; $size]> for $type<&'a [u8; $size]> {
            fn from(v: &'a [u8; $size]) -> Self {
                $type(v)
            }
        }

        impl From<[u8; $size]> for $type<[u8; $size]> {
            fn from(v: [u8; $size]) -> Self {
                $type(v)
            }
        }

        impl<T: AsRef<[u8]>> AsRef<[u8]> for $type<T> {
            fn as_ref(&self) -> &[u8] {
                self.0.as_ref()
            }
        }

        impl<T: AsRef<[u8]>> $type<T> {
            #[inline]
            pub fn to_owned(&self) -> $type<[u8; $size]> {
                let mut data = [0u8; $size];
                data.copy_from_slice(self.0.as_ref());
                $type(data)
            }
        }
    };
}

/// PhyPayload is a type that represents a physical LoRaWAN payload.
///
/// It can either be JoinRequest, JoinAccept, Data, or one of the two
/// reserved frame types accepted through an [`Extensions`] table.
#[derive(Debug, PartialEq, Eq)]
pub enum PhyPayload<T, F> {
    JoinRequest(JoinRequestPayload<T, F>),
    JoinAccept(JoinAcceptPayload<T, F>),
    Data(DataPayload<T, F>),
    Extension(ExtensionPayload<T>),
}

impl<T: AsRef<[u8]>, F> AsRef<[u8]> for PhyPayload<T, F> {
    fn as_ref(&self) -> &[u8] {
        match self {
            PhyPayload::JoinRequest(jr) => jr.as_bytes(),
            PhyPayload::JoinAccept(ja) => ja.as_bytes(),
            PhyPayload::Data(data) => data.as_bytes(),
            PhyPayload::Extension(ext) => ext.as_bytes(),
        }
    }
}

/// JoinAcceptPayload is a type that represents a JoinAccept.
///
/// It can either be encrypted, for example as a result from the
/// [parse](fn.parse.html) function, or decrypted.
#[derive(Debug, PartialEq, Eq)]
pub enum JoinAcceptPayload<T, F> {
    Encrypted(EncryptedJoinAcceptPayload<T, F>),
    Decrypted(DecryptedJoinAcceptPayload<T, F>),
}

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for JoinAcceptPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        match self {
            JoinAcceptPayload::Encrypted(e) => e.as_bytes(),
            JoinAcceptPayload::Decrypted(d) => d.as_bytes(),
        }
    }
}

/// DataPayload is a type that represents a ConfirmedDataUp,
/// ConfirmedDataDown, UnconfirmedDataUp or UnconfirmedDataDown.
///
/// It can either be encrypted, for example as a result from the
/// [parse](fn.parse.html) function, or decrypted.
#[derive(Debug, PartialEq, Eq)]
pub enum DataPayload<T, F> {
    Encrypted(EncryptedDataPayload<T, F>),
    Decrypted(DecryptedDataPayload<T>),
}

impl<T: AsRef<[u8]>, F> DataHeader for DataPayload<T, F> {
    fn as_data_bytes(&self) -> &[u8] {
        match self {
            DataPayload::Encrypted(data) => data.as_data_bytes(),
            DataPayload::Decrypted(data) => data.as_data_bytes(),
        }
    }
}

/// Trait with the sole purpose to make clear distinction in some
/// implementations between types that just happen to have AsRef and those
/// that want to have the given implementations (like MICAble and MHDRAble).
pub trait AsPhyPayloadBytes {
    fn as_bytes(&self) -> &[u8];
}

impl AsRef<[u8]> for dyn AsPhyPayloadBytes {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Helper trait to add mic to all types that should have it.
pub trait MICAble {
    /// Gives the MIC of the PhyPayload.
    fn mic(&self) -> MIC;
}

impl<T: AsPhyPayloadBytes> MICAble for T {
    fn mic(&self) -> MIC {
        let data = self.as_bytes();
        let len = data.len();
        MIC([data[len - 4], data[len - 3], data[len - 2], data[len - 1]])
    }
}

/// Helper trait to add mhdr to all types that should have it.
pub trait MHDRAble {
    /// Gives the MHDR of the PhyPayload.
    fn mhdr(&self) -> MHDR;
}

/// Assumes at least one byte in the data.
impl<T: AsPhyPayloadBytes> MHDRAble for T {
    fn mhdr(&self) -> MHDR {
        let data = self.as_bytes();
        MHDR(data[0])
    }
}

/// JoinRequestPayload represents a JoinRequest.
///
/// It can be built either directly through the [new](#method.new) or using
/// the [parse](fn.parse.html) function.
#[derive(Debug, PartialEq, Eq)]
pub struct JoinRequestPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for JoinRequestPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>, F: CryptoFactory> JoinRequestPayload<T, F> {
    /// Creates a new JoinRequestPayload if the provided data is acceptable.
    ///
    /// # Argument
    ///
    /// * data - the bytes for the payload.
    /// * factory - the factory that shall be used to create objects for
    ///   crypto functions.
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        if !Self::can_build_from(data.as_ref()) {
            Err(Error::Malformed("length"))
        } else {
            Ok(Self(data, factory))
        }
    }

    fn can_build_from(bytes: &[u8]) -> bool {
        bytes.len() == 23 && MHDR(bytes[0]).mtype() == MType::JoinRequest
    }

    /// Gives the APP EUI of the JoinRequest.
    pub fn app_eui(&self) -> EUI64<&[u8]> {
        EUI64::new_from_raw(&self.0.as_ref()[1..9])
    }

    /// Gives the DEV EUI of the JoinRequest.
    pub fn dev_eui(&self) -> EUI64<&[u8]> {
        EUI64::new_from_raw(&self.0.as_ref()[9..17])
    }

    /// Gives the DEV Nonce of the JoinRequest.
    pub fn dev_nonce(&self) -> DevNonce<&[u8]> {
        DevNonce::new_from_raw(&self.0.as_ref()[17..19])
    }

    /// Verifies that the JoinRequest has correct MIC.
    pub fn validate_mic(&self, key: &AppKey) -> bool {
        self.mic() == self.calculate_mic(key)
    }

    fn calculate_mic(&self, key: &AppKey) -> MIC {
        let d = self.0.as_ref();
        securityhelpers::calculate_mic(&d[..d.len() - 4], self.1.new_mac(key.inner()))
    }
}

/// EncryptedJoinAcceptPayload represents an encrypted JoinAccept.
///
/// It can be built either directly through the [new](#method.new) or using
/// the [parse](fn.parse.html) function.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedJoinAcceptPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for EncryptedJoinAcceptPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> EncryptedJoinAcceptPayload<T, F> {
    /// Creates a new EncryptedJoinAcceptPayload if the provided data is
    /// acceptable.
    ///
    /// # Argument
    ///
    /// * data - the bytes for the payload.
    /// * factory - the factory that shall be used to create objects for
    ///   crypto functions.
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        if Self::can_build_from(data.as_ref()) {
            Ok(Self(data, factory))
        } else {
            Err(Error::Malformed("length"))
        }
    }

    fn can_build_from(bytes: &[u8]) -> bool {
        (bytes.len() == 17 || bytes.len() == 33) && MHDR(bytes[0]).mtype() == MType::JoinAccept
    }

    /// Decrypts the EncryptedJoinAcceptPayload producing a
    /// DecryptedJoinAcceptPayload.
    ///
    /// The network side "encrypts" a JoinAccept with AES decrypt, so going
    /// from the over-the-air bytes back to the clear fields is an AES
    /// encrypt of every block after the MHDR. This method consumes the
    /// EncryptedJoinAcceptPayload as it reuses the underlying memory.
    /// Please note that it does not verify the mic.
    ///
    /// # Argument
    ///
    /// * key - the key to be used for the decryption.
    pub fn decrypt(mut self, key: &AppKey) -> DecryptedJoinAcceptPayload<T, F> {
        {
            let bytes = self.0.as_mut();
            let len = bytes.len();
            let aes_enc = self.1.new_enc(key.inner());

            for i in 0..(len >> 4) {
                let start = (i << 4) + 1;
                aes_enc.encrypt_block(&mut bytes[start..(start + 16)]);
            }
        }
        DecryptedJoinAcceptPayload(self.0, self.1)
    }
}

/// DecryptedJoinAcceptPayload represents a decrypted JoinAccept.
///
/// It can be built either directly through the [new](#method.new) or using
/// the [EncryptedJoinAcceptPayload::decrypt] function.
#[derive(Debug, PartialEq, Eq)]
pub struct DecryptedJoinAcceptPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> AsPhyPayloadBytes for DecryptedJoinAcceptPayload<T, F> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>, F: CryptoFactory> DecryptedJoinAcceptPayload<T, F> {
    /// Verifies that the JoinAccept has correct MIC.
    pub fn validate_mic(&self, key: &AppKey) -> bool {
        self.mic() == self.calculate_mic(key)
    }

    pub fn calculate_mic(&self, key: &AppKey) -> MIC {
        let d = self.0.as_ref();
        securityhelpers::calculate_join_accept_mic(
            &d[1..d.len() - 4],
            d[0],
            self.1.new_mac(key.inner()),
        )
    }

    /// Computes the network session key for a given device.
    ///
    /// # Argument
    ///
    /// * dev_nonce - the nonce the device used in its JoinRequest.
    /// * key - the app key.
    pub fn derive_nwkskey<TT: AsRef<[u8]>>(&self, dev_nonce: &DevNonce<TT>, key: &AppKey) -> NwkSKey {
        NwkSKey(self.derive_session_key(0x1, dev_nonce, key.inner()))
    }

    /// Computes the application session key for a given device.
    ///
    /// # Argument
    ///
    /// * dev_nonce - the nonce the device used in its JoinRequest.
    /// * key - the app key.
    pub fn derive_appskey<TT: AsRef<[u8]>>(&self, dev_nonce: &DevNonce<TT>, key: &AppKey) -> AppSKey {
        AppSKey(self.derive_session_key(0x2, dev_nonce, key.inner()))
    }

    fn derive_session_key<TT: AsRef<[u8]>>(
        &self,
        first_byte: u8,
        dev_nonce: &DevNonce<TT>,
        key: &AES128,
    ) -> AES128 {
        let cipher = self.1.new_enc(key);

        // note: AppNonce is 24 bit, NetId is 24 bit, DevNonce is 16 bit
        let app_nonce = self.app_nonce();
        let nwk_addr = self.net_id();

        let mut block = [0u8; 16];
        block[0] = first_byte;
        block[1..4].copy_from_slice(app_nonce.as_ref());
        block[4..7].copy_from_slice(nwk_addr.as_ref());
        block[7..9].copy_from_slice(dev_nonce.as_ref());
        cipher.encrypt_block(&mut block);

        AES128(block)
    }
}

/// The channel list of a JoinAccept.
#[derive(Debug, PartialEq, Eq)]
pub enum CfList<'a> {
    /// Five channel frequencies (CFListType 0).
    DynamicChannel([Frequency<'a>; 5]),
    /// A 9-byte channel-mask block (CFListType 1), carried opaquely.
    FixedChannel(&'a [u8]),
}

impl<T: AsRef<[u8]>, F> DecryptedJoinAcceptPayload<T, F> {
    /// Gives the app nonce of the JoinAccept.
    pub fn app_nonce(&self) -> AppNonce<&[u8]> {
        AppNonce::new_from_raw(&self.0.as_ref()[1..4])
    }

    /// Gives the net ID of the JoinAccept.
    pub fn net_id(&self) -> NwkAddr<&[u8]> {
        NwkAddr::new_from_raw(&self.0.as_ref()[4..7])
    }

    /// Gives the dev address of the JoinAccept.
    pub fn dev_addr(&self) -> DevAddr<&[u8]> {
        DevAddr::new_from_raw(&self.0.as_ref()[7..11])
    }

    /// Gives the downlink configuration of the JoinAccept.
    pub fn dl_settings(&self) -> DLSettings {
        DLSettings::new(self.0.as_ref()[11])
    }

    /// Gives the RX delay of the JoinAccept.
    pub fn rx_delay(&self) -> u8 {
        self.0.as_ref()[12] & 0x0f
    }

    /// Gives the channel frequency list of the JoinAccept.
    pub fn c_f_list(&self) -> Option<CfList<'_>> {
        let d = self.0.as_ref();
        if d.len() == 17 {
            return None;
        }

        let c_f_list_type = d[28];

        if c_f_list_type == 0 {
            let res = [
                Frequency::new_from_raw(&d[13..16]),
                Frequency::new_from_raw(&d[16..19]),
                Frequency::new_from_raw(&d[19..22]),
                Frequency::new_from_raw(&d[22..25]),
                Frequency::new_from_raw(&d[25..28]),
            ];
            Some(CfList::DynamicChannel(res))
        } else if c_f_list_type == 1 {
            Some(CfList::FixedChannel(&d[13..22]))
        } else {
            None
        }
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> DecryptedJoinAcceptPayload<T, F> {
    /// Creates a DecryptedJoinAcceptPayload from the bytes of a JoinAccept.
    ///
    /// The JoinAccept payload is automatically decrypted and the mic is
    /// verified using the supplied crypto factory implementation.
    ///
    /// # Argument
    ///
    /// * data - the data from which the PhyPayload is to be built.
    /// * key - the key that is to be used to decrypt the payload.
    /// * factory - the factory that shall be used to create objects for
    ///   crypto functions.
    pub fn new_with_factory(data: T, key: &AppKey, factory: F) -> Result<Self, Error> {
        let t = EncryptedJoinAcceptPayload::new_with_factory(data, factory)?;
        let res = t.decrypt(key);
        if res.validate_mic(key) {
            Ok(res)
        } else {
            Err(Error::Malformed("MIC"))
        }
    }
}

/// Helper trait for EncryptedDataPayload and DecryptedDataPayload.
///
/// NOTE: Does not check the payload size as that should be done prior to
/// building the object of the implementing type.
pub trait DataHeader {
    /// Equivalent to AsRef<[u8]>.
    fn as_data_bytes(&self) -> &[u8];

    /// Gives the FHDR of the DataPayload.
    fn fhdr(&self) -> FHDR<'_> {
        FHDR::new_from_raw(&self.as_data_bytes()[1..(1 + self.fhdr_length())], self.is_uplink())
    }

    /// Gives whether the frame is confirmed.
    fn is_confirmed(&self) -> bool {
        let mtype = MHDR(self.as_data_bytes()[0]).mtype();
        mtype == MType::ConfirmedDataUp || mtype == MType::ConfirmedDataDown
    }

    /// Gives whether the payload is uplink or not.
    fn is_uplink(&self) -> bool {
        let mtype = MHDR(self.as_data_bytes()[0]).mtype();
        mtype == MType::UnconfirmedDataUp || mtype == MType::ConfirmedDataUp
    }

    /// Gives the direction of the frame.
    fn direction(&self) -> Direction {
        if self.is_uplink() {
            Direction::Uplink
        } else {
            Direction::Downlink
        }
    }

    /// Gives the FPort of the DataPayload if there is one.
    fn f_port(&self) -> Option<u8> {
        let fhdr_length = self.fhdr_length();
        let data = self.as_data_bytes();
        if data.len() < fhdr_length + 6 {
            return None;
        }
        Some(data[1 + fhdr_length])
    }

    /// Gives the length of the FHDR field.
    fn fhdr_length(&self) -> usize {
        fhdr_length(self.as_data_bytes()[5])
    }
}

fn fhdr_length(b: u8) -> usize {
    7 + (b & 0x0f) as usize
}

impl<T: DataHeader> AsPhyPayloadBytes for T {
    fn as_bytes(&self) -> &[u8] {
        self.as_data_bytes()
    }
}

/// EncryptedDataPayload represents an encrypted data payload.
///
/// It can be built either directly through the [new](#method.new) or using
/// the [parse](fn.parse.html) function.
#[derive(Debug, PartialEq, Eq)]
pub struct EncryptedDataPayload<T, F>(T, F);

impl<T: AsRef<[u8]>, F> DataHeader for EncryptedDataPayload<T, F> {
    fn as_data_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>, F: CryptoFactory> EncryptedDataPayload<T, F> {
    /// Creates a new EncryptedDataPayload if the provided data is
    /// acceptable.
    ///
    /// # Argument
    ///
    /// * data - the bytes for the payload.
    /// * factory - the factory that shall be used to create objects for
    ///   crypto functions.
    pub fn new_with_factory(data: T, factory: F) -> Result<Self, Error> {
        if Self::can_build_from(data.as_ref()) {
            Ok(Self(data, factory))
        } else {
            Err(Error::Malformed("length"))
        }
    }

    fn can_build_from(bytes: &[u8]) -> bool {
        // The smallest packets contain MHDR (1 byte) + FHDR + MIC (4 bytes).
        if bytes.len() < 12 || 5 + fhdr_length(bytes[5]) > bytes.len() {
            return false;
        }

        matches!(
            MHDR(bytes[0]).mtype(),
            MType::ConfirmedDataUp
                | MType::ConfirmedDataDown
                | MType::UnconfirmedDataUp
                | MType::UnconfirmedDataDown
        )
    }

    /// Verifies that the DataPayload has correct MIC.
    ///
    /// `fcnt` is the full 32-bit counter; the frame itself only carries its
    /// 16 low bits.
    pub fn validate_mic(&self, key: &NwkSKey, fcnt: u32) -> bool {
        self.mic() == self.calculate_mic(key, fcnt)
    }

    fn calculate_mic(&self, key: &NwkSKey, fcnt: u32) -> MIC {
        let d = self.0.as_ref();
        let ctx = self.block_context(fcnt);
        securityhelpers::calculate_data_mic(&d[..d.len() - 4], self.1.new_mac(key.inner()), &ctx)
    }

    fn block_context(&self, fcnt: u32) -> BlockContext {
        let mut dev_addr = [0u8; 4];
        dev_addr.copy_from_slice(self.fhdr().dev_addr().as_ref());
        BlockContext::new(self.direction(), dev_addr, fcnt)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>, F: CryptoFactory> EncryptedDataPayload<T, F> {
    /// Decrypts the EncryptedDataPayload payload.
    ///
    /// This method consumes the EncryptedDataPayload as it reuses the
    /// underlying memory. Please note that it does not verify the mic.
    ///
    /// If used on the application server side for application payload
    /// decryption, the nwk_skey can be None. If used on the network server
    /// side and the app_skey is not available, app_skey can be None when
    /// fport is 0. Failure to meet those constraints results in
    /// [`Error::MissingKey`].
    ///
    /// # Argument
    ///
    /// * nwk_skey - the network session key, used when the payload carries
    ///   port-0 (network command) data.
    /// * app_skey - the application session key, used for all other ports.
    /// * fcnt - the full 32-bit counter used to encrypt the payload; its 16
    ///   low bits are taken from the frame itself.
    ///
    /// # Examples
    ///
    /// ```
    /// let data = vec![0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01,
    ///     0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6, 0xc3, 0xb5, 0x82];
    /// let key = lorawan_packet::keys::AppSKey::from([1; 16]);
    /// let enc_phy = lorawan_packet::parser::EncryptedDataPayload::new(data).unwrap();
    /// let dec_phy = enc_phy.decrypt(None, Some(&key), 1);
    /// ```
    pub fn decrypt(
        mut self,
        nwk_skey: Option<&NwkSKey>,
        app_skey: Option<&AppSKey>,
        fcnt: u32,
    ) -> Result<DecryptedDataPayload<T>, Error> {
        let fhdr_length = self.fhdr_length();
        let full_fcnt = compute_fcnt(fcnt, self.fhdr().fcnt());
        let ctx = self.block_context(full_fcnt);
        let key = if self.f_port().is_some() && self.f_port() != Some(0) {
            app_skey.map(|k| k.inner())
        } else {
            nwk_skey.map(|k| k.inner())
        };
        let key = key.ok_or(Error::MissingKey)?;
        let aes_enc = self.1.new_enc(key);

        let data = self.0.as_mut();
        let len = data.len();
        let start = 1 + fhdr_length + 1;
        let end = len - 4;
        if start < end {
            securityhelpers::encrypt_frm_data_payload(data, start, end, &ctx, &aes_enc);
        }

        Ok(DecryptedDataPayload(self.0))
    }

    /// Verifies the mic and decrypts the EncryptedDataPayload payload if
    /// the mic matches.
    ///
    /// This is a helper method that combines validate_mic and decrypt. In
    /// case the mic is fine, it consumes the EncryptedDataPayload and
    /// reuses the underlying memory to produce DecryptedDataPayload. If the
    /// mic does not match, it returns the original EncryptedDataPayload so
    /// that it can be tried against the keys of another device that shares
    /// the same dev_addr.
    pub fn decrypt_if_mic_ok(
        self,
        nwk_skey: &NwkSKey,
        app_skey: &AppSKey,
        fcnt: u32,
    ) -> Result<DecryptedDataPayload<T>, Self> {
        if !self.validate_mic(nwk_skey, fcnt) {
            Err(self)
        } else {
            // both keys are present, decrypt can only succeed
            Ok(self.decrypt(Some(nwk_skey), Some(app_skey), fcnt).unwrap())
        }
    }
}

fn compute_fcnt(old_fcnt: u32, fcnt: u16) -> u32 {
    ((old_fcnt >> 16) << 16) ^ u32::from(fcnt)
}

/// DecryptedDataPayload represents a decrypted DataPayload.
///
/// It can be built either directly through the [new](#method.new) or using
/// the [EncryptedDataPayload::decrypt] function.
#[derive(Debug, PartialEq, Eq)]
pub struct DecryptedDataPayload<T>(T);

impl<T: AsRef<[u8]>> DataHeader for DecryptedDataPayload<T> {
    fn as_data_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>> DecryptedDataPayload<T> {
    /// Returns the FRMPayload. Port-0 payloads carry network commands and
    /// are kept separate from application data, but are not interpreted.
    pub fn frm_payload(&self) -> FRMPayload<'_> {
        let data = self.as_data_bytes();
        let len = data.len();
        let fhdr_length = self.fhdr_length();
        if len < fhdr_length + 6 {
            // nothing beyond the FHDR but the MIC, not even an FPort
            FRMPayload::None
        } else if self.f_port() != Some(0) {
            FRMPayload::Data(&data[(1 + fhdr_length + 1)..(len - 4)])
        } else {
            FRMPayload::MacCommands(&data[(1 + fhdr_length + 1)..(len - 4)])
        }
    }
}

/// ExtensionPayload wraps the raw bytes of an RFU or Proprietary frame
/// accepted through an [`Extensions`] table.
///
/// The codec attaches no direction, MIC, or cipher semantics to it.
#[derive(Debug, PartialEq, Eq)]
pub struct ExtensionPayload<T>(T);

impl<T: AsRef<[u8]>> ExtensionPayload<T> {
    fn new_from_raw(data: T) -> Self {
        Self(data)
    }
}

impl<T: AsRef<[u8]>> AsPhyPayloadBytes for ExtensionPayload<T> {
    fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// Caller-supplied acceptance check consulted when a frame carries one of
/// the two reserved frame-type codes. It receives the complete payload
/// bytes; returning `false` rejects the frame as malformed.
pub type ExtensionCheck = fn(&[u8]) -> bool;

/// Handlers for the two reserved frame-type codes (RFU and Proprietary).
///
/// The table is passed explicitly into [`parse_with_extensions`]; there is
/// no process-wide registry. With the default table both codes are
/// rejected.
///
/// # Examples
///
/// ```
/// use lorawan_packet::parser::{parse_with_extensions, Extensions, PhyPayload};
/// use lorawan_packet::default_crypto::DefaultFactory;
///
/// fn accept_all(_bytes: &[u8]) -> bool {
///     true
/// }
///
/// let data = vec![0xe0; 12];
/// let extensions = Extensions::default().with_proprietary(accept_all);
/// let phy = parse_with_extensions(data, DefaultFactory, &extensions).unwrap();
/// assert!(matches!(phy, PhyPayload::Extension(_)));
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Extensions {
    rfu: Option<ExtensionCheck>,
    proprietary: Option<ExtensionCheck>,
}

impl Extensions {
    /// Accepts RFU frames that pass the given check.
    pub fn with_rfu(mut self, check: ExtensionCheck) -> Self {
        self.rfu = Some(check);
        self
    }

    /// Accepts Proprietary frames that pass the given check.
    pub fn with_proprietary(mut self, check: ExtensionCheck) -> Self {
        self.proprietary = Some(check);
        self
    }

    fn check(&self, mtype: &MType) -> Option<ExtensionCheck> {
        match mtype {
            MType::RFU => self.rfu,
            MType::Proprietary => self.proprietary,
            _ => None,
        }
    }
}

/// Parses a payload as LoRaWAN physical payload.
///
/// # Argument
///
/// * data - the data from which the PhyPayload is to be built.
///
/// # Examples
///
/// ```
/// let data = vec![0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01,
///     0xa6, 0x94, 0x64, 0x26, 0x15, 0xd6, 0xc3, 0xb5, 0x82];
/// if let Ok(lorawan_packet::parser::PhyPayload::Data(phy)) = lorawan_packet::parser::parse(data) {
///     println!("{:?}", phy);
/// } else {
///     panic!("failed to parse data payload");
/// }
/// ```
#[cfg(feature = "default-crypto")]
pub fn parse<T: AsRef<[u8]> + AsMut<[u8]>>(data: T) -> Result<PhyPayload<T, DefaultFactory>, Error> {
    parse_with_factory(data, DefaultFactory)
}

/// Parses a payload as LoRaWAN physical payload.
///
/// Check out [parse](fn.parse.html) if you do not need a custom crypto
/// factory. RFU and Proprietary frames are rejected; use
/// [parse_with_extensions](fn.parse_with_extensions.html) to accept them.
///
/// # Argument
///
/// * data - the data from which the PhyPayload is to be built.
/// * factory - the factory that shall be used to create objects for crypto
///   functions.
pub fn parse_with_factory<T, F>(data: T, factory: F) -> Result<PhyPayload<T, F>, Error>
where
    T: AsRef<[u8]> + AsMut<[u8]>,
    F: CryptoFactory,
{
    parse_with_extensions(data, factory, &Extensions::default())
}

/// Parses a payload as LoRaWAN physical payload, accepting the reserved
/// frame types named by the given [`Extensions`] table.
///
/// # Argument
///
/// * data - the data from which the PhyPayload is to be built.
/// * factory - the factory that shall be used to create objects for crypto
///   functions.
/// * extensions - handlers for the RFU and Proprietary frame types.
pub fn parse_with_extensions<T, F>(
    data: T,
    factory: F,
    extensions: &Extensions,
) -> Result<PhyPayload<T, F>, Error>
where
    T: AsRef<[u8]> + AsMut<[u8]>,
    F: CryptoFactory,
{
    let bytes = data.as_ref();
    check_phy_data(bytes)?;
    let mhdr = MHDR(bytes[0]);
    let mtype = mhdr.mtype();
    if !matches!(mtype, MType::RFU | MType::Proprietary) && mhdr.major() != Major::LoRaWANR1 {
        return Err(Error::Malformed("major"));
    }
    match mtype {
        MType::JoinRequest => {
            Ok(PhyPayload::JoinRequest(JoinRequestPayload::new_with_factory(data, factory)?))
        }
        MType::JoinAccept => Ok(PhyPayload::JoinAccept(JoinAcceptPayload::Encrypted(
            EncryptedJoinAcceptPayload::new_with_factory(data, factory)?,
        ))),
        MType::UnconfirmedDataUp
        | MType::ConfirmedDataUp
        | MType::UnconfirmedDataDown
        | MType::ConfirmedDataDown => Ok(PhyPayload::Data(DataPayload::Encrypted(
            EncryptedDataPayload::new_with_factory(data, factory)?,
        ))),
        MType::RFU | MType::Proprietary => match extensions.check(&mtype) {
            Some(check) => {
                if check(bytes) {
                    Ok(PhyPayload::Extension(ExtensionPayload::new_from_raw(data)))
                } else {
                    Err(Error::Malformed("extension"))
                }
            }
            None => Err(Error::Malformed("MType")),
        },
    }
}

fn check_phy_data(bytes: &[u8]) -> Result<(), Error> {
    // the smallest payload is a data payload without fport and FRMPayload
    // which is 12 bytes long.
    if bytes.len() < 12 {
        Err(Error::Malformed("length"))
    } else {
        Ok(())
    }
}

/// MHDR represents LoRaWAN MHDR.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MHDR(u8);

impl MHDR {
    pub fn new(byte: u8) -> MHDR {
        MHDR(byte)
    }

    /// Gives the type of message that the PhyPayload is carrying.
    pub fn mtype(&self) -> MType {
        match self.0 >> 5 {
            0 => MType::JoinRequest,
            1 => MType::JoinAccept,
            2 => MType::UnconfirmedDataUp,
            3 => MType::UnconfirmedDataDown,
            4 => MType::ConfirmedDataUp,
            5 => MType::ConfirmedDataDown,
            6 => MType::RFU,
            _ => MType::Proprietary,
        }
    }

    /// Gives the version of the LoRaWAN payload format.
    pub fn major(&self) -> Major {
        if self.0.trailing_zeros() >= 2 {
            Major::LoRaWANR1
        } else {
            Major::RFU
        }
    }
}

impl From<u8> for MHDR {
    fn from(v: u8) -> Self {
        MHDR(v)
    }
}

/// MType gives the possible message types of the PhyPayload.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MType {
    JoinRequest,
    JoinAccept,
    UnconfirmedDataUp,
    UnconfirmedDataDown,
    ConfirmedDataUp,
    ConfirmedDataDown,
    RFU,
    Proprietary,
}

impl MType {
    /// The transmission direction implied by the frame type; `None` for the
    /// two reserved codes.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            MType::JoinRequest | MType::UnconfirmedDataUp | MType::ConfirmedDataUp => {
                Some(Direction::Uplink)
            }
            MType::JoinAccept | MType::UnconfirmedDataDown | MType::ConfirmedDataDown => {
                Some(Direction::Downlink)
            }
            MType::RFU | MType::Proprietary => None,
        }
    }
}

/// Major gives the supported LoRaWAN payload formats.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Major {
    LoRaWANR1,
    RFU,
}

/// The transmission direction of a frame.
///
/// The direction fixes the byte at offset 5 of every MIC and keystream
/// block.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    Uplink,
    Downlink,
}

impl Direction {
    pub(crate) fn value(self) -> u8 {
        match self {
            Direction::Uplink => 0,
            Direction::Downlink => 1,
        }
    }
}

fixed_len_struct! {
    /// EUI64 represents a 64 bit EUI.
    struct EUI64[8];
}

fixed_len_struct! {
    /// DevNonce represents a 16 bit device nonce.
    struct DevNonce[2];
}

fixed_len_struct! {
    /// AppNonce represents a 24 bit network server nonce.
    struct AppNonce[3];
}

fixed_len_struct! {
    /// DevAddr represents a 32 bit device address.
    struct DevAddr[4];
}

impl<T: AsRef<[u8]>> DevAddr<T> {
    pub fn nwk_id(&self) -> u8 {
        self.0.as_ref()[0] >> 1
    }
}

impl From<DevAddr<[u8; 4]>> for u32 {
    fn from(v: DevAddr<[u8; 4]>) -> Self {
        let bytes = v.as_ref();
        (u32::from(bytes[0]) << 24)
            | (u32::from(bytes[1]) << 16)
            | (u32::from(bytes[2]) << 8)
            | u32::from(bytes[3])
    }
}

impl From<u32> for DevAddr<[u8; 4]> {
    fn from(v: u32) -> Self {
        DevAddr([(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8])
    }
}

fixed_len_struct! {
    /// NwkAddr represents a 24 bit network address.
    struct NwkAddr[3];
}

/// FHDR represents FHDR from DataPayload.
#[derive(Debug, PartialEq, Eq)]
pub struct FHDR<'a>(&'a [u8], bool);

impl<'a> FHDR<'a> {
    pub fn new_from_raw(bytes: &'a [u8], uplink: bool) -> FHDR<'a> {
        FHDR(bytes, uplink)
    }

    pub fn new(bytes: &'a [u8], uplink: bool) -> Option<FHDR<'a>> {
        let data_len = bytes.len();
        if data_len < 7 {
            return None;
        }
        if data_len < fhdr_length(bytes[4]) {
            return None;
        }
        Some(FHDR(bytes, uplink))
    }

    /// Gives the device address associated with the given payload.
    pub fn dev_addr(&self) -> DevAddr<&'a [u8]> {
        DevAddr::new_from_raw(&self.0[0..4])
    }

    /// Gives the FCtrl associated with the given payload.
    pub fn fctrl(&self) -> FCtrl {
        FCtrl(self.0[4], self.1)
    }

    /// Gives the truncated FCnt associated with the given payload.
    pub fn fcnt(&self) -> u16 {
        (u16::from(self.0[6]) << 8) | u16::from(self.0[5])
    }

    /// Gives the raw FOpts bytes. Their contents are carried opaquely.
    pub fn fopts(&self) -> &'a [u8] {
        let f_opts_len = FCtrl(self.0[4], self.1).f_opts_len() as usize;
        &self.0[7..(7 + f_opts_len)]
    }
}

/// FCtrl represents the FCtrl from FHDR.
#[derive(Debug, PartialEq, Eq)]
pub struct FCtrl(pub u8, pub bool);

impl FCtrl {
    pub fn set_ack(&mut self) {
        self.0 |= 0b1 << 5;
    }

    pub fn new(bytes: u8, uplink: bool) -> FCtrl {
        FCtrl(bytes, uplink)
    }

    /// Gives whether ADR is enabled or not.
    pub fn adr(&self) -> bool {
        self.0 >> 7 == 1
    }

    /// Gives whether ADR ACK is requested.
    pub fn adr_ack_req(&self) -> bool {
        self.1 && self.0 & (1 << 6) != 0
    }

    /// Gives whether the ack bit is set.
    pub fn ack(&self) -> bool {
        self.0 & (1 << 5) != 0
    }

    /// Gives whether there are more payloads pending.
    pub fn f_pending(&self) -> bool {
        !self.1 && self.0 & (1 << 4) != 0
    }

    /// Gives the size of FOpts.
    pub fn f_opts_len(&self) -> u8 {
        self.0 & 0x0f
    }

    /// Gives the binary representation of the FCtrl.
    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

/// FRMPayload represents the FRMPayload that can either be application data
/// or network commands.
#[derive(Debug, PartialEq, Eq)]
pub enum FRMPayload<'a> {
    Data(&'a [u8]),
    /// Port-0 payload. Command contents are carried opaquely.
    MacCommands(&'a [u8]),
    None,
}
