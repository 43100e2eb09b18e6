//! Provides types and methods for creating LoRaWAN payloads.
//!
//! Each creator accumulates fields into a caller-supplied buffer; the
//! ciphertext and the MIC are produced once, in [build](struct.DataPayloadCreator.html#method.build).
use core::fmt;

use crate::keys::{AppKey, AppSKey, CryptoFactory, Decrypter, NwkSKey, AES128};
use crate::packet_length::phy::join::{
    JOIN_ACCEPT_LEN, JOIN_ACCEPT_WITH_CFLIST_LEN, JOIN_REQUEST_LEN,
};
use crate::packet_length::phy::mac::fhdr::FOPTS_MAX_LEN;
use crate::packet_length::phy::{MIC_LEN, PHY_PAYLOAD_MIN_LEN};
use crate::parser;
use crate::parser::Direction;
use crate::securityhelpers::{self, BlockContext};
use crate::types::{DLSettings, Frequency};

/// Errors reported while assembling a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    BufferTooShort,
    InvalidChannelList,
    FOptsTooLong,
    PayloadWithoutFPort,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferTooShort => write!(f, "buffer too short"),
            Error::InvalidChannelList => write!(f, "invalid channel list"),
            Error::FOptsTooLong => write!(f, "FOpts do not fit the FCtrl length nibble"),
            Error::PayloadWithoutFPort => write!(f, "FRMPayload requires an FPort"),
        }
    }
}

impl std::error::Error for Error {}

/// JoinAcceptCreator serves for creating binary representation of the
/// Physical Payload of a JoinAccept.
///
/// # Examples
///
/// ```
/// let mut buf = [0u8; 17];
/// let mut phy = lorawan_packet::creator::JoinAcceptCreator::new(&mut buf[..]).unwrap();
/// let key = lorawan_packet::keys::AppKey::from([1; 16]);
/// phy.set_app_nonce(&[1, 2, 3])
///     .set_net_id(&[1; 3])
///     .set_dev_addr(&[1; 4])
///     .set_dl_settings(2)
///     .set_rx_delay(1);
/// let payload = phy
///     .build(&key, &lorawan_packet::default_crypto::DefaultFactory)
///     .unwrap();
/// ```
#[derive(Default)]
pub struct JoinAcceptCreator<D> {
    data: D,
    with_c_f_list: bool,
    encrypted: bool,
}

impl<D: AsMut<[u8]>> JoinAcceptCreator<D> {
    /// Creates a well initialized JoinAcceptCreator storing into the given
    /// buffer.
    pub fn new(mut data: D) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < JOIN_ACCEPT_LEN {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x20;
        Ok(Self { data, with_c_f_list: false, encrypted: false })
    }

    /// Sets the AppNonce of the JoinAccept to the provided value.
    pub fn set_app_nonce<H: AsRef<[u8]>, T: Into<parser::AppNonce<H>>>(
        &mut self,
        app_nonce: T,
    ) -> &mut Self {
        let converted = app_nonce.into();
        self.data.as_mut()[1..4].copy_from_slice(converted.as_ref());

        self
    }

    /// Sets the network ID of the JoinAccept to the provided value.
    pub fn set_net_id<H: AsRef<[u8]>, T: Into<parser::NwkAddr<H>>>(
        &mut self,
        net_id: T,
    ) -> &mut Self {
        let converted = net_id.into();
        self.data.as_mut()[4..7].copy_from_slice(converted.as_ref());

        self
    }

    /// Sets the device address of the JoinAccept to the provided value.
    pub fn set_dev_addr<H: AsRef<[u8]>, T: Into<parser::DevAddr<H>>>(
        &mut self,
        dev_addr: T,
    ) -> &mut Self {
        let converted = dev_addr.into();
        self.data.as_mut()[7..11].copy_from_slice(converted.as_ref());

        self
    }

    /// Sets the DLSettings of the JoinAccept to the provided value.
    pub fn set_dl_settings<T: Into<DLSettings>>(&mut self, dl_settings: T) -> &mut Self {
        let converted = dl_settings.into();
        self.data.as_mut()[11] = converted.raw_value();

        self
    }

    /// Sets the RX delay of the JoinAccept to the provided value.
    pub fn set_rx_delay(&mut self, rx_delay: u8) -> &mut Self {
        self.data.as_mut()[12] = rx_delay;

        self
    }

    /// Sets the CFList of the JoinAccept to the provided list of channel
    /// frequencies (up to five, CFListType 0).
    pub fn set_c_f_list<'a, C: AsRef<[Frequency<'a>]>>(
        &mut self,
        list: C,
    ) -> Result<&mut Self, Error> {
        let ch_list = list.as_ref();
        if ch_list.len() > 5 {
            return Err(Error::InvalidChannelList);
        }
        let d = self.data.as_mut();
        if d.len() < JOIN_ACCEPT_WITH_CFLIST_LEN {
            return Err(Error::BufferTooShort);
        }
        ch_list.iter().enumerate().for_each(|(i, fr)| {
            let v = fr.value() / 100;
            d[13 + i * 3] = (v & 0xff) as u8;
            d[14 + i * 3] = ((v >> 8) & 0xff) as u8;
            d[15 + i * 3] = ((v >> 16) & 0xff) as u8;
        });
        // CFListType, last byte of the 16-byte CFList
        d[28] = 0;
        self.with_c_f_list = true;

        Ok(self)
    }

    /// Provides the binary representation of the encrypted JoinAccept
    /// physical payload with the MIC set.
    ///
    /// Encrypting towards the device uses the AES decrypt primitive, so
    /// that the device recovers the fields with a plain AES encrypt.
    ///
    /// # Argument
    ///
    /// * key - the key to be used for encryption and setting the MIC.
    /// * factory - the factory that shall be used to create objects for
    ///   crypto functions.
    pub fn build<F: CryptoFactory>(&mut self, key: &AppKey, factory: &F) -> Result<&[u8], Error> {
        let required_len = if self.with_c_f_list {
            JOIN_ACCEPT_WITH_CFLIST_LEN
        } else {
            JOIN_ACCEPT_LEN
        };
        if self.data.as_mut().len() < required_len {
            return Err(Error::BufferTooShort);
        }
        if !self.encrypted {
            let d = &mut self.data.as_mut()[..required_len];
            let len = d.len();
            let mic = securityhelpers::calculate_join_accept_mic(
                &d[1..len - MIC_LEN],
                d[0],
                factory.new_mac(key.inner()),
            );
            d[len - MIC_LEN..].copy_from_slice(&mic.0);
            let aes_dec = factory.new_dec(key.inner());
            for i in 0..(len >> 4) {
                let start = (i << 4) + 1;
                aes_dec.decrypt_block(&mut d[start..(16 + start)]);
            }
            self.encrypted = true;
        }
        Ok(&self.data.as_mut()[..required_len])
    }
}

fn set_mic<F: CryptoFactory>(data: &mut [u8], key: &AES128, factory: &F) {
    let len = data.len();
    let mic = securityhelpers::calculate_mic(&data[..len - MIC_LEN], factory.new_mac(key));

    data[len - MIC_LEN..].copy_from_slice(&mic.0[..]);
}

/// JoinRequestCreator serves for creating binary representation of the
/// Physical Payload of a JoinRequest.
///
/// # Examples
///
/// ```
/// let mut buf = [0u8; 23];
/// let mut phy = lorawan_packet::creator::JoinRequestCreator::new(&mut buf[..]).unwrap();
/// let key = lorawan_packet::keys::AppKey::from([7; 16]);
/// phy.set_app_eui(&[1; 8]);
/// phy.set_dev_eui(&[2; 8]);
/// phy.set_dev_nonce(&[3; 2]);
/// let payload = phy.build(&key, &lorawan_packet::default_crypto::DefaultFactory);
/// ```
#[derive(Default)]
pub struct JoinRequestCreator<D> {
    data: D,
}

impl<D: AsMut<[u8]>> JoinRequestCreator<D> {
    /// Creates a well initialized JoinRequestCreator storing into the given
    /// buffer.
    pub fn new(mut data: D) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < JOIN_REQUEST_LEN {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x00;
        Ok(Self { data })
    }

    /// Sets the application EUI of the JoinRequest to the provided value.
    pub fn set_app_eui<H: AsRef<[u8]>, T: Into<parser::EUI64<H>>>(&mut self, app_eui: T) -> &mut Self {
        let converted = app_eui.into();
        self.data.as_mut()[1..9].copy_from_slice(converted.as_ref());

        self
    }

    /// Sets the device EUI of the JoinRequest to the provided value.
    pub fn set_dev_eui<H: AsRef<[u8]>, T: Into<parser::EUI64<H>>>(&mut self, dev_eui: T) -> &mut Self {
        let converted = dev_eui.into();
        self.data.as_mut()[9..17].copy_from_slice(converted.as_ref());

        self
    }

    /// Sets the device nonce of the JoinRequest to the provided value.
    pub fn set_dev_nonce<H: AsRef<[u8]>, T: Into<parser::DevNonce<H>>>(
        &mut self,
        dev_nonce: T,
    ) -> &mut Self {
        let converted = dev_nonce.into();
        self.data.as_mut()[17..19].copy_from_slice(converted.as_ref());

        self
    }

    /// Provides the binary representation of the JoinRequest physical
    /// payload with the MIC set.
    ///
    /// # Argument
    ///
    /// * key - the key to be used for setting the MIC.
    /// * factory - the factory that shall be used to create objects for
    ///   crypto functions.
    pub fn build<F: CryptoFactory>(&mut self, key: &AppKey, factory: &F) -> &[u8] {
        let d = self.data.as_mut();
        set_mic(&mut d[..JOIN_REQUEST_LEN], key.inner(), factory);
        &d[..JOIN_REQUEST_LEN]
    }
}

/// DataPayloadCreator serves for creating binary representation of the
/// Physical Payload of DataUp or DataDown messages.
///
/// # Examples
///
/// ```
/// let mut buf = [0u8; 23];
/// let mut phy = lorawan_packet::creator::DataPayloadCreator::new(&mut buf[..]).unwrap();
/// let nwk_skey = lorawan_packet::keys::NwkSKey::from([2; 16]);
/// let app_skey = lorawan_packet::keys::AppSKey::from([1; 16]);
/// phy.set_confirmed(true)
///     .set_uplink(true)
///     .set_f_port(42)
///     .set_dev_addr(&[4, 3, 2, 1])
///     .set_fctrl(&lorawan_packet::parser::FCtrl::new(0x80, true)) // ADR: true, all others: false
///     .set_fcnt(76543);
/// phy.build(b"hello lora", &[], &nwk_skey, &app_skey, &lorawan_packet::default_crypto::DefaultFactory)
///     .unwrap();
/// ```
#[derive(Default)]
pub struct DataPayloadCreator<D> {
    data: D,
    data_f_port: Option<u8>,
    fcnt: u32,
}

impl<D: AsMut<[u8]>> DataPayloadCreator<D> {
    /// Creates a well initialized DataPayloadCreator storing into the given
    /// buffer.
    ///
    /// By default the packet is an unconfirmed data up packet.
    pub fn new(mut data: D) -> Result<Self, Error> {
        let d = data.as_mut();
        if d.len() < PHY_PAYLOAD_MIN_LEN {
            return Err(Error::BufferTooShort);
        }
        d[0] = 0x40;
        Ok(DataPayloadCreator { data, data_f_port: None, fcnt: 0 })
    }

    /// Sets whether the packet is uplink or downlink.
    pub fn set_uplink(&mut self, uplink: bool) -> &mut Self {
        if uplink {
            self.data.as_mut()[0] &= 0xdf;
        } else {
            self.data.as_mut()[0] |= 0x20;
        }
        self
    }

    /// Sets whether the packet is confirmed or unconfirmed.
    pub fn set_confirmed(&mut self, confirmed: bool) -> &mut Self {
        let d = self.data.as_mut();
        if confirmed {
            d[0] &= 0xbf;
            d[0] |= 0x80;
        } else {
            d[0] &= 0x7f;
            d[0] |= 0x40;
        }

        self
    }

    /// Sets the device address of the DataPayload to the provided value.
    pub fn set_dev_addr<H: AsRef<[u8]>, T: Into<parser::DevAddr<H>>>(
        &mut self,
        dev_addr: T,
    ) -> &mut Self {
        let converted = dev_addr.into();
        self.data.as_mut()[1..5].copy_from_slice(converted.as_ref());

        self
    }

    /// Sets the FCtrl header of the DataPayload packet to the specified
    /// value.
    ///
    /// The FOpts length nibble is overwritten during build to match the
    /// FOpts actually given.
    pub fn set_fctrl(&mut self, fctrl: &parser::FCtrl) -> &mut Self {
        self.data.as_mut()[5] = fctrl.raw_value();
        self
    }

    /// Sets the FCnt header of the DataPayload packet to the specified
    /// value.
    ///
    /// NOTE: In the packet header the value will be truncated to u16; the
    /// full value participates in the MIC and the payload cipher.
    pub fn set_fcnt(&mut self, fcnt: u32) -> &mut Self {
        let d = self.data.as_mut();
        self.fcnt = fcnt;
        d[6] = (fcnt & 0xff) as u8;
        d[7] = (fcnt >> 8) as u8;

        self
    }

    /// Sets the FPort header of the DataPayload packet to the specified
    /// value.
    ///
    /// Port 0 selects the network command channel, ciphered with the
    /// network session key instead of the application session key.
    pub fn set_f_port(&mut self, f_port: u8) -> &mut Self {
        self.data_f_port = Some(f_port);

        self
    }

    /// Provides the binary representation of the DataPayload physical
    /// payload with the MIC set and the payload encrypted.
    ///
    /// # Argument
    ///
    /// * payload - the FRMPayload (application) to be sent.
    /// * fopts - raw FOpts bytes to be piggybacked; carried opaquely.
    /// * nwk_skey - the key used for the MIC, and for the payload cipher
    ///   when the port is 0.
    /// * app_skey - the key used for the payload cipher on any other port.
    /// * factory - the factory that shall be used to create objects for
    ///   crypto functions.
    pub fn build<F: CryptoFactory>(
        &mut self,
        payload: &[u8],
        fopts: &[u8],
        nwk_skey: &NwkSKey,
        app_skey: &AppSKey,
        factory: &F,
    ) -> Result<&[u8], Error> {
        let d = self.data.as_mut();
        let mut last_filled = 8; // MHDR + FHDR without the FOpts
        let has_fport = self.data_f_port.is_some();
        let has_fport_zero = self.data_f_port == Some(0);

        if fopts.len() > FOPTS_MAX_LEN {
            return Err(Error::FOptsTooLong);
        }

        if !has_fport && !payload.is_empty() {
            return Err(Error::PayloadWithoutFPort);
        }

        // FOptsLen always mirrors the FOpts actually present
        d[5] = (d[5] & 0xf0) | (fopts.len() as u8);
        if !fopts.is_empty() {
            if d.len() < last_filled + fopts.len() + MIC_LEN {
                return Err(Error::BufferTooShort);
            }
            d[last_filled..last_filled + fopts.len()].copy_from_slice(fopts);
            last_filled += fopts.len();
        }

        if let Some(f_port) = self.data_f_port {
            if d.len() < last_filled + 1 + MIC_LEN {
                return Err(Error::BufferTooShort);
            }
            d[last_filled] = f_port;
            last_filled += 1;
        }

        if d.len() < last_filled + payload.len() + MIC_LEN {
            return Err(Error::BufferTooShort);
        }
        d[last_filled..last_filled + payload.len()].copy_from_slice(payload);

        let enc_key = if has_fport_zero { nwk_skey.inner() } else { app_skey.inner() };
        let direction = if d[0] & 0x20 == 0 { Direction::Uplink } else { Direction::Downlink };
        let mut dev_addr = [0u8; 4];
        dev_addr.copy_from_slice(&d[1..5]);
        let ctx = BlockContext::new(direction, dev_addr, self.fcnt);

        // Encrypt FRMPayload
        securityhelpers::encrypt_frm_data_payload(
            d,
            last_filled,
            last_filled + payload.len(),
            &ctx,
            &factory.new_enc(enc_key),
        );
        last_filled += payload.len();

        // MIC set
        let mic = securityhelpers::calculate_data_mic(
            &d[..last_filled],
            factory.new_mac(nwk_skey.inner()),
            &ctx,
        );
        d[last_filled..last_filled + MIC_LEN].copy_from_slice(&mic.0);

        Ok(&d[..last_filled + MIC_LEN])
    }
}
