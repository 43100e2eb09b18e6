//! The JSON records carried inside envelope packets.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::Error;

#[cfg(feature = "default-crypto")]
use crate::default_crypto::DefaultFactory;
#[cfg(feature = "default-crypto")]
use crate::parser::{parse, PhyPayload};

/// RF modulation of a received or queued packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modulation {
    #[serde(rename = "LORA")]
    Lora,
    #[serde(rename = "FSK")]
    Fsk,
}

/// Datarate identifier: an "SFxxBWxxx" string for LoRa, a bitrate in bits
/// per second for FSK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataRate {
    Lora(String),
    Fsk(u64),
}

/// A packet received by the gateway, reported inside PUSH_DATA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rxpk {
    /// Concentrator internal timestamp in microseconds.
    pub tmst: u32,
    /// UTC time of reception, ISO 8601.
    pub time: String,
    /// Concentrator IF channel.
    pub chan: u32,
    /// Concentrator RF chain.
    pub rfch: u32,
    /// Center frequency in MHz.
    pub freq: f64,
    /// CRC status: 1 = OK, -1 = fail, 0 = no CRC.
    pub stat: i8,
    pub modu: Modulation,
    pub datr: DataRate,
    /// ECC coding rate; only present for LoRa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codr: Option<String>,
    /// RSSI in dBm.
    pub rssi: i32,
    /// Signal-to-noise ratio in dB; only present for LoRa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsnr: Option<f64>,
    /// Payload size in bytes.
    pub size: u16,
    /// Base64-encoded PhyPayload bytes.
    pub data: String,
}

impl Rxpk {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if !(-1..=1).contains(&self.stat) {
            return Err(Error::Malformed("stat"));
        }
        match self.modu {
            Modulation::Lora => {
                if !matches!(self.datr, DataRate::Lora(_)) {
                    return Err(Error::Malformed("datr"));
                }
                if self.codr.is_none() {
                    return Err(Error::Malformed("codr"));
                }
                if self.lsnr.is_none() {
                    return Err(Error::Malformed("lsnr"));
                }
            }
            Modulation::Fsk => {
                if !matches!(self.datr, DataRate::Fsk(_)) {
                    return Err(Error::Malformed("datr"));
                }
            }
        }
        Ok(())
    }

    /// Decodes the carried frame bytes.
    pub fn raw_payload(&self) -> Result<Vec<u8>, Error> {
        BASE64.decode(&self.data).map_err(|_| Error::Malformed("base64"))
    }

    /// Runs the carried frame through the frame codec.
    #[cfg(feature = "default-crypto")]
    pub fn phy_payload(&self) -> Result<PhyPayload<Vec<u8>, DefaultFactory>, Error> {
        parse(self.raw_payload()?)
    }

    /// Stores serialized frame bytes, keeping `size` and `data` consistent.
    pub fn set_payload(&mut self, frame: &[u8]) {
        self.size = frame.len() as u16;
        self.data = BASE64.encode(frame);
    }
}

/// A downlink for the gateway to transmit, carried inside PULL_RESP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Txpk {
    /// Send immediately, ignoring tmst/time.
    #[serde(default)]
    pub imme: bool,
    /// Concentrator timestamp at which to send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmst: Option<u32>,
    /// UTC time at which to send, ISO 8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Concentrator RF chain.
    pub rfch: u32,
    /// Center frequency in MHz.
    pub freq: f64,
    /// TX output power in dBm.
    pub powe: u8,
    pub modu: Modulation,
    pub datr: DataRate,
    /// ECC coding rate; only present for LoRa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codr: Option<String>,
    /// FSK frequency deviation in Hz; only present for FSK.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fdev: Option<u32>,
    /// Invert the LoRa polarity; only present for LoRa.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipol: Option<bool>,
    /// Preamble size.
    pub prea: u16,
    /// Payload size in bytes.
    pub size: u16,
    /// Base64-encoded PhyPayload bytes.
    pub data: String,
    /// Disable the physical-layer CRC.
    #[serde(default)]
    pub ncrc: bool,
}

impl Txpk {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        match self.modu {
            Modulation::Lora => {
                if !matches!(self.datr, DataRate::Lora(_)) {
                    return Err(Error::Malformed("datr"));
                }
                if self.codr.is_none() {
                    return Err(Error::Malformed("codr"));
                }
                if self.ipol.is_none() {
                    return Err(Error::Malformed("ipol"));
                }
            }
            Modulation::Fsk => {
                if !matches!(self.datr, DataRate::Fsk(_)) {
                    return Err(Error::Malformed("datr"));
                }
                if self.fdev.is_none() {
                    return Err(Error::Malformed("fdev"));
                }
            }
        }
        Ok(())
    }

    /// Decodes the carried frame bytes.
    pub fn raw_payload(&self) -> Result<Vec<u8>, Error> {
        BASE64.decode(&self.data).map_err(|_| Error::Malformed("base64"))
    }

    /// Runs the carried frame through the frame codec.
    #[cfg(feature = "default-crypto")]
    pub fn phy_payload(&self) -> Result<PhyPayload<Vec<u8>, DefaultFactory>, Error> {
        parse(self.raw_payload()?)
    }

    /// Stores serialized frame bytes, keeping `size` and `data` consistent.
    pub fn set_payload(&mut self, frame: &[u8]) {
        self.size = frame.len() as u16;
        self.data = BASE64.encode(frame);
    }
}

/// Gateway status report, carried inside PUSH_DATA.
///
/// Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    /// UTC system time of the gateway, ISO 8601.
    pub time: String,
    /// Latitude in degrees, north positive.
    pub lati: f64,
    /// Longitude in degrees, east positive.
    pub longi: f64,
    /// Altitude in meters.
    pub alti: i32,
    /// Number of radio packets received.
    pub rxnb: u32,
    /// Number of radio packets received with a valid CRC.
    pub rxok: u32,
    /// Number of radio packets forwarded.
    pub rxfw: u32,
    /// Percentage of upstream datagrams that were acknowledged.
    pub ackr: f64,
    /// Number of downlink datagrams received.
    pub dwnb: u32,
    /// Number of packets emitted.
    pub txnb: u32,
}

/// Result of a downlink request, reported by the gateway in TX_ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxAckError {
    /// The packet has been programmed for downlink.
    None,
    /// Too late to transmit at the requested timestamp.
    TooLate,
    /// The requested timestamp is too far in the future.
    TooEarly,
    /// The transmission collides with another scheduled packet.
    CollisionPacket,
    /// The transmission collides with a beacon slot.
    CollisionBeacon,
    /// The requested frequency is outside the allowed band.
    TxFreq,
    /// The requested power is not supported.
    TxPower,
    /// GPS is unlocked, time-based transmission is impossible.
    GpsUnlocked,
}
