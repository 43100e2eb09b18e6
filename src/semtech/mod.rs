//! Semtech UDP packet-forwarder protocol (GWMP) envelope.
//!
//! A packet is a small binary header (protocol version, random token,
//! identifier byte), followed for some packet types by an 8-byte gateway
//! EUI and a JSON object. LoRaWAN frames travel inside the JSON records
//! base64-encoded; this module never interprets them beyond handing the
//! bytes to the frame codec.
//!
//! # Examples
//!
//! ```
//! use lorawan_packet::semtech::Packet;
//!
//! let datagram = [0x02, 0xaa, 0x55, 0x01];
//! match Packet::parse(&datagram).unwrap() {
//!     Packet::PushAck(ack) => assert_eq!(ack.token, 0xaa55),
//!     _ => panic!("expected PUSH_ACK"),
//! }
//! ```

mod records;

pub use records::{DataRate, Modulation, Rxpk, Stat, TxAckError, Txpk};

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::packet_length::semtech::{GATEWAY_EUI_LEN, HEADER_LEN};
use crate::Error;

/// Protocol version spoken by this implementation.
pub const PROTOCOL_VERSION: u8 = 0x02;

/// Gateway identifier (EUI-64).
pub type GatewayEui = [u8; GATEWAY_EUI_LEN];

/// Identifier byte of an envelope packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    PushData = 0x00,
    PushAck = 0x01,
    PullData = 0x02,
    PullResp = 0x03,
    PullAck = 0x04,
    TxAck = 0x05,
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0x00 => Ok(PacketType::PushData),
            0x01 => Ok(PacketType::PushAck),
            0x02 => Ok(PacketType::PullData),
            0x03 => Ok(PacketType::PullResp),
            0x04 => Ok(PacketType::PullAck),
            0x05 => Ok(PacketType::TxAck),
            _ => Err(Error::Malformed("PacketType")),
        }
    }
}

/// Received frames and telemetry pushed by a gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct PushData {
    pub token: u16,
    pub gateway_eui: GatewayEui,
    pub rxpk: Vec<Rxpk>,
    pub stat: Vec<Stat>,
}

/// Immediate acknowledgement of a PUSH_DATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushAck {
    pub token: u16,
}

/// Downlink poll sent periodically by a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullData {
    pub token: u16,
    pub gateway_eui: GatewayEui,
}

/// Frames for the gateway to transmit.
#[derive(Debug, Clone, PartialEq)]
pub struct PullResp {
    pub token: u16,
    pub txpk: Vec<Txpk>,
}

/// Immediate acknowledgement of a PULL_DATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullAck {
    pub token: u16,
}

/// Result of a PULL_RESP transmission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxAck {
    pub token: u16,
    pub error: TxAckError,
}

/// An envelope packet, parsed from or destined for a UDP datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    PushData(PushData),
    PushAck(PushAck),
    PullData(PullData),
    PullResp(PullResp),
    PullAck(PullAck),
    TxAck(TxAck),
}

#[derive(Serialize, Deserialize)]
struct PushBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rxpk: Vec<Rxpk>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    stat: Vec<Stat>,
}

#[derive(Serialize, Deserialize)]
struct PullRespBody {
    txpk: Vec<Txpk>,
}

#[derive(Serialize, Deserialize)]
struct TxAckBody {
    txpk_ack: TxAckStatus,
}

#[derive(Serialize, Deserialize)]
struct TxAckStatus {
    error: TxAckError,
}

impl Packet {
    /// Parses a UDP datagram as an envelope packet.
    pub fn parse(data: &[u8]) -> Result<Packet, Error> {
        if data.len() < HEADER_LEN {
            return Err(Error::Malformed("length"));
        }

        let mut buf = data;

        let version = buf.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(Error::Malformed("version"));
        }

        let token = buf.get_u16();
        let identifier = PacketType::try_from(buf.get_u8())?;

        match identifier {
            PacketType::PushData => {
                let gateway_eui = read_gateway_eui(&mut buf)?;
                let body: PushBody = from_json(buf)?;
                for rxpk in &body.rxpk {
                    rxpk.validate()?;
                }
                Ok(Packet::PushData(PushData {
                    token,
                    gateway_eui,
                    rxpk: body.rxpk,
                    stat: body.stat,
                }))
            }
            PacketType::PushAck => Ok(Packet::PushAck(PushAck { token })),
            PacketType::PullData => {
                let gateway_eui = read_gateway_eui(&mut buf)?;
                Ok(Packet::PullData(PullData { token, gateway_eui }))
            }
            PacketType::PullResp => {
                let body: PullRespBody = from_json(buf)?;
                for txpk in &body.txpk {
                    txpk.validate()?;
                }
                Ok(Packet::PullResp(PullResp { token, txpk: body.txpk }))
            }
            PacketType::PullAck => Ok(Packet::PullAck(PullAck { token })),
            PacketType::TxAck => {
                let body: TxAckBody = from_json(buf)?;
                Ok(Packet::TxAck(TxAck { token, error: body.txpk_ack.error }))
            }
        }
    }

    /// Gives the identifier byte of the packet.
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::PushData(_) => PacketType::PushData,
            Packet::PushAck(_) => PacketType::PushAck,
            Packet::PullData(_) => PacketType::PullData,
            Packet::PullResp(_) => PacketType::PullResp,
            Packet::PullAck(_) => PacketType::PullAck,
            Packet::TxAck(_) => PacketType::TxAck,
        }
    }

    /// Gives the random token of the packet.
    pub fn token(&self) -> u16 {
        match self {
            Packet::PushData(p) => p.token,
            Packet::PushAck(p) => p.token,
            Packet::PullData(p) => p.token,
            Packet::PullResp(p) => p.token,
            Packet::PullAck(p) => p.token,
            Packet::TxAck(p) => p.token,
        }
    }

    /// Serializes the packet into the bytes of a UDP datagram.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + GATEWAY_EUI_LEN);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u16(self.token());
        buf.put_u8(self.packet_type() as u8);

        match self {
            Packet::PushData(p) => {
                buf.put_slice(&p.gateway_eui);
                let body = PushBody { rxpk: p.rxpk.clone(), stat: p.stat.clone() };
                buf.put_slice(&to_json(&body)?);
            }
            Packet::PullData(p) => buf.put_slice(&p.gateway_eui),
            Packet::PullResp(p) => {
                buf.put_slice(&to_json(&PullRespBody { txpk: p.txpk.clone() })?)
            }
            Packet::TxAck(p) => {
                buf.put_slice(&to_json(&TxAckBody { txpk_ack: TxAckStatus { error: p.error } })?)
            }
            Packet::PushAck(_) | Packet::PullAck(_) => {}
        }

        Ok(buf.to_vec())
    }
}

fn read_gateway_eui(buf: &mut &[u8]) -> Result<GatewayEui, Error> {
    if buf.remaining() < GATEWAY_EUI_LEN {
        return Err(Error::Malformed("gateway EUI"));
    }
    let mut eui = [0u8; GATEWAY_EUI_LEN];
    buf.copy_to_slice(&mut eui);
    Ok(eui)
}

fn from_json<B: DeserializeOwned>(bytes: &[u8]) -> Result<B, Error> {
    serde_json::from_slice(bytes).map_err(|_| Error::Malformed("json"))
}

fn to_json<B: Serialize>(body: &B) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(body).map_err(|_| Error::Malformed("json"))
}
