//! Register identities and the pack/unpack contract shared by all codecs.

use bytes::{Bytes, BytesMut};
use std::fmt;

use linecard_core::{Error, Result};

/// Firmware registers used by line card management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterId {
    /// General purpose capability register (slot count).
    Mgpir,
    /// Thermal sensor capability register (per-slot sensor bitmap).
    Mtecr,
    /// Slot status query register.
    Mddq,
    /// Slot control register.
    Mddc,
}

impl RegisterId {
    /// Firmware register identifier.
    #[must_use]
    pub const fn id(&self) -> u16 {
        match self {
            Self::Mgpir => 0x9100,
            Self::Mtecr => 0x9109,
            Self::Mddq => 0x9161,
            Self::Mddc => 0x9163,
        }
    }

    /// Payload length in bytes.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        match self {
            Self::Mgpir => 0xa0,
            Self::Mtecr => 0x60,
            Self::Mddq => 0x30,
            Self::Mddc => 0x30,
        }
    }

    /// Register mnemonic.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mgpir => "MGPIR",
            Self::Mtecr => "MTECR",
            Self::Mddq => "MDDQ",
            Self::Mddc => "MDDC",
        }
    }

    /// Look up a register by its firmware identifier.
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0x9100 => Some(Self::Mgpir),
            0x9109 => Some(Self::Mtecr),
            0x9161 => Some(Self::Mddq),
            0x9163 => Some(Self::Mddc),
            _ => None,
        }
    }

    /// Reject payloads too short to hold this register.
    ///
    /// # Errors
    /// Returns `Error::ProtocolMismatch` if `payload` is shorter than [`payload_len`](Self::payload_len).
    pub fn check_len(&self, payload: &[u8]) -> Result<()> {
        if payload.len() < self.payload_len() {
            return Err(Error::ProtocolMismatch(format!(
                "{} payload is {} bytes, expected {}",
                self.name(),
                payload.len(),
                self.payload_len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04x})", self.name(), self.id())
    }
}

/// A typed view of one register payload.
///
/// Implementors describe how their fields map onto the payload through
/// [`pack`](Register::pack) and [`unpack`](Register::unpack); the provided
/// [`encode`](Register::encode) and [`decode`](Register::decode) add buffer
/// allocation and length checking. Requests and responses of the same
/// register share one payload layout and therefore one [`RegisterId`].
pub trait Register: Sized {
    /// Register this type is laid out in.
    const ID: RegisterId;

    /// Write all fields into a zeroed payload of `ID.payload_len()` bytes.
    fn pack(&self, buf: &mut [u8]);

    /// Read all fields from a payload at least `ID.payload_len()` bytes long.
    ///
    /// # Errors
    /// Returns `Error::ProtocolMismatch` for enum fields holding unknown values.
    fn unpack(buf: &[u8]) -> Result<Self>;

    /// Encode into a fresh payload.
    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::zeroed(Self::ID.payload_len());
        self.pack(&mut buf);
        buf.freeze()
    }

    /// Decode from a payload received from the transport.
    ///
    /// # Errors
    /// Returns `Error::ProtocolMismatch` if the payload is truncated or
    /// holds an unknown enum value.
    fn decode(payload: &[u8]) -> Result<Self> {
        Self::ID.check_len(payload)?;
        Self::unpack(payload)
    }
}
