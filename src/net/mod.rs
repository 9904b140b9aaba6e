//! Group relay protocol.
//!
//! Requests and responses carry already-encrypted message packets between
//! group members and a relay. The relay only sees a group identifier; the
//! payload is encrypted with a Skein-512 keystream and authenticated with a
//! keyed Skein-512 MAC, both derived from the shared group key.
//!
//! - `payload`: plaintext request/response layouts and traffic padding.
//! - `crypto`: key derivation, keystream, MAC.
//! - `envelope`: wire encodings (base64 requests, hex responses).
//! - `client`: the `Transport` collaborator and the request/response loop.
//! - `relay`: an in-memory relay for loopback use.

pub mod client;
pub mod crypto;
pub mod envelope;
pub mod payload;
pub mod relay;

pub use client::{NetworkClient, NetworkConfig, ReceivedPacket, ServerResponse, Transport};

use thiserror::Error;

use crate::entropy::EntropyError;

pub const GROUP_IDENTIFIER_SIZE: usize = 8;
pub const NONCE_SIZE: usize = 32;
pub const NETWORK_MAC_SIZE: usize = 64;
pub const TIMESTAMP_SIZE: usize = 5;
pub const USER_CODE_SIZE: usize = 1;
pub const ACTION_SIZE: usize = 1;
pub const PADDING_LENGTH_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NetError {
    /// A field had the wrong length or encoding.
    #[error("malformed {0}")]
    Malformed(&'static str),
    #[error("group key must not be empty")]
    InvalidKey,
    #[error("group identifier must be 8 bytes of hex")]
    InvalidGroupIdentifier,
    #[error("padding bounds do not contain a whole byte count")]
    InvalidPaddingRange,
    #[error("padding of {0} bytes does not fit the length field")]
    PaddingTooLong(usize),
    #[error("unknown user")]
    UnknownUser,
    #[error("response failed authentication")]
    AuthenticationFailed,
    /// The relay echoed our own nonce back.
    #[error("response reused the request nonce")]
    ReflectedNonce,
    #[error("response timestamp outside the allowed window")]
    StaleResponse,
    #[error("connection failed")]
    ConnectionFailed,
    #[error("entropy error: {0}")]
    Entropy(#[from] EntropyError),
}

/// Request action code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApiAction {
    TestConnection = 0,
    ReceiveMessages = 1,
    SendMessages = 2,
}

impl ApiAction {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ApiAction {
    type Error = NetError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ApiAction::TestConnection),
            1 => Ok(ApiAction::ReceiveMessages),
            2 => Ok(ApiAction::SendMessages),
            _ => Err(NetError::Malformed("action")),
        }
    }
}

/// Relay status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    NoMessages,
    AuthenticationFailed,
    ServerError,
    Unknown(u8),
}

impl ResponseCode {
    pub fn code(self) -> u8 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::NoMessages => 1,
            ResponseCode::AuthenticationFailed => 2,
            ResponseCode::ServerError => 3,
            ResponseCode::Unknown(code) => code,
        }
    }
}

impl From<u8> for ResponseCode {
    fn from(code: u8) -> Self {
        match code {
            0 => ResponseCode::Success,
            1 => ResponseCode::NoMessages,
            2 => ResponseCode::AuthenticationFailed,
            3 => ResponseCode::ServerError,
            other => ResponseCode::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in 0..=255u8 {
            assert_eq!(ResponseCode::from(code).code(), code);
        }
        assert_eq!(ApiAction::try_from(2).unwrap(), ApiAction::SendMessages);
        assert!(ApiAction::try_from(9).is_err());
    }
}
