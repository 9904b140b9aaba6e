//! Protocol layer.
//!
//! Ties the pad store to the relay client: one [`messaging::Messenger`] per
//! group member.

pub mod messaging;

use thiserror::Error;

use crate::net::{NetError, ResponseCode};
use crate::pad::PadError;

/// Errors related to protocol execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The call sign holds no pads in this store.
    #[error("call sign has no pads in this store")]
    UnknownUser,
    #[error("message of {0} bytes exceeds one packet")]
    MessageTooLong(usize),
    /// The relay answered with something other than success.
    #[error("relay answered {0:?}")]
    Rejected(ResponseCode),
    #[error(transparent)]
    Pad(#[from] PadError),
    #[error(transparent)]
    Net(#[from] NetError),
}

pub use messaging::{InboundMessage, Messenger, ReceiveReport};
