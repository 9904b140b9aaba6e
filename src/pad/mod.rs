//! Pad Management Module.
//!
//! This module handles the allocation, at-rest protection, consumption and
//! destruction of one-time pads.
//!
//! # Components
//! - `allocation`: splits raw TRNG output into per-user pads.
//! - `lifecycle`: the sealed pad store and its two-phase consumption.
//! - `index`: per-user index MACs that detect reordering, removal or insertion.
//! - `burn`: irreversible deletion of key material.
//!
//! # Security Guarantees
//! - **Zeroization**: pad plaintext lives only in `Zeroizing` buffers.
//! - **Usage Enforcement**: a pad leaves the store exactly when it is used.
//! - **Integrity**: every row and every user index is authenticated; tampering fails closed.

pub mod allocation;
pub mod burn;
pub mod index;
pub mod lifecycle;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::cascade::CascadeError;
use crate::core::otp_engine::OtpError;
use crate::core::PAD_IDENTIFIER_SIZE;
use crate::storage::StorageError;

/// User name within a group.
pub type CallSign = String;

/// Users are named in this order; the group size is bounded by the list.
pub const CALL_SIGNS: [&str; 26] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa", "quebec", "romeo", "sierra", "tango",
    "uniform", "victor", "whiskey", "xray", "yankee", "zulu",
];

/// Errors related to pad operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PadError {
    #[error("at least one user is required")]
    NoUsers,
    #[error("{0} users exceeds the call sign list")]
    TooManyUsers(usize),
    #[error("{pads} pads cannot be shared between {users} users")]
    NotEnoughPads { pads: usize, users: usize },
    #[error("unknown user")]
    UnknownUser,
    /// Every pad of this user has been used.
    #[error("no pads remaining")]
    Exhausted,
    /// The verified pad is no longer in the store.
    #[error("pad already consumed")]
    AlreadyConsumed,
    /// A sealed row failed authentication.
    #[error("pad row failed authentication")]
    RowTampered,
    /// A user index MAC did not verify.
    #[error("pad index failed authentication")]
    IndexTampered,
    #[error("cascade error: {0}")]
    Cascade(#[from] CascadeError),
    #[error("pad cipher error: {0}")]
    Otp(#[from] OtpError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One plaintext pad, as produced by allocation.
pub struct OneTimePad {
    pub pad_num: u32,
    pub pad_identifier: [u8; PAD_IDENTIFIER_SIZE],
    pub pad: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for OneTimePad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneTimePad")
            .field("pad_num", &self.pad_num)
            .field("pad_identifier", &hex::encode(self.pad_identifier))
            .finish_non_exhaustive()
    }
}

/// A sealed pad as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
#[serde(rename_all = "camelCase")]
pub struct PadRow {
    pub pad_num: u32,
    /// Identifier hex, in clear so incoming messages can be matched.
    pub pad_identifier: String,
    /// Cascade ciphertext hex.
    pub pad: String,
    /// Cascade MAC hex.
    pub mac: String,
}
