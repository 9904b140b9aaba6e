//! One-time pad messaging.
//!
//! - [`core`]: message framing and the OTP encrypt/authenticate pipeline.
//! - [`cascade`]: AES-256-CTR + Salsa20 cipher, Keccak-512 + Skein-512 MAC and
//!   password derivation for pads at rest.
//! - [`pad`]: pad allocation, sealed pad rows, tamper-evident index, consumption.
//! - [`net`]: encrypted, authenticated relay requests and responses.
//! - [`entropy`]: camera TRNG with FIPS 140-2 self-tests.
//! - [`storage`]: key-value persistence and the password vault.
//! - [`protocol`]: end-to-end send/receive for one group member.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod cascade;
pub mod config;
pub mod core;
pub mod entropy;
pub mod net;
pub mod pad;
pub mod protocol;
pub mod storage;

pub use config::Config;
pub use protocol::Messenger;

