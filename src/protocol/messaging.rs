//! End-to-end messaging for one group member.
//!
//! Sending encrypts with the member's next pad, persists the store with that
//! pad gone, and only then hands the packet to the relay. A crash or a failed
//! request after encryption can lose a pad but never reuses one. Unsent
//! packets wait in an outbox for the next flush.
//!
//! Receiving verifies each relayed packet against the sender's pads, consumes
//! exactly the pads whose messages verified and persists the result before
//! returning the plaintext.

use super::ProtocolError;
use crate::core::framer::current_utc_timestamp;
use crate::core::MESSAGE_SIZE;
use crate::entropy::EntropySource;
use crate::net::{NetworkClient, ResponseCode, Transport};
use crate::pad::lifecycle::{PadStore, Received, VerifiedPad};
use crate::pad::CallSign;
use crate::storage::KeyValueStore;

/// A verified, decrypted message from another member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from_user: CallSign,
    pub plaintext: String,
    pub timestamp: u32,
}

/// Outcome of one receive round.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReceiveReport {
    pub messages: Vec<InboundMessage>,
    /// Packets with no matching pad (replays, or pads already used).
    pub unknown: usize,
    /// Packets whose pad row or message MAC did not verify.
    pub invalid: usize,
}

pub struct Messenger<T: Transport> {
    call_sign: CallSign,
    pads: PadStore,
    client: NetworkClient<T>,
    outbox: Vec<String>,
}

impl<T: Transport> Messenger<T> {
    pub fn new(call_sign: &str, pads: PadStore, client: NetworkClient<T>) -> Result<Self, ProtocolError> {
        if !pads.users().any(|user| user == call_sign) {
            return Err(ProtocolError::UnknownUser);
        }
        Ok(Self {
            call_sign: call_sign.to_owned(),
            pads,
            client,
            outbox: Vec::new(),
        })
    }

    pub fn call_sign(&self) -> &str {
        &self.call_sign
    }

    pub fn pads(&self) -> &PadStore {
        &self.pads
    }

    pub fn client(&self) -> &NetworkClient<T> {
        &self.client
    }

    /// Packets encrypted but not yet accepted by the relay.
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    pub fn pads_remaining(&self) -> usize {
        self.pads.pads_remaining(&self.call_sign)
    }

    /// Encrypts `plaintext` with our next pad and sends it with anything still queued.
    ///
    /// `store` is written before any network I/O. If that write fails the
    /// packet is dropped unsent.
    pub fn send<S, R>(&mut self, plaintext: &str, store: &mut S, rng: &mut R) -> Result<(), ProtocolError>
    where
        S: KeyValueStore + ?Sized,
        R: EntropySource + ?Sized,
    {
        if plaintext.len() > MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLong(plaintext.len()));
        }

        let packet = self
            .pads
            .encrypt_message(&self.call_sign, plaintext, current_utc_timestamp(), rng)?;
        self.save(store)?;
        self.outbox.push(packet);
        self.flush_outbox(rng)
    }

    /// Retries every queued packet in one request.
    pub fn flush_outbox<R: EntropySource + ?Sized>(&mut self, rng: &mut R) -> Result<(), ProtocolError> {
        if self.outbox.is_empty() {
            return Ok(());
        }

        let response = self.client.send_messages(&self.outbox, rng)?;
        if response.response_code != ResponseCode::Success {
            log::warn!("Relay refused {} packet(s): {:?}", self.outbox.len(), response.response_code);
            return Err(ProtocolError::Rejected(response.response_code));
        }

        log::info!("Relay accepted {} packet(s)", self.outbox.len());
        self.outbox.clear();
        Ok(())
    }

    /// Fetches new packets, verifies them and consumes the pads that verified.
    ///
    /// Messages are returned only once `store` no longer holds their pads.
    pub fn receive<S, R>(&mut self, store: &mut S, rng: &mut R) -> Result<ReceiveReport, ProtocolError>
    where
        S: KeyValueStore + ?Sized,
        R: EntropySource + ?Sized,
    {
        let response = self.client.receive_messages(rng)?;
        match response.response_code {
            ResponseCode::Success | ResponseCode::NoMessages => {}
            other => return Err(ProtocolError::Rejected(other)),
        }

        let mut report = ReceiveReport::default();
        let mut verified = Vec::new();
        for packet in &response.packets {
            if packet.from_user == self.call_sign {
                continue;
            }
            match self.pads.verify_message(&packet.from_user, &packet.ciphertext_hex) {
                Received::Valid { pad, .. }
                    if verified
                        .iter()
                        .any(|v: &VerifiedPad| v.call_sign() == pad.call_sign() && v.pad_num() == pad.pad_num()) =>
                {
                    log::warn!("Duplicate packet for pad {} of {}", pad.pad_num(), packet.from_user);
                    report.unknown += 1;
                }
                Received::Valid { message, pad } => {
                    report.messages.push(InboundMessage {
                        from_user: packet.from_user.clone(),
                        plaintext: message.plaintext,
                        timestamp: message.timestamp,
                    });
                    verified.push(pad);
                }
                Received::NotFound => {
                    log::warn!("No pad of {} matches a received packet", packet.from_user);
                    report.unknown += 1;
                }
                Received::Invalid => report.invalid += 1,
            }
        }

        if !verified.is_empty() {
            self.pads.delete_verified_message_pads(verified)?;
            self.save(store)?;
        }
        Ok(report)
    }

    /// Persists the pad store.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), ProtocolError> {
        self.pads.save(store)?;
        Ok(())
    }

    pub fn into_parts(self) -> (PadStore, NetworkClient<T>) {
        (self.pads, self.client)
    }
}
