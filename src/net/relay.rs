//! In-memory relay.
//!
//! Plays the server side of the protocol for one group: stores sent packets
//! and hands each member the packets from others it has not yet fetched.
//! Used for local testing and loopback setups.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::client::{parse_group_identifier, unix_now, Transport};
use super::crypto::{derive_encryption_and_mac_keys, encrypt_or_decrypt_payload, verify_response_mac, NetworkKeys};
use super::envelope::{decode_request_data, encrypt_response};
use super::payload::{deserialise_request_payload, serialise_response_for_encryption, RelayedPacket};
use super::{ApiAction, NetError, ResponseCode, GROUP_IDENTIFIER_SIZE, NONCE_SIZE};
use crate::entropy::os::OsSource;
use crate::entropy::EntropySource;

#[derive(Debug)]
pub struct MemoryRelay {
    keys: NetworkKeys,
    group_identifier: [u8; GROUP_IDENTIFIER_SIZE],
    mailbox: Vec<RelayedPacket>,
    cursors: BTreeMap<u8, usize>,
    requests_handled: usize,
    clock_offset: i64,
    reflect_nonce: bool,
}

impl MemoryRelay {
    pub fn new(group_key: &[u8], group_identifier_hex: &str) -> Result<Self, NetError> {
        Ok(Self {
            keys: derive_encryption_and_mac_keys(group_key)?,
            group_identifier: parse_group_identifier(group_identifier_hex)?,
            mailbox: Vec::new(),
            cursors: BTreeMap::new(),
            requests_handled: 0,
            clock_offset: 0,
            reflect_nonce: false,
        })
    }

    pub fn shared(self) -> SharedRelay {
        SharedRelay(Arc::new(Mutex::new(self)))
    }

    pub fn requests_handled(&self) -> usize {
        self.requests_handled
    }

    pub fn stored_packets(&self) -> usize {
        self.mailbox.len()
    }

    pub fn mailbox(&self) -> &[RelayedPacket] {
        &self.mailbox
    }

    /// Shifts the relay clock, in seconds.
    pub fn set_clock_offset(&mut self, offset: i64) {
        self.clock_offset = offset;
    }

    /// Answer with the request's own nonce instead of a fresh one.
    pub fn set_reflect_nonce(&mut self, reflect: bool) {
        self.reflect_nonce = reflect;
    }

    fn now(&self) -> u64 {
        unix_now().saturating_add_signed(self.clock_offset)
    }

    pub fn handle(&mut self, body: &str) -> Result<String, NetError> {
        self.requests_handled += 1;
        let request = decode_request_data(body)?;
        if request.group_identifier != self.group_identifier {
            return Err(NetError::ConnectionFailed);
        }

        let mut nonce = [0u8; NONCE_SIZE];
        if self.reflect_nonce {
            nonce = request.nonce;
        } else {
            OsSource::new().fill(&mut nonce)?;
        }

        if !verify_response_mac(
            &*self.keys.mac_key,
            &request.nonce,
            &request.payload,
            &self.group_identifier,
            &request.mac,
        ) {
            log::warn!("Relay rejected an unauthenticated request");
            return self.respond(&nonce, ResponseCode::AuthenticationFailed, &[]);
        }

        let plaintext = encrypt_or_decrypt_payload(&*self.keys.encryption_key, &request.nonce, &request.payload);
        let payload = deserialise_request_payload(&plaintext)?;

        match payload.action {
            ApiAction::TestConnection => self.respond(&nonce, ResponseCode::Success, &[]),
            ApiAction::SendMessages => {
                self.mailbox.extend(payload.packets.into_iter().map(|packet| RelayedPacket {
                    from_user: payload.from_user,
                    packet,
                }));
                self.respond(&nonce, ResponseCode::Success, &[])
            }
            ApiAction::ReceiveMessages => {
                let cursor = self.cursors.entry(payload.from_user).or_insert(0);
                let pending: Vec<RelayedPacket> = self.mailbox[*cursor..]
                    .iter()
                    .filter(|m| m.from_user != payload.from_user)
                    .cloned()
                    .collect();
                *cursor = self.mailbox.len();

                let code = if pending.is_empty() {
                    ResponseCode::NoMessages
                } else {
                    ResponseCode::Success
                };
                self.respond(&nonce, code, &pending)
            }
        }
    }

    fn respond(
        &self,
        nonce: &[u8; NONCE_SIZE],
        code: ResponseCode,
        messages: &[RelayedPacket],
    ) -> Result<String, NetError> {
        let plaintext = serialise_response_for_encryption(code, &[], self.now(), messages)?;
        Ok(encrypt_response(&self.keys, &self.group_identifier, nonce, &plaintext))
    }
}

impl Transport for MemoryRelay {
    fn post(&mut self, _url: &str, body: &str) -> Result<String, NetError> {
        self.handle(body)
    }
}

/// A relay several clients can hold at once.
#[derive(Debug, Clone)]
pub struct SharedRelay(Arc<Mutex<MemoryRelay>>);

impl SharedRelay {
    pub fn with<F, R>(&self, f: F) -> Result<R, NetError>
    where
        F: FnOnce(&mut MemoryRelay) -> R,
    {
        let mut relay = self.0.lock().map_err(|_| NetError::ConnectionFailed)?;
        Ok(f(&mut relay))
    }
}

impl Transport for SharedRelay {
    fn post(&mut self, _url: &str, body: &str) -> Result<String, NetError> {
        self.with(|relay| relay.handle(body))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TOTAL_PAD_SIZE;
    use crate::net::crypto::compute_mac;
    use crate::net::envelope::serialise_and_encode_request_data;
    use crate::net::payload::serialise_payload_for_encryption;

    const KEY: &[u8] = b"relay test key";
    const GROUP_HEX: &str = "a1a2a3a4a5a6a7a8";

    fn request(relay: &MemoryRelay, from_user: u8, action: ApiAction, packets: &[Vec<u8>]) -> String {
        let nonce = [from_user; NONCE_SIZE];
        let payload = serialise_payload_for_encryption(from_user, action, &[], unix_now(), packets).unwrap();
        let ciphertext = encrypt_or_decrypt_payload(&*relay.keys.encryption_key, &nonce, &payload);
        let mac = compute_mac(&*relay.keys.mac_key, &nonce, &ciphertext, &relay.group_identifier);
        serialise_and_encode_request_data(&relay.group_identifier, &nonce, &ciphertext, &mac)
    }

    #[test]
    fn test_stores_and_counts() {
        let mut relay = MemoryRelay::new(KEY, GROUP_HEX).unwrap();
        let body = request(&relay, 0, ApiAction::SendMessages, &[vec![0; TOTAL_PAD_SIZE]]);
        relay.handle(&body).unwrap();
        assert_eq!(relay.stored_packets(), 1);
        assert_eq!(relay.requests_handled(), 1);
    }

    #[test]
    fn test_rejects_foreign_group() {
        let mut relay = MemoryRelay::new(KEY, GROUP_HEX).unwrap();
        let other = MemoryRelay::new(KEY, "0000000000000000").unwrap();
        let body = request(&other, 0, ApiAction::TestConnection, &[]);
        assert_eq!(relay.handle(&body), Err(NetError::ConnectionFailed));
        assert_eq!(relay.handle("garbage"), Err(NetError::Malformed("request encoding")));
    }

    #[test]
    fn test_shared_relay() {
        let shared = MemoryRelay::new(KEY, GROUP_HEX).unwrap().shared();
        let body = shared
            .with(|relay| request(relay, 1, ApiAction::SendMessages, &[vec![1; TOTAL_PAD_SIZE]]))
            .unwrap();
        let mut handle = shared.clone();
        handle.post("ignored", &body).unwrap();
        assert_eq!(shared.with(|relay| relay.stored_packets()).unwrap(), 1);
    }
}
