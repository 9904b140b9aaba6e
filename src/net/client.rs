//! Request/response loop against a group relay.

use serde::Deserialize;

use super::crypto::{compute_mac, derive_encryption_and_mac_keys, encrypt_or_decrypt_payload, NetworkKeys};
use super::envelope::{decrypt_response, serialise_and_encode_request_data};
use super::payload::{
    call_sign_from_code, deserialise_decrypted_data, get_padding_bytes, serialise_payload_for_encryption,
    user_code, PaddingConfig, ResponsePayload,
};
use super::{ApiAction, NetError, ResponseCode, GROUP_IDENTIFIER_SIZE, NONCE_SIZE};
use crate::entropy::EntropySource;
use crate::pad::CallSign;

/// Carries an encoded request to the relay and returns its raw response.
pub trait Transport {
    fn post(&mut self, url: &str, body: &str) -> Result<String, NetError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn post(&mut self, url: &str, body: &str) -> Result<String, NetError> {
        (**self).post(url, body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub server_url: String,
    /// 16 hex characters.
    pub group_identifier: String,
    #[serde(flatten)]
    pub padding: PaddingConfig,
    /// Largest accepted difference between our clock and the relay's.
    pub max_timestamp_skew_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080/api".to_string(),
            group_identifier: "0000000000000000".to_string(),
            padding: PaddingConfig::default(),
            max_timestamp_skew_secs: 300,
        }
    }
}

pub fn parse_group_identifier(hex_str: &str) -> Result<[u8; GROUP_IDENTIFIER_SIZE], NetError> {
    let bytes = hex::decode(hex_str.trim()).map_err(|_| NetError::InvalidGroupIdentifier)?;
    bytes.try_into().map_err(|_| NetError::InvalidGroupIdentifier)
}

/// A packet the relay delivered from another member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPacket {
    pub from_user: CallSign,
    pub ciphertext_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub response_code: ResponseCode,
    pub timestamp: u64,
    pub packets: Vec<ReceivedPacket>,
}

pub(crate) fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

pub struct NetworkClient<T: Transport> {
    transport: T,
    config: NetworkConfig,
    group_identifier: [u8; GROUP_IDENTIFIER_SIZE],
    keys: NetworkKeys,
    user_code: u8,
}

impl<T: Transport> NetworkClient<T> {
    pub fn new(transport: T, config: NetworkConfig, group_key: &[u8], call_sign: &str) -> Result<Self, NetError> {
        let group_identifier = parse_group_identifier(&config.group_identifier)?;
        let keys = derive_encryption_and_mac_keys(group_key)?;
        let user_code = user_code(call_sign)?;
        Ok(Self {
            transport,
            config,
            group_identifier,
            keys,
            user_code,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sends message packets (hex, one pad each) to the relay.
    pub fn send_messages<R: EntropySource + ?Sized>(
        &mut self,
        packets: &[String],
        rng: &mut R,
    ) -> Result<ServerResponse, NetError> {
        let packets = packets
            .iter()
            .map(|p| hex::decode(p).map_err(|_| NetError::Malformed("message packet")))
            .collect::<Result<Vec<_>, _>>()?;
        self.request(ApiAction::SendMessages, &packets, rng)
    }

    pub fn receive_messages<R: EntropySource + ?Sized>(&mut self, rng: &mut R) -> Result<ServerResponse, NetError> {
        self.request(ApiAction::ReceiveMessages, &[], rng)
    }

    pub fn test_connection<R: EntropySource + ?Sized>(&mut self, rng: &mut R) -> Result<ResponseCode, NetError> {
        self.request(ApiAction::TestConnection, &[], rng)
            .map(|response| response.response_code)
    }

    fn request<R: EntropySource + ?Sized>(
        &mut self,
        action: ApiAction,
        packets: &[Vec<u8>],
        rng: &mut R,
    ) -> Result<ServerResponse, NetError> {
        let padding = get_padding_bytes(&self.config.padding, rng)?;
        let payload = serialise_payload_for_encryption(self.user_code, action, &padding, unix_now(), packets)?;

        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce)?;
        let ciphertext = encrypt_or_decrypt_payload(&*self.keys.encryption_key, &nonce, &payload);
        let mac = compute_mac(&*self.keys.mac_key, &nonce, &ciphertext, &self.group_identifier);
        let body = serialise_and_encode_request_data(&self.group_identifier, &nonce, &ciphertext, &mac);

        log::debug!("Sending {:?} with {} packet(s)", action, packets.len());
        let response_hex = self.transport.post(&self.config.server_url, &body)?;

        let decrypted = decrypt_response(&self.keys, &self.group_identifier, &response_hex)?;
        if decrypted.nonce == nonce {
            log::warn!("Relay response reused the request nonce");
            return Err(NetError::ReflectedNonce);
        }

        let response = deserialise_decrypted_data(&decrypted.plaintext)?;
        self.check_timestamp(response.timestamp)?;
        Ok(self.into_server_response(response))
    }

    fn check_timestamp(&self, timestamp: u64) -> Result<(), NetError> {
        let skew = unix_now().abs_diff(timestamp);
        if skew > self.config.max_timestamp_skew_secs {
            log::warn!("Relay response is {}s away from local time", skew);
            return Err(NetError::StaleResponse);
        }
        Ok(())
    }

    fn into_server_response(&self, response: ResponsePayload) -> ServerResponse {
        let packets = response
            .messages
            .into_iter()
            .filter_map(|message| match call_sign_from_code(message.from_user) {
                Some(call_sign) => Some(ReceivedPacket {
                    from_user: call_sign.to_string(),
                    ciphertext_hex: hex::encode(message.packet),
                }),
                None => {
                    log::warn!("Dropping packet from unknown user code {}", message.from_user);
                    None
                }
            })
            .collect();

        ServerResponse {
            response_code: response.response_code,
            timestamp: response.timestamp,
            packets,
        }
    }
}
