//! Pad Store Lifecycle Management.
//!
//! The store holds every user's sealed pads plus one index MAC per user, and
//! is the only way to reach pad plaintext.
//!
//! Receiving is two-phase. [`PadStore::verify_message`] opens the row and
//! checks the message MAC without changing anything; only the resulting
//! [`VerifiedPad`] token can be passed to [`PadStore::consume`] or
//! [`PadStore::delete_verified_message_pads`]. Sending opens, uses and removes
//! the user's next pad inside a single `&mut self` call.
//!
//! # Security
//! - **Zeroization**: opened pads live in `Zeroizing` buffers, removed rows are burned.
//! - **Fail closed**: a tampered row or index is reported, never repaired.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::burn::Burnable;
use super::index::{
    create_mac_of_all_database_indexes, create_mac_of_database_index,
    verify_all_user_database_indexes, verify_database_index,
};
use super::{CallSign, OneTimePad, PadError, PadRow};
use crate::cascade::sealed::{cascade_encrypt_and_mac, cascade_verify_mac_and_decrypt};
use crate::cascade::DerivedKeySet;
use crate::core::otp_engine::{
    decrypt_and_verify_message, encrypt_message, get_pad_identifier_from_ciphertext,
    DecryptedMessage, MessageVerification,
};
use crate::entropy::EntropySource;
use crate::storage::{KeyValueStore, StorageError};

/// Key under which the store is persisted.
pub const PAD_STORE_KEY: &str = "pad_store";

/// Result of looking up the pad for an incoming ciphertext.
#[derive(Debug, PartialEq, Eq)]
pub enum PadLookup<'a> {
    Found {
        pad_index: usize,
        pad_identifier: String,
        row: &'a PadRow,
    },
    /// `pad_identifier` is `None` when the ciphertext has no readable identifier.
    NotFound { pad_identifier: Option<String> },
}

/// Proof that a pad decrypted a message with a valid MAC.
///
/// Only [`PadStore::verify_message`] creates one, and consuming it removes the pad.
#[derive(Debug, PartialEq, Eq)]
pub struct VerifiedPad {
    call_sign: CallSign,
    pad_num: u32,
    pad_identifier: String,
}

impl VerifiedPad {
    pub fn call_sign(&self) -> &str {
        &self.call_sign
    }

    pub fn pad_num(&self) -> u32 {
        self.pad_num
    }

    pub fn pad_identifier(&self) -> &str {
        &self.pad_identifier
    }
}

/// Outcome of checking an incoming message.
#[derive(Debug, PartialEq, Eq)]
pub enum Received {
    /// No pad of this user carries the identifier. Possibly a replay.
    NotFound,
    /// A pad was found but the row or the message did not authenticate.
    Invalid,
    Valid {
        message: DecryptedMessage,
        pad: VerifiedPad,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedPads {
    pads: BTreeMap<CallSign, Vec<PadRow>>,
    index_macs: BTreeMap<CallSign, String>,
}

/// Sealed pads for every user of a group.
pub struct PadStore {
    keys: DerivedKeySet,
    rows: BTreeMap<CallSign, Vec<PadRow>>,
    index_macs: BTreeMap<CallSign, String>,
}

impl PadStore {
    /// Seals freshly allocated pads under `keys`.
    ///
    /// The plaintext pads are dropped (and wiped) when this returns.
    pub fn import(
        pads: BTreeMap<CallSign, Vec<OneTimePad>>,
        keys: DerivedKeySet,
    ) -> Result<Self, PadError> {
        let mut rows = BTreeMap::new();
        let mut total = 0;

        for (call_sign, user_pads) in &pads {
            let mut user_rows = Vec::with_capacity(user_pads.len());
            for pad in user_pads {
                let sealed = cascade_encrypt_and_mac(&keys, call_sign, pad.pad_num, &pad.pad)?;
                user_rows.push(PadRow {
                    pad_num: pad.pad_num,
                    pad_identifier: hex::encode(pad.pad_identifier),
                    pad: sealed.ciphertext_hex,
                    mac: sealed.mac_hex,
                });
            }
            total += user_rows.len();
            rows.insert(call_sign.clone(), user_rows);
        }

        let index_macs = create_mac_of_all_database_indexes(&keys, &rows)?;
        log::info!("Imported {} pads for {} users", total, rows.len());
        Ok(Self {
            keys,
            rows,
            index_macs,
        })
    }

    /// Call signs in the group.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn pads_remaining(&self, call_sign: &str) -> usize {
        self.rows.get(call_sign).map_or(0, Vec::len)
    }

    pub fn rows(&self, call_sign: &str) -> Option<&[PadRow]> {
        self.rows.get(call_sign).map(Vec::as_slice)
    }

    pub fn index_mac(&self, call_sign: &str) -> Option<&str> {
        self.index_macs.get(call_sign).map(String::as_str)
    }

    /// Checks every user's index MAC.
    pub fn verify_integrity(&self) -> bool {
        verify_all_user_database_indexes(&self.keys, &self.rows, &self.index_macs)
    }

    /// Finds the row of `call_sign` whose identifier prefixes `ciphertext_hex`.
    pub fn get_pad_to_decrypt_message(&self, ciphertext_hex: &str, call_sign: &str) -> PadLookup<'_> {
        let Some(pad_identifier) = get_pad_identifier_from_ciphertext(ciphertext_hex) else {
            return PadLookup::NotFound {
                pad_identifier: None,
            };
        };

        let found = self.rows.get(call_sign).and_then(|rows| {
            rows.iter()
                .enumerate()
                .find(|(_, row)| row.pad_identifier.eq_ignore_ascii_case(&pad_identifier))
        });

        match found {
            Some((pad_index, row)) => PadLookup::Found {
                pad_index,
                pad_identifier,
                row,
            },
            None => PadLookup::NotFound {
                pad_identifier: Some(pad_identifier),
            },
        }
    }

    /// Opens the matching pad and verifies the message. Nothing is consumed.
    pub fn verify_message(&self, call_sign: &str, ciphertext_hex: &str) -> Received {
        let (pad_identifier, row) = match self.get_pad_to_decrypt_message(ciphertext_hex, call_sign) {
            PadLookup::Found {
                pad_identifier,
                row,
                ..
            } => (pad_identifier, row),
            PadLookup::NotFound { .. } => return Received::NotFound,
        };

        let Ok(identifier_bytes) = hex::decode(&pad_identifier) else {
            return Received::Invalid;
        };
        let Some(pad) = cascade_verify_mac_and_decrypt(
            &self.keys,
            call_sign,
            row.pad_num,
            &identifier_bytes,
            &row.pad,
            &row.mac,
        ) else {
            return Received::Invalid;
        };

        match decrypt_and_verify_message(&pad, ciphertext_hex) {
            MessageVerification::Valid(message) => Received::Valid {
                message,
                pad: VerifiedPad {
                    call_sign: call_sign.to_owned(),
                    pad_num: row.pad_num,
                    pad_identifier: row.pad_identifier.clone(),
                },
            },
            MessageVerification::Invalid => {
                log::warn!("Message for pad {} of {} failed verification", row.pad_num, call_sign);
                Received::Invalid
            }
        }
    }

    /// Removes the pad that verified a message.
    pub fn consume(&mut self, pad: VerifiedPad) -> Result<(), PadError> {
        match self.delete_verified_message_pads(vec![pad])? {
            0 => Err(PadError::AlreadyConsumed),
            _ => Ok(()),
        }
    }

    /// Removes every verified pad still present. Returns how many were removed.
    ///
    /// Rows are removed by identity, highest index first, and each affected
    /// user's index MAC is recomputed.
    pub fn delete_verified_message_pads(&mut self, pads: Vec<VerifiedPad>) -> Result<usize, PadError> {
        let mut by_user: BTreeMap<CallSign, Vec<VerifiedPad>> = BTreeMap::new();
        for pad in pads {
            by_user.entry(pad.call_sign.clone()).or_default().push(pad);
        }

        let mut removed = 0;
        for (call_sign, verified) in by_user {
            self.check_index(&call_sign)?;
            let rows = self.rows.get_mut(&call_sign).ok_or(PadError::UnknownUser)?;

            let mut indexes: Vec<usize> = rows
                .iter()
                .enumerate()
                .filter(|(_, row)| {
                    verified
                        .iter()
                        .any(|v| v.pad_num == row.pad_num && v.pad_identifier == row.pad_identifier)
                })
                .map(|(i, _)| i)
                .collect();
            indexes.sort_unstable_by(|a, b| b.cmp(a));

            for index in &indexes {
                let mut row = rows.remove(*index);
                row.burn();
            }
            if indexes.len() < verified.len() {
                log::warn!(
                    "{} verified pad(s) of {} were already consumed",
                    verified.len() - indexes.len(),
                    call_sign
                );
            }

            removed += indexes.len();
            self.refresh_index(&call_sign)?;
        }

        log::info!("Consumed {} received pad(s)", removed);
        Ok(removed)
    }

    /// Encrypts `plaintext` with the next pad of `call_sign` and removes that pad.
    pub fn encrypt_message<R: EntropySource + ?Sized>(
        &mut self,
        call_sign: &str,
        plaintext: &str,
        timestamp: u32,
        rng: &mut R,
    ) -> Result<String, PadError> {
        self.check_index(call_sign)?;
        let rows = self.rows.get(call_sign).ok_or(PadError::UnknownUser)?;
        let row = rows.first().ok_or(PadError::Exhausted)?;

        let identifier = hex::decode(&row.pad_identifier).map_err(|_| PadError::RowTampered)?;
        let pad = cascade_verify_mac_and_decrypt(
            &self.keys,
            call_sign,
            row.pad_num,
            &identifier,
            &row.pad,
            &row.mac,
        )
        .ok_or(PadError::RowTampered)?;

        let ciphertext = encrypt_message(&pad, plaintext, timestamp, rng)?;

        if let Some(rows) = self.rows.get_mut(call_sign) {
            let mut used = rows.remove(0);
            used.burn();
        }
        self.refresh_index(call_sign)?;
        log::debug!("Sent with pad of {}, {} left", call_sign, self.pads_remaining(call_sign));
        Ok(ciphertext)
    }

    /// Writes the sealed rows and index MACs under [`PAD_STORE_KEY`].
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), PadError> {
        let persisted = PersistedPads {
            pads: self.rows.clone(),
            index_macs: self.index_macs.clone(),
        };
        let bytes = serde_json::to_vec(&persisted).map_err(StorageError::from)?;
        store.set(PAD_STORE_KEY, &bytes)?;
        Ok(())
    }

    /// Reads a store back and verifies every index before returning it.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, keys: DerivedKeySet) -> Result<Self, PadError> {
        let bytes = store.get(PAD_STORE_KEY)?.ok_or(StorageError::NotFound)?;
        let persisted: PersistedPads = serde_json::from_slice(&bytes).map_err(StorageError::from)?;

        if !verify_all_user_database_indexes(&keys, &persisted.pads, &persisted.index_macs) {
            log::warn!("Refusing to load pad store with invalid indexes");
            return Err(PadError::IndexTampered);
        }

        Ok(Self {
            keys,
            rows: persisted.pads,
            index_macs: persisted.index_macs,
        })
    }

    fn check_index(&self, call_sign: &str) -> Result<(), PadError> {
        let rows = self.rows.get(call_sign).ok_or(PadError::UnknownUser)?;
        let mac = self.index_macs.get(call_sign).ok_or(PadError::IndexTampered)?;
        if !verify_database_index(&self.keys, call_sign, rows, mac) {
            log::warn!("Pad index for {} failed verification", call_sign);
            return Err(PadError::IndexTampered);
        }
        Ok(())
    }

    fn refresh_index(&mut self, call_sign: &str) -> Result<(), PadError> {
        let rows = self.rows.get(call_sign).ok_or(PadError::UnknownUser)?;
        let mac = create_mac_of_database_index(&self.keys, call_sign, rows)?;
        self.index_macs.insert(call_sign.to_owned(), mac);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::sealed::tests::test_keys;
    use crate::core::TOTAL_PAD_SIZE;
    use crate::entropy::os::OsSource;
    use crate::pad::allocation::create_pads;
    use crate::storage::memory::MemoryStore;

    fn random_pads(count: usize) -> Vec<u8> {
        let mut data = vec![0u8; count * TOTAL_PAD_SIZE];
        OsSource::new().fill(&mut data).unwrap();
        data
    }

    fn store(users: usize, pads: usize) -> PadStore {
        PadStore::import(create_pads(users, &random_pads(pads)).unwrap(), test_keys()).unwrap()
    }

    /// A second store sharing pads and keys, as another group member holds.
    fn pair(users: usize, pads: usize) -> (PadStore, PadStore) {
        let data = random_pads(pads);
        (
            PadStore::import(create_pads(users, &data).unwrap(), test_keys()).unwrap(),
            PadStore::import(create_pads(users, &data).unwrap(), test_keys()).unwrap(),
        )
    }

    #[test]
    fn test_import_counts_and_integrity() {
        let store = store(3, 10);
        assert_eq!(store.users().collect::<Vec<_>>(), vec!["alpha", "bravo", "charlie"]);
        assert_eq!(store.pads_remaining("alpha"), 3);
        assert_eq!(store.pads_remaining("charlie"), 4);
        assert_eq!(store.pads_remaining("zulu"), 0);
        assert!(store.verify_integrity());
        let row = &store.rows("alpha").unwrap()[0];
        assert_eq!(row.pad.len(), TOTAL_PAD_SIZE * 2);
        assert_eq!(row.mac.len(), 128);
    }

    #[test]
    fn test_send_receive_consume() {
        let (mut sender, mut receiver) = pair(2, 6);
        let mut rng = OsSource::new();

        let ciphertext = sender.encrypt_message("alpha", "hello bravo", 1_700_000_000, &mut rng).unwrap();
        assert_eq!(sender.pads_remaining("alpha"), 2);
        assert!(sender.verify_integrity());

        let Received::Valid { message, pad } = receiver.verify_message("alpha", &ciphertext) else {
            panic!("message should verify");
        };
        assert_eq!(message.plaintext, "hello bravo");
        assert_eq!(message.timestamp, 1_700_000_000);
        assert_eq!(pad.call_sign(), "alpha");
        assert_eq!(pad.pad_num(), 0);
        // Verification alone does not consume.
        assert_eq!(receiver.pads_remaining("alpha"), 3);

        receiver.consume(pad).unwrap();
        assert_eq!(receiver.pads_remaining("alpha"), 2);
        assert!(receiver.verify_integrity());

        // Replay finds no pad.
        assert_eq!(receiver.verify_message("alpha", &ciphertext), Received::NotFound);
    }

    #[test]
    fn test_lookup() {
        let (mut sender, receiver) = pair(1, 3);
        let ciphertext = sender
            .encrypt_message("alpha", "x", 0, &mut OsSource::new())
            .unwrap();

        match receiver.get_pad_to_decrypt_message(&ciphertext, "alpha") {
            PadLookup::Found { pad_index, pad_identifier, row } => {
                assert_eq!(pad_index, 0);
                assert_eq!(pad_identifier, ciphertext[..14]);
                assert_eq!(row.pad_num, 0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            receiver.get_pad_to_decrypt_message(&ciphertext, "bravo"),
            PadLookup::NotFound {
                pad_identifier: Some(ciphertext[..14].to_string())
            }
        );
        assert_eq!(
            receiver.get_pad_to_decrypt_message("xyz", "alpha"),
            PadLookup::NotFound { pad_identifier: None }
        );
    }

    #[test]
    fn test_tampered_message_is_invalid() {
        let (mut sender, receiver) = pair(1, 2);
        let mut ciphertext = sender
            .encrypt_message("alpha", "attack at dawn", 0, &mut OsSource::new())
            .unwrap();
        let flipped = if ciphertext.ends_with('0') { "1" } else { "0" };
        let last = ciphertext.len() - 1;
        ciphertext.replace_range(last.., flipped);
        assert_eq!(receiver.verify_message("alpha", &ciphertext), Received::Invalid);
        assert_eq!(receiver.pads_remaining("alpha"), 2);
    }

    #[test]
    fn test_tampered_row_is_invalid() {
        let (mut sender, mut receiver) = pair(1, 2);
        let ciphertext = sender
            .encrypt_message("alpha", "hi", 0, &mut OsSource::new())
            .unwrap();

        let row = &mut receiver.rows.get_mut("alpha").unwrap()[0];
        let flipped = if row.pad.starts_with('0') { "1" } else { "0" };
        row.pad.replace_range(0..1, flipped);
        assert_eq!(receiver.verify_message("alpha", &ciphertext), Received::Invalid);
    }

    #[test]
    fn test_batch_delete_and_double_consume() {
        let (mut sender, mut receiver) = pair(1, 5);
        let mut rng = OsSource::new();
        let mut verified = Vec::new();
        for text in ["one", "two", "three"] {
            let ct = sender.encrypt_message("alpha", text, 0, &mut rng).unwrap();
            match receiver.verify_message("alpha", &ct) {
                Received::Valid { pad, .. } => verified.push(pad),
                other => panic!("unexpected {:?}", other),
            }
        }

        let unrelated = {
            let (mut s2, _) = pair(1, 2);
            s2.encrypt_message("alpha", "unrelated", 0, &mut rng).unwrap()
        };
        assert_eq!(receiver.verify_message("alpha", &unrelated), Received::NotFound);

        assert_eq!(receiver.delete_verified_message_pads(verified).unwrap(), 3);
        assert_eq!(receiver.pads_remaining("alpha"), 2);
        let nums: Vec<u32> = receiver.rows("alpha").unwrap().iter().map(|r| r.pad_num).collect();
        assert_eq!(nums, vec![3, 4]);
        assert!(receiver.verify_integrity());
    }

    #[test]
    fn test_consume_twice_fails() {
        let (mut sender, mut receiver) = pair(1, 2);
        let ct = sender.encrypt_message("alpha", "hi", 0, &mut OsSource::new()).unwrap();
        let Received::Valid { pad: first, .. } = receiver.verify_message("alpha", &ct) else {
            panic!("should verify");
        };
        let Received::Valid { pad: second, .. } = receiver.verify_message("alpha", &ct) else {
            panic!("should verify");
        };
        receiver.consume(first).unwrap();
        assert_eq!(receiver.consume(second), Err(PadError::AlreadyConsumed));
    }

    #[test]
    fn test_exhaustion() {
        let mut store = store(1, 1);
        let mut rng = OsSource::new();
        store.encrypt_message("alpha", "last", 0, &mut rng).unwrap();
        assert_eq!(
            store.encrypt_message("alpha", "more", 0, &mut rng),
            Err(PadError::Exhausted)
        );
        assert_eq!(
            store.encrypt_message("bravo", "who", 0, &mut rng),
            Err(PadError::UnknownUser)
        );
    }

    #[test]
    fn test_tampered_index_blocks_sending() {
        let mut store = store(2, 4);
        store.index_macs.insert("alpha".into(), "00".repeat(64));
        assert_eq!(
            store.encrypt_message("alpha", "x", 0, &mut OsSource::new()),
            Err(PadError::IndexTampered)
        );
        assert!(!store.verify_integrity());
    }

    #[test]
    fn test_save_and_load() {
        let original = store(2, 4);
        let mut kv = MemoryStore::new();
        original.save(&mut kv).unwrap();

        let loaded = PadStore::load(&kv, test_keys()).unwrap();
        assert_eq!(loaded.rows("alpha"), original.rows("alpha"));
        assert_eq!(loaded.index_mac("bravo"), original.index_mac("bravo"));

        let mut wrong = test_keys();
        wrong.skein_mac_key[5] ^= 0x80;
        assert!(matches!(PadStore::load(&kv, wrong), Err(PadError::IndexTampered)));
    }

    #[test]
    fn test_load_rejects_tampered_store() {
        let original = store(2, 4);
        let mut kv = MemoryStore::new();
        original.save(&mut kv).unwrap();

        let bytes = kv.get(PAD_STORE_KEY).unwrap().unwrap();
        let mut persisted: PersistedPads = serde_json::from_slice(&bytes).unwrap();
        persisted.pads.get_mut("alpha").unwrap().pop();
        kv.set(PAD_STORE_KEY, &serde_json::to_vec(&persisted).unwrap()).unwrap();

        assert!(matches!(PadStore::load(&kv, test_keys()), Err(PadError::IndexTampered)));
        assert!(matches!(
            PadStore::load(&MemoryStore::new(), test_keys()),
            Err(PadError::Storage(StorageError::NotFound))
        ));
    }
}
