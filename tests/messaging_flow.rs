//! Full path: camera TRNG → pad allocation → vault-protected pad store →
//! messaging over a relay → reload from storage.

use padcomms::cascade::kdf::KdfConfig;
use padcomms::cascade::strength::IterationCount;
use padcomms::core::TOTAL_PAD_SIZE;
use padcomms::entropy::camera::{Camera, RgbaFrame};
use padcomms::entropy::os::OsSource;
use padcomms::entropy::trng::{TrngConfig, TrngPipeline};
use padcomms::entropy::{EntropyError, EntropySource};
use padcomms::net::relay::{MemoryRelay, SharedRelay};
use padcomms::net::{NetworkClient, NetworkConfig};
use padcomms::pad::allocation::create_pads;
use padcomms::pad::lifecycle::PadStore;
use padcomms::pad::PadError;
use padcomms::storage::memory::MemoryStore;
use padcomms::storage::vault::{KeyVault, VaultError};
use padcomms::{Config, Messenger};

const PASSWORD: &[u8] = b"correct horse battery staple";
const GROUP_KEY: &[u8] = b"integration group key";

/// Sensor noise stand-in: every pixel channel uniformly random.
struct NoiseCamera(OsSource);

impl Camera for NoiseCamera {
    fn capture(&mut self) -> Result<RgbaFrame, EntropyError> {
        let mut pixels = vec![0u8; 160 * 120 * 4];
        self.0.fill(&mut pixels)?;
        Ok(RgbaFrame::new(160, 120, pixels))
    }
}

fn fast_kdf() -> KdfConfig {
    KdfConfig {
        keccak_iterations: IterationCount::new(16),
        skein_iterations: IterationCount::new(16),
        salt_size: 32,
    }
}

fn network_config() -> NetworkConfig {
    Config::from_json_str(
        r#"{"network": {"group_identifier": "0a0b0c0d0e0f1011", "min_padding_bits": 0, "max_padding_bits": 2048}}"#,
    )
    .unwrap()
    .network
}

/// Generates pads, seals them for three users and returns the shared store.
fn provision() -> MemoryStore {
    let mut trng = TrngPipeline::new(NoiseCamera(OsSource::new()), TrngConfig::default());
    let random = trng.generate(9 * TOTAL_PAD_SIZE).unwrap();
    let pads = create_pads(3, &random).unwrap();
    assert_eq!(pads["alpha"].len(), 3);

    let mut store = MemoryStore::new();
    let keys = KeyVault::create(&mut store, PASSWORD, &fast_kdf(), &mut OsSource::new()).unwrap();
    let pad_store = PadStore::import(pads, keys).unwrap();
    pad_store.save(&mut store).unwrap();
    store
}

fn open_member(store: &MemoryStore, relay: &SharedRelay, call_sign: &str) -> Messenger<SharedRelay> {
    let keys = KeyVault::unlock(store, PASSWORD).unwrap();
    let pads = PadStore::load(store, keys).unwrap();
    let client = NetworkClient::new(relay.clone(), network_config(), GROUP_KEY, call_sign).unwrap();
    Messenger::new(call_sign, pads, client).unwrap()
}

#[test]
fn test_group_conversation() {
    let shared = provision();
    let relay = MemoryRelay::new(GROUP_KEY, &network_config().group_identifier)
        .unwrap()
        .shared();
    let mut rng = OsSource::new();

    // Each member works from its own copy of the provisioned store.
    let mut alpha_store = shared.clone();
    let mut bravo_store = shared.clone();
    let mut charlie_store = shared;

    let mut alpha = open_member(&alpha_store, &relay, "alpha");
    let mut bravo = open_member(&bravo_store, &relay, "bravo");
    let mut charlie = open_member(&charlie_store, &relay, "charlie");

    alpha.send("Rendezvous at 0600", &mut alpha_store, &mut rng).unwrap();

    for (member, store) in [(&mut bravo, &mut bravo_store), (&mut charlie, &mut charlie_store)] {
        let report = member.receive(store, &mut rng).unwrap();
        assert_eq!(report.messages.len(), 1);
        assert_eq!(report.messages[0].from_user, "alpha");
        assert_eq!(report.messages[0].plaintext, "Rendezvous at 0600");
        assert_eq!(report.invalid, 0);
    }

    bravo.send("Copy", &mut bravo_store, &mut rng).unwrap();
    charlie.send("Copy, en route", &mut charlie_store, &mut rng).unwrap();

    let report = alpha.receive(&mut alpha_store, &mut rng).unwrap();
    let mut replies: Vec<(String, String)> = report
        .messages
        .into_iter()
        .map(|m| (m.from_user, m.plaintext))
        .collect();
    replies.sort();
    assert_eq!(
        replies,
        vec![
            ("bravo".to_string(), "Copy".to_string()),
            ("charlie".to_string(), "Copy, en route".to_string()),
        ]
    );

    // Every send and receive was persisted as it happened.
    let keys = KeyVault::unlock(&alpha_store, PASSWORD).unwrap();
    let reloaded = PadStore::load(&alpha_store, keys).unwrap();
    assert_eq!(reloaded.pads_remaining("alpha"), 2);
    assert_eq!(reloaded.pads_remaining("bravo"), 2);
    assert_eq!(reloaded.pads_remaining("charlie"), 2);
    assert!(reloaded.verify_integrity());
}

#[test]
fn test_wrong_password_and_tampered_store() {
    let mut store = provision();
    assert!(matches!(
        KeyVault::unlock(&store, b"wrong password"),
        Err(VaultError::WrongPassword)
    ));

    // Swap two of alpha's rows in the persisted JSON.
    use padcomms::storage::KeyValueStore;
    let bytes = store.get(padcomms::pad::lifecycle::PAD_STORE_KEY).unwrap().unwrap();
    let mut document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let rows = document["pads"]["alpha"].as_array_mut().unwrap();
    rows.swap(0, 1);
    store
        .set(padcomms::pad::lifecycle::PAD_STORE_KEY, &serde_json::to_vec(&document).unwrap())
        .unwrap();

    let keys = KeyVault::unlock(&store, PASSWORD).unwrap();
    assert!(matches!(PadStore::load(&store, keys), Err(PadError::IndexTampered)));
}

#[test]
fn test_pads_run_out() {
    let mut store = provision();
    let relay = MemoryRelay::new(GROUP_KEY, &network_config().group_identifier)
        .unwrap()
        .shared();
    let mut rng = OsSource::new();
    let mut bravo = open_member(&store, &relay, "bravo");

    for i in 0..3 {
        bravo.send(&format!("message {}", i), &mut store, &mut rng).unwrap();
    }
    assert_eq!(bravo.pads_remaining(), 0);
    assert!(bravo.send("no pad left", &mut store, &mut rng).is_err());
    assert_eq!(relay.with(|r| r.stored_packets()).unwrap(), 3);

    // A restart from disk has nothing left to reuse.
    let reopened = open_member(&store, &relay, "bravo");
    assert_eq!(reopened.pads_remaining(), 0);
}
