//! Per-user index MACs.
//!
//! Row MACs protect each sealed pad on its own; the index MAC protects the
//! ordered list of `(pad_num, pad_identifier)` pairs a user holds, bound to the
//! user's call sign. Dropping, reordering, duplicating or moving rows between
//! users all break it.

use std::collections::BTreeMap;

use super::{CallSign, PadRow};
use crate::cascade::mac::{cascade_mac_parts, cascade_verify_mac_parts};
use crate::cascade::{length_prefix, CascadeError, DerivedKeySet};

/// `u32_be(len) ‖ call_sign ‖ (u32_be(pad_num) ‖ pad_identifier)*`
fn index_bytes(call_sign: &str, rows: &[PadRow]) -> Result<Vec<u8>, CascadeError> {
    let mut data = Vec::with_capacity(4 + call_sign.len() + rows.len() * 18);
    data.extend_from_slice(&length_prefix(call_sign.as_bytes())?);
    data.extend_from_slice(call_sign.as_bytes());
    for row in rows {
        data.extend_from_slice(&row.pad_num.to_be_bytes());
        data.extend_from_slice(row.pad_identifier.as_bytes());
    }
    Ok(data)
}

/// MAC (hex) over one user's ordered pad index.
pub fn create_mac_of_database_index(
    keys: &DerivedKeySet,
    call_sign: &str,
    rows: &[PadRow],
) -> Result<String, CascadeError> {
    let data = index_bytes(call_sign, rows)?;
    let mac = cascade_mac_parts(&keys.keccak_mac_key, &keys.skein_mac_key, &[data.as_slice()])?;
    Ok(hex::encode(mac))
}

pub fn verify_database_index(
    keys: &DerivedKeySet,
    call_sign: &str,
    rows: &[PadRow],
    mac_hex: &str,
) -> bool {
    let Ok(mac) = hex::decode(mac_hex) else {
        return false;
    };
    let Ok(data) = index_bytes(call_sign, rows) else {
        return false;
    };
    cascade_verify_mac_parts(&keys.keccak_mac_key, &keys.skein_mac_key, &[data.as_slice()], &mac)
}

pub fn create_mac_of_all_database_indexes(
    keys: &DerivedKeySet,
    pads: &BTreeMap<CallSign, Vec<PadRow>>,
) -> Result<BTreeMap<CallSign, String>, CascadeError> {
    pads.iter()
        .map(|(call_sign, rows)| {
            create_mac_of_database_index(keys, call_sign, rows).map(|mac| (call_sign.clone(), mac))
        })
        .collect()
}

/// `false` for an empty pad map, an empty MAC map, differing user sets, or any
/// failing user.
pub fn verify_all_user_database_indexes(
    keys: &DerivedKeySet,
    pads: &BTreeMap<CallSign, Vec<PadRow>>,
    macs: &BTreeMap<CallSign, String>,
) -> bool {
    if pads.is_empty() || macs.is_empty() || !pads.keys().eq(macs.keys()) {
        log::warn!("Pad index user sets do not match");
        return false;
    }

    let mut all_valid = true;
    for (call_sign, rows) in pads {
        let valid = macs
            .get(call_sign)
            .is_some_and(|mac| verify_database_index(keys, call_sign, rows, mac));
        if !valid {
            log::warn!("Pad index for {} failed verification", call_sign);
            all_valid = false;
        }
    }
    all_valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::sealed::tests::test_keys;

    fn row(pad_num: u32, id: &str) -> PadRow {
        PadRow {
            pad_num,
            pad_identifier: id.to_string(),
            pad: "00".repeat(201),
            mac: "00".repeat(64),
        }
    }

    fn sample() -> BTreeMap<CallSign, Vec<PadRow>> {
        let mut pads = BTreeMap::new();
        pads.insert(
            "alpha".to_string(),
            vec![row(0, "aaaaaaaaaaaaa0"), row(1, "aaaaaaaaaaaaa1"), row(2, "aaaaaaaaaaaaa2")],
        );
        pads.insert(
            "bravo".to_string(),
            vec![row(0, "bbbbbbbbbbbbb0"), row(1, "bbbbbbbbbbbbb1")],
        );
        pads
    }

    #[test]
    fn test_valid_indexes_verify() {
        let keys = test_keys();
        let pads = sample();
        let macs = create_mac_of_all_database_indexes(&keys, &pads).unwrap();
        assert_eq!(macs.len(), 2);
        assert!(macs.values().all(|m| m.len() == 128));
        assert!(verify_all_user_database_indexes(&keys, &pads, &macs));
    }

    #[test]
    fn test_known_answer() {
        let mac = create_mac_of_database_index(&test_keys(), "alpha", &sample()["alpha"]).unwrap();
        assert_eq!(
            mac,
            concat!(
                "584388fe579dfe0a4fab8788bce9b83814656937b24a1e2d19e281bf62db6bcd",
                "7eb3b7a335331c77dde165084d6868a1b9e8f77d571214933c53c6e37dc69ebd"
            )
        );
    }

    #[test]
    fn test_empty_maps_fail() {
        let keys = test_keys();
        let pads = sample();
        let macs = create_mac_of_all_database_indexes(&keys, &pads).unwrap();
        assert!(!verify_all_user_database_indexes(&keys, &BTreeMap::new(), &macs));
        assert!(!verify_all_user_database_indexes(&keys, &pads, &BTreeMap::new()));
    }

    #[test]
    fn test_mismatched_users_fail() {
        let keys = test_keys();
        let pads = sample();
        let mut macs = create_mac_of_all_database_indexes(&keys, &pads).unwrap();
        macs.remove("bravo");
        assert!(!verify_all_user_database_indexes(&keys, &pads, &macs));

        let mut macs = create_mac_of_all_database_indexes(&keys, &pads).unwrap();
        macs.insert("charlie".to_string(), "00".repeat(64));
        assert!(!verify_all_user_database_indexes(&keys, &pads, &macs));
    }

    #[test]
    fn test_wrong_key_fails() {
        let pads = sample();
        let macs = create_mac_of_all_database_indexes(&test_keys(), &pads).unwrap();
        let mut other = test_keys();
        other.keccak_mac_key[0] ^= 1;
        assert!(!verify_all_user_database_indexes(&other, &pads, &macs));
    }

    #[test]
    fn test_altered_mac_fails() {
        let keys = test_keys();
        let pads = sample();
        let mut macs = create_mac_of_all_database_indexes(&keys, &pads).unwrap();
        let mac = macs.get_mut("alpha").unwrap();
        let flipped = if mac.starts_with('f') { "e" } else { "f" };
        mac.replace_range(0..1, flipped);
        assert!(!verify_all_user_database_indexes(&keys, &pads, &macs));

        let mut macs = create_mac_of_all_database_indexes(&keys, &pads).unwrap();
        macs.insert("alpha".to_string(), "not hex".to_string());
        assert!(!verify_all_user_database_indexes(&keys, &pads, &macs));
    }

    #[test]
    fn test_row_changes_fail() {
        let keys = test_keys();
        let original = sample();
        let macs = create_mac_of_all_database_indexes(&keys, &original).unwrap();

        let mut reordered = original.clone();
        reordered.get_mut("alpha").unwrap().swap(0, 2);
        assert!(!verify_all_user_database_indexes(&keys, &reordered, &macs));

        let mut removed = original.clone();
        removed.get_mut("alpha").unwrap().remove(1);
        assert!(!verify_all_user_database_indexes(&keys, &removed, &macs));

        let mut appended = original.clone();
        appended.get_mut("bravo").unwrap().push(row(2, "bbbbbbbbbbbbb2"));
        assert!(!verify_all_user_database_indexes(&keys, &appended, &macs));

        let mut renumbered = original.clone();
        renumbered.get_mut("bravo").unwrap()[1].pad_num = 5;
        assert!(!verify_all_user_database_indexes(&keys, &renumbered, &macs));
    }

    #[test]
    fn test_long_call_sign_length_is_not_truncated() {
        let keys = test_keys();
        let long = "x".repeat(256);
        let rows = vec![row(0, "aaaaaaaaaaaaa0")];

        let data = index_bytes(&long, &rows).unwrap();
        assert_eq!(&data[..4], &256u32.to_be_bytes());
        assert_eq!(data.len(), 4 + 256 + 4 + 14);

        let mac = create_mac_of_database_index(&keys, &long, &rows).unwrap();
        assert!(verify_database_index(&keys, &long, &rows, &mac));
        // With a one-byte length, 256 wraps to 0 and an empty call sign whose
        // single row spells out the long name produces the same bytes.
        let mut forged_id = "x".repeat(252);
        forged_id.push_str("\0\0\0\0aaaaaaaaaaaaa0");
        let forged = vec![PadRow {
            pad_num: u32::from_be_bytes(*b"xxxx"),
            pad_identifier: forged_id,
            ..row(0, "")
        }];
        assert!(!verify_database_index(&keys, "", &forged, &mac));
        assert!(!verify_database_index(&keys, &"x".repeat(255), &rows, &mac));
    }

    #[test]
    fn test_swapped_between_users_fails() {
        let keys = test_keys();
        let original = sample();
        let macs = create_mac_of_all_database_indexes(&keys, &original).unwrap();

        let mut swapped = original.clone();
        let a = swapped.get_mut("alpha").unwrap()[0].clone();
        let b = swapped.get_mut("bravo").unwrap()[0].clone();
        swapped.get_mut("alpha").unwrap()[0] = b;
        swapped.get_mut("bravo").unwrap()[0] = a;
        assert!(!verify_all_user_database_indexes(&keys, &swapped, &macs));

        // Whole lists under each other's names.
        let mut renamed = BTreeMap::new();
        renamed.insert("alpha".to_string(), original["bravo"].clone());
        renamed.insert("bravo".to_string(), original["alpha"].clone());
        let mut swapped_macs = BTreeMap::new();
        swapped_macs.insert("alpha".to_string(), macs["bravo"].clone());
        swapped_macs.insert("bravo".to_string(), macs["alpha"].clone());
        assert!(!verify_all_user_database_indexes(&keys, &renamed, &swapped_macs));
    }
}
