//! Splitting raw random data into per-user pads.

use std::collections::BTreeMap;

use zeroize::Zeroizing;

use super::{CallSign, OneTimePad, PadError, CALL_SIGNS};
use crate::core::{PAD_IDENTIFIER_SIZE, TOTAL_PAD_SIZE};

/// Divides `random_data` into whole pads and deals them out in call-sign order.
///
/// Every user gets `total / num_users` pads; the last user also gets the
/// remainder, so with fewer pads than users only the last user holds any.
/// Trailing bytes that do not fill a pad are ignored.
pub fn create_pads(
    num_users: usize,
    random_data: &[u8],
) -> Result<BTreeMap<CallSign, Vec<OneTimePad>>, PadError> {
    if num_users == 0 {
        return Err(PadError::NoUsers);
    }
    if num_users > CALL_SIGNS.len() {
        return Err(PadError::TooManyUsers(num_users));
    }

    let total_pads = random_data.len() / TOTAL_PAD_SIZE;
    if total_pads == 0 {
        return Err(PadError::NotEnoughPads {
            pads: total_pads,
            users: num_users,
        });
    }

    let base = total_pads / num_users;
    let mut chunks = random_data.chunks_exact(TOTAL_PAD_SIZE);
    let mut pads = BTreeMap::new();

    for (user, call_sign) in CALL_SIGNS.iter().take(num_users).enumerate() {
        let count = if user == num_users - 1 {
            total_pads - base * (num_users - 1)
        } else {
            base
        };

        let user_pads: Vec<OneTimePad> = chunks
            .by_ref()
            .take(count)
            .zip(0u32..)
            .map(|(chunk, pad_num)| {
                let mut pad_identifier = [0u8; PAD_IDENTIFIER_SIZE];
                pad_identifier.copy_from_slice(&chunk[..PAD_IDENTIFIER_SIZE]);
                OneTimePad {
                    pad_num,
                    pad_identifier,
                    pad: Zeroizing::new(chunk.to_vec()),
                }
            })
            .collect();

        pads.insert((*call_sign).to_owned(), user_pads);
    }

    log::info!(
        "Allocated {} pads between {} users ({} each, {} for {})",
        total_pads,
        num_users,
        base,
        total_pads - base * (num_users - 1),
        CALL_SIGNS[num_users - 1]
    );
    Ok(pads)
}
