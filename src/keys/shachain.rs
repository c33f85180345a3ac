// Commitment-and-HTLC engine for a Lightning-style payment channel node
// Written in 2020-2026 by
//     Dr. Maxim Orlovsky <orlovsky@pandoracore.com>
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the MIT License
// along with this software.
// If not, see <https://opensource.org/licenses/MIT>.

//! BOLT-3 per-commitment secret storage ("`shachain`"): the counterparty's
//! revealed per-commitment secrets form a hash tree keyed by commitment
//! index, so that all of them can be stored in at most 49 slots while still
//! letting any previously-seen index be re-derived on demand.

use amplify::hex::ToHex;
use bitcoin::hashes::{sha256, Hash};

/// Commitment indexes run `0..=2^48-1`; `2^48` itself is used internally as
/// "no secret seen yet".
const NO_SECRET: u64 = 1 << 48;

/// A stored secret together with the commitment index it was revealed for.
type Bucket = ([u8; 32], u64);

/// Compact storage for a counterparty's revealed per-commitment secrets.
///
/// Holds at most 49 32-byte secrets regardless of how many commitments have
/// been revoked, yet can still answer [`ShaChain::secret_for_index`] for any
/// previously-provided index in O(1) by re-hashing from the nearest stored
/// ancestor.
///
/// `index` here is BOLT-3's per-commitment secret index `I`, not the raw
/// commitment number `N`: `I = 2^48 - 1 - N`. As the channel advances and
/// `N` counts up from zero, `I` counts down from `2^48 - 1`, which is what
/// lets this structure prune ancestors instead of growing without bound.
#[derive(Clone, Debug)]
pub struct ShaChain {
    buckets: [Bucket; 49],
}

impl Default for ShaChain {
    fn default() -> Self {
        ShaChain {
            buckets: [([0u8; 32], NO_SECRET); 49],
        }
    }
}

/// A secret provided via [`ShaChain::insert_secret`] does not hash forward
/// to a secret already on file for one of its descendant indexes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(
    "per-commitment secret for index {index} does not derive the previously \
     stored secret for index {old_index}"
)]
pub struct ShaChainError {
    pub index: u64,
    pub old_index: u64,
}

impl ShaChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the storage bucket a secret for `index` would occupy: the
    /// position (counted from the top) of the lowest set bit, or `48` if
    /// `index` is zero.
    fn bucket_for_index(index: u64) -> u8 {
        for i in 0..48 {
            if index & (1 << i) != 0 {
                return (47 - i) as u8;
            }
        }
        48
    }

    /// Re-derives the secret for `index` from `seed`, which must be the
    /// secret stored `bits` levels above it in the tree (i.e. whose lower
    /// `bits` index bits are all zero).
    fn derive(seed: [u8; 32], bits: u8, index: u64) -> [u8; 32] {
        let mut result = seed;
        for i in 0..bits {
            let bitpos = bits - 1 - i;
            if index & (1 << bitpos) != 0 {
                result[(bitpos / 8) as usize] ^= 1 << (bitpos % 8);
                result = sha256::Hash::hash(&result).into_inner();
            }
        }
        result
    }

    /// The lowest commitment index for which a secret has been provided so
    /// far, or `2^48` if the chain is still empty.
    pub fn min_index_seen(&self) -> u64 {
        self.buckets
            .iter()
            .map(|&(_, index)| index)
            .min()
            .unwrap_or(NO_SECRET)
    }

    /// Records the per-commitment secret revealed for `index` (normally via
    /// `revoke_and_ack`). Rejects the secret if it fails to hash forward to
    /// any descendant secret already on file, which would indicate either
    /// party is misbehaving or a message was lost. A secret for an `index`
    /// at or above [`ShaChain::min_index_seen`] is a harmless replay and is
    /// silently accepted without being stored again.
    pub fn insert_secret(
        &mut self,
        index: u64,
        secret: [u8; 32],
    ) -> Result<(), ShaChainError> {
        let bucket = Self::bucket_for_index(index);
        for i in 0..bucket {
            let (old_secret, old_index) = self.buckets[i as usize];
            if old_index == NO_SECRET {
                continue;
            }
            if Self::derive(secret, bucket, old_index) != old_secret {
                return Err(ShaChainError { index, old_index });
            }
        }
        if self.min_index_seen() <= index {
            return Ok(());
        }
        self.buckets[bucket as usize] = (secret, index);
        Ok(())
    }

    /// Looks up (re-deriving if necessary) the secret for a previously
    /// inserted `index`. Returns `None` if `index` has never been covered
    /// by any secret provided so far.
    pub fn secret_for_index(&self, index: u64) -> Option<[u8; 32]> {
        for (i, &(secret, old_index)) in self.buckets.iter().enumerate() {
            if old_index == NO_SECRET {
                continue;
            }
            let mask = (1u64 << i) - 1;
            if old_index | mask == index | mask {
                return Some(Self::derive(secret, i as u8, index));
            }
        }
        None
    }

    /// `true` once a secret covering `index` has been stored, directly or
    /// derivable.
    pub fn has_secret(&self, index: u64) -> bool {
        self.secret_for_index(index).is_some()
    }
}

impl std::fmt::Display for ShaChain {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ShaChain(min_index_seen={}, latest={})",
            self.min_index_seen(),
            self.buckets
                .iter()
                .filter(|&&(_, i)| i != NO_SECRET)
                .map(|&(s, _)| s.to_hex())
                .next()
                .unwrap_or_else(|| "none".to_string())
        )
    }
}
