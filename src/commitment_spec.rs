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

//! The unsigned content of one commitment: balances, feerate and the set
//! of in-flight HTLCs, plus the dust-trimming arithmetic the transaction
//! builder and the commitment set both need.

use crate::htlc::{Direction, DirectedHtlc};
use crate::params::CommitmentFormat;

/// BOLT-3 weights (in weight units) of a non-anchor / anchor HTLC output
/// added to a commitment transaction, used to compute each HTLC's
/// proportional share of the commitment fee.
const HTLC_OUTPUT_WEIGHT: u64 = 172;
/// Weight of a non-HTLC commitment output (p2wsh `to_local`, p2wpkh or
/// p2wsh `to_remote`) — used only to size the weight-proportional fee
/// already baked into the feerate, not to trim it.
const HTLC_TIMEOUT_WEIGHT: u64 = 663;
const HTLC_SUCCESS_WEIGHT: u64 = 703;

/// The triple BOLT-3 calls a "commitment": the set of directed HTLCs, the
/// feerate that fixes their weight cost, and the two base balances.
///
/// Invariant: `to_local_msat + to_remote_msat + sum(htlc.amount_msat)`
/// equals the channel capacity in millisatoshi for every valid spec — this
/// type does not enforce it itself (the commitment set does, since it is
/// the only place that knows the channel capacity), but every mutation
/// method here preserves it as long as it held on entry.
#[derive(Clone, PartialEq, Debug)]
pub struct CommitmentSpec {
    pub htlcs: Vec<DirectedHtlc>,
    pub feerate_per_kw: u32,
    pub to_local_msat: u64,
    pub to_remote_msat: u64,
}

impl CommitmentSpec {
    pub fn new(
        feerate_per_kw: u32,
        to_local_msat: u64,
        to_remote_msat: u64,
    ) -> Self {
        CommitmentSpec {
            htlcs: Vec::new(),
            feerate_per_kw,
            to_local_msat,
            to_remote_msat,
        }
    }

    pub fn capacity_msat(&self) -> u64 {
        self.to_local_msat
            + self.to_remote_msat
            + self.htlcs.iter().map(|h| h.amount_msat()).sum::<u64>()
    }

    pub fn total_htlc_amount_msat(&self, direction: Direction) -> u64 {
        self.htlcs
            .iter()
            .filter(|h| h.direction == direction)
            .map(|h| h.amount_msat())
            .sum()
    }

    /// Count of HTLCs that survive dust trimming, needed before a
    /// `commit_sig`'s `htlc_signatures` vector can be sized.
    pub fn non_dust_htlc_count(
        &self,
        dust_limit_sat: u64,
        format: CommitmentFormat,
    ) -> usize {
        self.htlcs
            .iter()
            .filter(|h| {
                !self.is_htlc_trimmed(h.htlc.id, dust_limit_sat, format)
            })
            .count()
    }

    /// BOLT-3's dust-trimming rule: an HTLC output is trimmed if its value
    /// after subtracting the weight cost of adding its second-stage claim
    /// transaction at `feerate_per_kw` would be strictly below
    /// `dust_limit_sat`. An output at exactly the dust limit survives.
    pub fn is_htlc_trimmed(
        &self,
        id: crate::htlc::HtlcId,
        dust_limit_sat: u64,
        format: CommitmentFormat,
    ) -> bool {
        let Some(h) = self.htlcs.iter().find(|h| h.htlc.id == id) else {
            return true;
        };
        let amount_sat = h.amount_msat() / 1000;
        let weight = match h.direction {
            Direction::Outgoing => HTLC_TIMEOUT_WEIGHT,
            Direction::Incoming => HTLC_SUCCESS_WEIGHT,
        };
        let htlc_tx_fee = if format.zero_fee_htlc_tx() {
            0
        } else {
            weight_fee(weight, self.feerate_per_kw)
        };
        amount_sat < dust_limit_sat + htlc_tx_fee
    }

    /// Weight-proportional fee this HTLC output itself contributes to the
    /// commitment transaction's total fee (not its second-stage claim).
    pub fn htlc_commitment_weight_fee(&self) -> u64 {
        weight_fee(HTLC_OUTPUT_WEIGHT, self.feerate_per_kw)
    }
}

/// `ceil(weight * feerate_per_kw / 1000)`, BOLT-3's standard
/// weight-to-satoshi conversion.
pub fn weight_fee(weight: u64, feerate_per_kw: u32) -> u64 {
    (weight * feerate_per_kw as u64 + 999) / 1000
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::htlc::{Htlc, HtlcId};

    fn htlc(id: u64, amount_msat: u64, direction: Direction) -> DirectedHtlc {
        DirectedHtlc::new(
            Htlc {
                id: HtlcId::from(id),
                amount_msat,
                payment_hash: [0u8; 32],
                cltv_expiry: 500_000,
                onion_routing_packet: vec![],
                blinding_point: None,
            },
            direction,
        )
    }

    #[test]
    fn capacity_sums_balances_and_htlcs() {
        let mut spec = CommitmentSpec::new(5000, 400_000_000, 300_000_000);
        spec.htlcs.push(htlc(0, 5_000_000, Direction::Outgoing));
        spec.htlcs.push(htlc(1, 1_000_000, Direction::Incoming));
        assert_eq!(spec.capacity_msat(), 706_000_000);
    }

    #[test]
    fn dust_at_exact_limit_survives() {
        let spec = CommitmentSpec::new(0, 0, 0);
        // zero feerate -> htlc_tx_fee is zero, so amount == dust_limit
        // survives exactly.
        let mut spec = spec;
        spec.htlcs.push(htlc(0, 546_000, Direction::Outgoing));
        assert!(!spec.is_htlc_trimmed(
            HtlcId::from(0),
            546,
            CommitmentFormat::DefaultSegwit
        ));
    }
}
