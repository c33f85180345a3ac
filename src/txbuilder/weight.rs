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

//! Pre-computed BOLT-3 weight constants, used to cross-check the builders
//! in this module against the values the fee calculation in
//! [`crate::commitment_spec`] assumes.

/// Weight of a commitment transaction carrying no HTLC outputs, before
/// either party's anchors are added.
pub const COMMITMENT_BASE_WEIGHT: u64 = 724;

/// Additional weight contributed by each anchor output plus its dedicated
/// input-side cost once spent, already folded into commitment sizing via
/// `CommitmentFormat::anchor_sat`.
pub const ANCHOR_OUTPUT_WEIGHT: u64 = 43;

/// Weight added to the commitment transaction by each non-dust HTLC output.
pub const HTLC_OUTPUT_WEIGHT: u64 = 172;

/// Weight of a non-anchor HTLC-timeout / HTLC-success transaction.
pub const HTLC_TIMEOUT_WEIGHT: u64 = 663;
pub const HTLC_SUCCESS_WEIGHT: u64 = 703;

/// Weight of the anchor-format variants, which carry one extra
/// `OP_CHECKSEQUENCEVERIFY` byte in their witness script.
pub const HTLC_TIMEOUT_WEIGHT_ANCHORS: u64 = 666;
pub const HTLC_SUCCESS_WEIGHT_ANCHORS: u64 = 706;

/// Total weight of a commitment transaction with `htlc_count` non-dust HTLC
/// outputs under `format`.
pub fn commitment_weight(htlc_count: usize, has_anchors: bool) -> u64 {
    let anchors = if has_anchors {
        2 * ANCHOR_OUTPUT_WEIGHT
    } else {
        0
    };
    COMMITMENT_BASE_WEIGHT + anchors + htlc_count as u64 * HTLC_OUTPUT_WEIGHT
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn commitment_weight_scales_with_htlc_count() {
        assert_eq!(commitment_weight(0, false), COMMITMENT_BASE_WEIGHT);
        assert_eq!(
            commitment_weight(4, false),
            COMMITMENT_BASE_WEIGHT + 4 * HTLC_OUTPUT_WEIGHT
        );
    }

    #[test]
    fn anchor_outputs_add_fixed_weight() {
        assert_eq!(
            commitment_weight(0, true),
            COMMITMENT_BASE_WEIGHT + 2 * ANCHOR_OUTPUT_WEIGHT
        );
    }
}
