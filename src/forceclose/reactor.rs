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

//! Turning a [`ForceCloseClass`] into the set of claim transactions to
//! publish, plus the alternative-commit race that runs while a splice's
//! candidate commitments are all still unconfirmed.

use bitcoin::Txid;

use crate::forceclose::classify::ForceCloseError;
use crate::htlc::{Direction, Htlc};

/// A single reaction transaction queued for publication, tagged with the
/// checks that must still hold immediately before broadcast.
#[derive(Clone, Debug)]
pub struct PendingClaim {
    pub transaction: bitcoin::Transaction,
    pub spends: bitcoin::OutPoint,
    pub requires_preimage_for: Option<[u8; 32]>,
}

/// Confirmation-target the publisher should aim for, escalating as an
/// HTLC's CLTV expiry approaches per spec.md 4.5.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum ConfirmationTarget {
    Absolute(u32),
    Priority(Urgency),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum Urgency {
    Slow,
    Medium,
    Fast,
}

/// Picks a confirmation target for an HTLC-timeout/success claim given the
/// current chain tip and the HTLC's own CLTV expiry: the closer the
/// deadline, the more urgently it must confirm.
pub fn htlc_confirmation_target(current_height: u32, cltv_expiry: u32) -> ConfirmationTarget {
    let blocks_remaining = cltv_expiry.saturating_sub(current_height);
    if blocks_remaining == 0 {
        ConfirmationTarget::Absolute(current_height)
    } else if blocks_remaining <= 6 {
        ConfirmationTarget::Priority(Urgency::Fast)
    } else if blocks_remaining <= 36 {
        ConfirmationTarget::Priority(Urgency::Medium)
    } else {
        ConfirmationTarget::Priority(Urgency::Slow)
    }
}

/// Pre-publication checks shared by every reaction: the funding/commitment
/// parent this claim spends must not already be confirmed by a conflicting
/// transaction, the output it targets must not already be spent, and if it
/// is an HTLC-success claim the preimage must actually be known.
pub fn check_before_publish(
    claim: &PendingClaim,
    parent_already_confirmed_elsewhere: bool,
    output_already_spent: bool,
    known_preimages: &[[u8; 32]],
) -> Result<(), ForceCloseError> {
    if parent_already_confirmed_elsewhere {
        debug!("skipping publish of {}: parent already confirmed elsewhere", claim.spends);
        return Err(ForceCloseError::ParentAlreadyConfirmed);
    }
    if output_already_spent {
        debug!("skipping publish of {}: output already spent", claim.spends);
        return Err(ForceCloseError::OutputAlreadySpent);
    }
    if let Some(payment_hash) = claim.requires_preimage_for {
        if !known_preimages.contains(&payment_hash) {
            warn!("cannot publish htlc-success claim: preimage unknown");
            return Err(ForceCloseError::PreimageUnknown);
        }
    }
    Ok(())
}

/// One candidate commitment being raced during a splice: several
/// alternative commitments can be broadcastable at once (the pre-splice
/// and post-splice versions), and only the first to confirm wins.
#[derive(Clone, Debug)]
pub struct AlternativeCommitRace {
    pub candidates: Vec<Txid>,
    pub winner: Option<Txid>,
}

impl AlternativeCommitRace {
    pub fn new(candidates: Vec<Txid>) -> Self {
        AlternativeCommitRace { candidates, winner: None }
    }

    /// Called once any watched candidate confirms: records the winner and
    /// tells the caller which sibling watches to cancel.
    pub fn observe_confirmation(&mut self, confirmed: Txid) -> Vec<Txid> {
        if !self.candidates.contains(&confirmed) {
            return Vec::new();
        }
        self.winner = Some(confirmed);
        let losers: Vec<Txid> = self
            .candidates
            .iter()
            .copied()
            .filter(|txid| *txid != confirmed)
            .collect();
        info!(
            "alternative-commit race decided: {} confirmed, cancelling {} sibling(s)",
            confirmed,
            losers.len()
        );
        losers
    }

    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }
}

/// Reacting to our own latest commitment landing on-chain: walk every
/// non-dust HTLC and note whether it needs a second-stage HTLC-timeout or
/// HTLC-success transaction before the eventual to-local claim.
pub fn react_our_commitment(htlcs: &[Htlc], our_direction: &[Direction]) -> Vec<[u8; 32]> {
    htlcs
        .iter()
        .zip(our_direction.iter())
        .filter(|(_, direction)| direction.is_outgoing())
        .map(|(htlc, _)| htlc.payment_hash)
        .collect()
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;

    use super::*;

    #[test]
    fn confirmation_target_escalates_near_expiry() {
        assert_eq!(
            htlc_confirmation_target(990, 1000),
            ConfirmationTarget::Priority(Urgency::Fast)
        );
        assert_eq!(
            htlc_confirmation_target(950, 1000),
            ConfirmationTarget::Priority(Urgency::Medium)
        );
        assert_eq!(
            htlc_confirmation_target(100, 1000),
            ConfirmationTarget::Priority(Urgency::Slow)
        );
        assert_eq!(htlc_confirmation_target(1000, 1000), ConfirmationTarget::Absolute(1000));
    }

    #[test]
    fn race_cancels_losing_siblings_on_confirmation() {
        let a = Txid::all_zeros();
        let b = bitcoin::Txid::from_inner([7u8; 32]);
        let mut race = AlternativeCommitRace::new(vec![a, b]);
        let cancel = race.observe_confirmation(a);
        assert_eq!(cancel, vec![b]);
        assert!(race.is_decided());
    }

    #[test]
    fn preimage_check_blocks_htlc_success_claim_without_preimage() {
        let claim = PendingClaim {
            transaction: bitcoin::Transaction {
                version: 2,
                lock_time: bitcoin::PackedLockTime(0),
                input: vec![],
                output: vec![],
            },
            spends: bitcoin::OutPoint::new(Txid::all_zeros(), 0),
            requires_preimage_for: Some([9u8; 32]),
        };
        let result = check_before_publish(&claim, false, false, &[]);
        assert!(matches!(result, Err(ForceCloseError::PreimageUnknown)));
    }

    #[test]
    fn already_confirmed_parent_blocks_publish() {
        let claim = PendingClaim {
            transaction: bitcoin::Transaction {
                version: 2,
                lock_time: bitcoin::PackedLockTime(0),
                input: vec![],
                output: vec![],
            },
            spends: bitcoin::OutPoint::new(Txid::all_zeros(), 0),
            requires_preimage_for: None,
        };
        let result = check_before_publish(&claim, true, false, &[]);
        assert!(matches!(result, Err(ForceCloseError::ParentAlreadyConfirmed)));
    }
}
