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

//! `tx_init_rbf`: replacing the latest unconfirmed funding attempt with a
//! higher-feerate one at the same `fundingTxIndex`.

use crate::funding::InteractiveTxError;

/// One funding attempt's on-chain status, used to decide whether a new
/// `tx_init_rbf` against it is even legal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum AttemptStatus {
    Unconfirmed,
    ZeroconfPublished,
    Confirmed,
}

/// Validates a proposed RBF attempt against the attempt it replaces, per
/// spec.md 4.4's error taxonomy.
pub fn validate_rbf_attempt(
    previous_status: AttemptStatus,
    previous_feerate_per_kw: u32,
    proposed_feerate_per_kw: u32,
    is_zeroconf_channel: bool,
    had_liquidity_purchase: bool,
    needs_liquidity_purchase: bool,
) -> Result<(), InteractiveTxError> {
    match previous_status {
        AttemptStatus::Confirmed => return Err(InteractiveTxError::RbfOfConfirmedTx),
        AttemptStatus::ZeroconfPublished if is_zeroconf_channel => {
            return Err(InteractiveTxError::RbfOfZeroconfTx)
        }
        AttemptStatus::ZeroconfPublished => {
            return Err(InteractiveTxError::PreviousFundingUnconfirmed)
        }
        AttemptStatus::Unconfirmed => {}
    }
    if proposed_feerate_per_kw <= previous_feerate_per_kw {
        return Err(InteractiveTxError::FeerateBelowMinimum {
            proposed: proposed_feerate_per_kw,
            minimum: previous_feerate_per_kw + 1,
        });
    }
    if needs_liquidity_purchase && !had_liquidity_purchase {
        return Err(InteractiveTxError::MissingLiquidityPurchaseOnRbf);
    }
    Ok(())
}

/// One `fundingTxIndex`'s set of pairwise-double-spending RBF attempts. All
/// but the first-to-confirm are pruned once confirmation is observed (see
/// DESIGN.md's note on the corresponding open question).
#[derive(Clone, Debug, Default)]
pub struct RbfAttempts {
    pub feerates_per_kw: Vec<u32>,
}

impl RbfAttempts {
    pub fn push(&mut self, feerate_per_kw: u32) {
        self.feerates_per_kw.push(feerate_per_kw);
    }

    /// Drops every attempt except the confirmed one.
    pub fn prune_to(&mut self, confirmed_feerate_per_kw: u32) {
        info!(
            "rbf attempt at {} sat/kw confirmed, pruning {} losing attempt(s)",
            confirmed_feerate_per_kw,
            self.feerates_per_kw.len().saturating_sub(1)
        );
        self.feerates_per_kw = vec![confirmed_feerate_per_kw];
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rbf_must_increase_feerate() {
        let result = validate_rbf_attempt(
            AttemptStatus::Unconfirmed,
            1000,
            1000,
            false,
            false,
            false,
        );
        assert!(matches!(
            result,
            Err(InteractiveTxError::FeerateBelowMinimum { .. })
        ));
    }

    #[test]
    fn rbf_of_confirmed_tx_is_rejected() {
        let result = validate_rbf_attempt(
            AttemptStatus::Confirmed,
            1000,
            2000,
            false,
            false,
            false,
        );
        assert!(matches!(result, Err(InteractiveTxError::RbfOfConfirmedTx)));
    }

    #[test]
    fn three_escalating_attempts_are_all_valid() {
        validate_rbf_attempt(AttemptStatus::Unconfirmed, 1000, 1500, false, false, false)
            .unwrap();
        validate_rbf_attempt(AttemptStatus::Unconfirmed, 1500, 2000, false, false, false)
            .unwrap();
    }

    #[test]
    fn pruning_keeps_only_the_confirmed_attempt() {
        let mut attempts = RbfAttempts::default();
        attempts.push(1000);
        attempts.push(1500);
        attempts.push(2000);
        attempts.prune_to(1500);
        assert_eq!(attempts.feerates_per_kw, vec![1500]);
    }
}
