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

//! Splice-specific validation and balance arithmetic layered on top of the
//! generic [`crate::funding::session::InteractiveTxSession`].

use bitcoin::OutPoint;

use crate::funding::session::InteractiveTxSession;
use crate::funding::InteractiveTxError;

/// A splice must contribute exactly one shared input (the previous funding
/// outpoint) and exactly one shared output (the new funding output); this
/// identifies which of a session's inputs/outputs are the shared ones so
/// the rest can be attributed as each party's splice-in/splice-out.
pub fn find_shared_funding(
    session: &InteractiveTxSession,
    previous_funding_outpoint: OutPoint,
    new_funding_script: &bitcoin::Script,
) -> Result<(usize, usize), InteractiveTxError> {
    let shared_inputs: Vec<_> = session
        .inputs
        .iter()
        .filter(|(_, outpoint, _)| *outpoint == previous_funding_outpoint)
        .collect();
    let shared_outputs: Vec<_> = session
        .outputs
        .iter()
        .filter(|(_, txout)| &txout.script_pubkey == new_funding_script)
        .collect();
    if shared_inputs.len() != 1 || shared_outputs.len() != 1 {
        return Err(InteractiveTxError::SpliceSharedCountMismatch {
            shared_inputs: shared_inputs.len(),
            shared_outputs: shared_outputs.len(),
        });
    }
    Ok((shared_inputs.len(), shared_outputs.len()))
}

/// Computes a single party's post-splice balance delta: its own
/// contributed inputs minus its own contributed outputs minus its share of
/// the mining fee, per spec.md 4.4. `fee_share_sat` is whatever fee
/// split policy the caller has already agreed (e.g. proportional to
/// contributed weight); this function only does the arithmetic.
pub fn balance_delta_sat(
    contributed_input_sat: u64,
    contributed_output_sat: u64,
    fee_share_sat: u64,
) -> i64 {
    contributed_input_sat as i64
        - contributed_output_sat as i64
        - fee_share_sat as i64
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;
    use bitcoin::TxOut;

    use super::*;

    fn funding_outpoint() -> OutPoint {
        OutPoint::new(bitcoin::Txid::all_zeros(), 0)
    }

    #[test]
    fn exactly_one_shared_input_and_output_is_accepted() {
        let mut session = InteractiveTxSession::new(true, 1000);
        let script = bitcoin::Script::new_op_return(&[1]);
        session.inputs.push((0, funding_outpoint(), 0));
        session
            .outputs
            .push((0, TxOut { value: 2_000_000, script_pubkey: script.clone() }));
        assert!(find_shared_funding(&session, funding_outpoint(), &script).is_ok());
    }

    #[test]
    fn missing_shared_output_is_rejected() {
        let session = InteractiveTxSession::new(true, 1000);
        let script = bitcoin::Script::new_op_return(&[1]);
        let result = find_shared_funding(&session, funding_outpoint(), &script);
        assert!(matches!(
            result,
            Err(InteractiveTxError::SpliceSharedCountMismatch { .. })
        ));
    }

    #[test]
    fn balance_delta_subtracts_outputs_and_fee_share() {
        assert_eq!(balance_delta_sat(500_000, 0, 500), 499_500);
    }
}
