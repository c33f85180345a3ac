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

//! The interactive transaction construction protocol shared by dual-funded
//! opening, splicing and RBF: both parties contribute inputs and outputs
//! one message at a time until both send `tx_complete` back to back.

use bitcoin::{OutPoint, TxOut};

/// One contribution to an in-progress interactive-tx round. `serial_id`'s
/// parity identifies the contributor: even for the session initiator, odd
/// for the acceptor.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Contribution {
    AddInput { serial_id: u64, outpoint: OutPoint, sequence: u32 },
    AddOutput { serial_id: u64, txout: TxOut },
    RemoveInput { serial_id: u64 },
    RemoveOutput { serial_id: u64 },
}

impl Contribution {
    pub fn serial_id(&self) -> u64 {
        match self {
            Contribution::AddInput { serial_id, .. }
            | Contribution::AddOutput { serial_id, .. }
            | Contribution::RemoveInput { serial_id }
            | Contribution::RemoveOutput { serial_id } => *serial_id,
        }
    }

    fn is_initiator(&self, initiator_is_even: bool) -> bool {
        (self.serial_id() % 2 == 0) == initiator_is_even
    }
}

/// Which phase of the round the session is in.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum SessionPhase {
    Contributing,
    AwaitingCounterpartyComplete,
    Signing,
    Complete,
    Aborted,
}

/// Failures from the interactive funding session, per spec.md 4.4.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum InteractiveTxError {
    /// contributed feerate {proposed} sat/kw is below the minimum of
    /// {minimum} sat/kw
    FeerateBelowMinimum { proposed: u32, minimum: u32 },

    /// this contribution would violate the channel reserve requirement
    ReserveViolation,

    /// contributed output of {0} sat falls below the dust limit
    BelowDustContribution(u64),

    /// a liquidity purchase is required on every rbf attempt after the
    /// first but was not supplied
    MissingLiquidityPurchaseOnRbf,

    /// the previous funding transaction has not confirmed and this channel
    /// does not use zero-conf
    PreviousFundingUnconfirmed,

    /// cannot rbf a transaction that has already confirmed
    RbfOfConfirmedTx,

    /// cannot rbf a zero-conf transaction
    RbfOfZeroconfTx,

    /// serial id {0} was contributed by the wrong party for its parity
    WrongContributorParity(u64),

    /// a splice transaction must contain exactly one shared input and one
    /// shared output; found {shared_inputs} inputs and {shared_outputs}
    /// outputs
    SpliceSharedCountMismatch { shared_inputs: usize, shared_outputs: usize },

    /// the liquidity seller's will_fund witness signature does not verify
    InvalidLiquidityWitness,

    /// tx_complete already sent; no further contribution is allowed until
    /// the counterparty also completes or contributes again
    RoundAlreadyComplete,
}

/// One side's view of an in-progress interactive-tx round.
#[derive(Clone, Debug)]
pub struct InteractiveTxSession {
    pub initiator_is_local: bool,
    pub inputs: Vec<(u64, OutPoint, u32)>,
    pub outputs: Vec<(u64, TxOut)>,
    pub local_sent_complete: bool,
    pub remote_sent_complete: bool,
    pub phase: SessionPhase,
    pub feerate_per_kw: u32,
}

impl InteractiveTxSession {
    pub fn new(initiator_is_local: bool, feerate_per_kw: u32) -> Self {
        InteractiveTxSession {
            initiator_is_local,
            inputs: Vec::new(),
            outputs: Vec::new(),
            local_sent_complete: false,
            remote_sent_complete: false,
            phase: SessionPhase::Contributing,
            feerate_per_kw,
        }
    }

    fn initiator_uses_even_ids(&self) -> bool {
        true
    }

    /// Applies one contribution, local or remote, validating serial-id
    /// parity and resetting both sides' `tx_complete` flags since the
    /// round must see a fresh `tx_complete` from both after any addition.
    pub fn apply(
        &mut self,
        contribution: Contribution,
        from_local: bool,
    ) -> Result<(), InteractiveTxError> {
        if self.phase != SessionPhase::Contributing {
            return Err(InteractiveTxError::RoundAlreadyComplete);
        }
        let expect_even = from_local == self.initiator_is_local;
        if contribution.is_initiator(self.initiator_uses_even_ids()) != expect_even {
            return Err(InteractiveTxError::WrongContributorParity(
                contribution.serial_id(),
            ));
        }
        match contribution {
            Contribution::AddInput { serial_id, outpoint, sequence } => {
                self.inputs.push((serial_id, outpoint, sequence));
            }
            Contribution::AddOutput { serial_id, txout } => {
                if txout.value < 354 {
                    return Err(InteractiveTxError::BelowDustContribution(txout.value));
                }
                self.outputs.push((serial_id, txout));
            }
            Contribution::RemoveInput { serial_id } => {
                self.inputs.retain(|(id, _, _)| *id != serial_id);
            }
            Contribution::RemoveOutput { serial_id } => {
                self.outputs.retain(|(id, _)| *id != serial_id);
            }
        }
        self.local_sent_complete = false;
        self.remote_sent_complete = false;
        Ok(())
    }

    /// Records a `tx_complete` from one side; the round only advances to
    /// signing once both flags are set back to back with no intervening
    /// contribution.
    pub fn receive_complete(&mut self, from_local: bool) {
        if from_local {
            self.local_sent_complete = true;
        } else {
            self.remote_sent_complete = true;
        }
        if self.local_sent_complete && self.remote_sent_complete {
            self.phase = SessionPhase::Signing;
        } else {
            self.phase = SessionPhase::AwaitingCounterpartyComplete;
        }
    }

    pub fn abort(&mut self) {
        self.phase = SessionPhase::Aborted;
    }
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;

    use super::*;

    fn outpoint() -> OutPoint {
        OutPoint::new(bitcoin::Txid::all_zeros(), 0)
    }

    #[test]
    fn round_completes_only_after_both_sides_agree() {
        let mut session = InteractiveTxSession::new(true, 1000);
        session.receive_complete(true);
        assert_eq!(session.phase, SessionPhase::AwaitingCounterpartyComplete);
        session.receive_complete(false);
        assert_eq!(session.phase, SessionPhase::Signing);
    }

    #[test]
    fn contribution_after_complete_resets_both_flags() {
        let mut session = InteractiveTxSession::new(true, 1000);
        session.receive_complete(true);
        session.receive_complete(false);
        session.phase = SessionPhase::Contributing;
        session
            .apply(
                Contribution::AddInput { serial_id: 0, outpoint: outpoint(), sequence: 0 },
                true,
            )
            .unwrap();
        assert!(!session.local_sent_complete);
        assert!(!session.remote_sent_complete);
    }

    #[test]
    fn below_dust_output_is_rejected() {
        let mut session = InteractiveTxSession::new(true, 1000);
        let result = session.apply(
            Contribution::AddOutput {
                serial_id: 0,
                txout: TxOut { value: 100, script_pubkey: bitcoin::Script::new() },
            },
            true,
        );
        assert!(matches!(
            result,
            Err(InteractiveTxError::BelowDustContribution(100))
        ));
    }

    #[test]
    fn wrong_parity_contribution_is_rejected() {
        let mut session = InteractiveTxSession::new(true, 1000);
        let result = session.apply(
            Contribution::AddInput { serial_id: 1, outpoint: outpoint(), sequence: 0 },
            true,
        );
        assert!(matches!(
            result,
            Err(InteractiveTxError::WrongContributorParity(1))
        ));
    }
}
