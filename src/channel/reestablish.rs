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

//! Reconnection: deciding which messages a `channel_reestablish` from the
//! peer obliges us to retransmit.

use bitcoin::Txid;

use crate::wire::ChannelReestablish;

/// One concrete retransmission action the reestablish handshake may
/// require, in the order spec.md's table lists them.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum RetransmitAction {
    ResendCommitSig,
    ResendRevokeAndAck,
    AbortSplice,
    ResendTxSignatures,
    ResendSpliceLocked,
}

/// Failures raised while reconciling local state against a peer's
/// `channel_reestablish`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum ReestablishError {
    /// peer's next_remote_commitment_number {claimed} is neither our
    /// current index {current} nor the next one, indicating irrecoverable
    /// state divergence
    CommitmentNumberDivergence { claimed: u64, current: u64 },

    /// peer's next_local_commitment_number {claimed} implies we've lost a
    /// revocation we must have sent; state divergence
    RevocationDivergence { claimed: u64, current: u64 },
}

/// Computes every retransmission the local side owes the peer, given our
/// own indices, whether a splice `tx_signatures`/`splice_locked` is
/// outstanding, and the peer's `channel_reestablish`.
pub fn compute_retransmissions(
    local_commitment_number: u64,
    remote_commitment_number: u64,
    local_known_next_funding_txid: Option<Txid>,
    local_sent_tx_signatures: bool,
    local_sent_unacked_splice_locked: bool,
    peer: &ChannelReestablish,
) -> Result<Vec<RetransmitAction>, ReestablishError> {
    let mut actions = Vec::new();

    if peer.next_remote_commitment_number == local_commitment_number {
        actions.push(RetransmitAction::ResendCommitSig);
    } else if peer.next_remote_commitment_number != local_commitment_number + 1 {
        return Err(ReestablishError::CommitmentNumberDivergence {
            claimed: peer.next_remote_commitment_number,
            current: local_commitment_number,
        });
    }

    if peer.next_local_commitment_number == remote_commitment_number {
        actions.push(RetransmitAction::ResendRevokeAndAck);
    } else if peer.next_local_commitment_number != remote_commitment_number + 1 {
        return Err(ReestablishError::RevocationDivergence {
            claimed: peer.next_local_commitment_number,
            current: remote_commitment_number,
        });
    }

    if let Some(peer_funding_txid) = peer.next_funding_txid {
        match local_known_next_funding_txid {
            Some(known) if known == peer_funding_txid => {
                if local_sent_tx_signatures {
                    actions.push(RetransmitAction::ResendTxSignatures);
                    actions.push(RetransmitAction::ResendSpliceLocked);
                }
            }
            _ => actions.push(RetransmitAction::AbortSplice),
        }
    } else if local_sent_unacked_splice_locked {
        actions.push(RetransmitAction::ResendSpliceLocked);
    }

    Ok(actions)
}

#[cfg(test)]
mod test {
    use amplify::Wrapper;

    use super::*;
    use crate::wire::ChannelId;

    fn peer(next_local: u64, next_remote: u64) -> ChannelReestablish {
        ChannelReestablish {
            channel_id: ChannelId::from_inner(amplify::Slice32::from_inner([0u8; 32])),
            next_local_commitment_number: next_local,
            next_remote_commitment_number: next_remote,
            your_last_per_commitment_secret: [0u8; 32],
            my_current_per_commitment_point: dumb_pubkey!(),
            next_funding_txid: None,
        }
    }

    #[test]
    fn retransmits_lost_commit_sig() {
        let actions = compute_retransmissions(5, 5, None, false, false, &peer(6, 5)).unwrap();
        assert!(actions.contains(&RetransmitAction::ResendCommitSig));
    }

    #[test]
    fn retransmits_lost_revoke_and_ack() {
        let actions = compute_retransmissions(5, 5, None, false, false, &peer(5, 4)).unwrap();
        assert!(actions.contains(&RetransmitAction::ResendRevokeAndAck));
    }

    #[test]
    fn unknown_next_funding_txid_aborts_splice() {
        use bitcoin::hashes::Hash;
        let mut msg = peer(5, 5);
        msg.next_funding_txid = Some(bitcoin::Txid::from_inner([1u8; 32]));
        let actions = compute_retransmissions(5, 5, None, false, false, &msg).unwrap();
        assert_eq!(actions, vec![RetransmitAction::AbortSplice]);
    }

    #[test]
    fn far_future_commitment_number_is_divergence() {
        let result = compute_retransmissions(5, 5, None, false, false, &peer(5, 99));
        assert!(result.is_err());
    }
}
