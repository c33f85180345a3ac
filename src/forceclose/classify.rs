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

//! Classifying whichever transaction is observed spending the funding
//! output, per spec.md 4.5's five-way split.

use crate::txbuilder::commitment::decode_obscured_commitment_number;

/// The five ways an observed commitment publication can be classified.
/// Each variant carries exactly the commitment index relevant to building
/// its reaction, following spec.md 9's "sum-typed variants replace
/// inheritance" design note.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum ForceCloseClass {
    OurLatestPublishedByUs { index: u64 },
    RemoteCurrentPublishedByRemote { index: u64 },
    RemoteNextToBeRevoked { index: u64 },
    RemoteRevoked { index: u64 },
    FutureCommitment,
}

/// Failures while reacting to a force-close observation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum ForceCloseError {
    /// observed commitment decodes to an index past our recorded
    /// commitment history and carries no recognisable per-commitment point,
    /// so only our own output (if any) can be recovered
    UnrecoverableFutureCommitment,

    /// the output this reaction would spend has already been spent by
    /// another transaction
    OutputAlreadySpent,

    /// the parent commitment is already confirmed with a conflicting
    /// spend; skipping a redundant publish
    ParentAlreadyConfirmed,

    /// this is an htlc-success reaction but the preimage is not known
    PreimageUnknown,
}

/// Classifies an observed commitment transaction given its encoded
/// locktime/sequence, our own last-signed index, the remote's
/// already-revoked watermark, and whether `option_data_loss_protect`
/// covers it.
pub fn classify(
    lock_time: u32,
    sequence: u32,
    obscuring_factor: u64,
    our_latest_local_index: u64,
    our_latest_remote_index: u64,
    remote_revoked_up_to: u64,
    is_our_commitment: bool,
) -> ForceCloseClass {
    let observed = decode_obscured_commitment_number(lock_time, sequence) ^ obscuring_factor;

    if is_our_commitment {
        debug!("force-close: recognised our own commitment {}", observed);
        return ForceCloseClass::OurLatestPublishedByUs { index: observed };
    }

    if observed <= remote_revoked_up_to {
        warn!("force-close: counterparty published revoked commitment {}", observed);
        return ForceCloseClass::RemoteRevoked { index: observed };
    }
    if observed == our_latest_remote_index {
        debug!("force-close: counterparty published its current commitment {}", observed);
        return ForceCloseClass::RemoteCurrentPublishedByRemote { index: observed };
    }
    if observed == our_latest_remote_index + 1 {
        debug!("force-close: counterparty published its next-to-be-revoked commitment {}", observed);
        return ForceCloseClass::RemoteNextToBeRevoked { index: observed };
    }
    let _ = our_latest_local_index;
    error!("force-close: observed commitment {} is unrecoverably far in the future", observed);
    ForceCloseClass::FutureCommitment
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::txbuilder::commitment::encode_obscured_commitment_number;

    fn encode(index: u64, factor: u64) -> (u32, u32) {
        encode_obscured_commitment_number(index, factor)
    }

    #[test]
    fn revoked_index_classifies_as_remote_revoked() {
        let factor = 42;
        let (lt, seq) = encode(3, factor);
        let class = classify(lt, seq, factor, 10, 10, 5, false);
        assert_eq!(class, ForceCloseClass::RemoteRevoked { index: 3 });
    }

    #[test]
    fn current_remote_index_classifies_correctly() {
        let factor = 42;
        let (lt, seq) = encode(10, factor);
        let class = classify(lt, seq, factor, 10, 10, 5, false);
        assert_eq!(class, ForceCloseClass::RemoteCurrentPublishedByRemote { index: 10 });
    }

    #[test]
    fn next_unrevealed_index_classifies_as_next_to_be_revoked() {
        let factor = 42;
        let (lt, seq) = encode(11, factor);
        let class = classify(lt, seq, factor, 10, 10, 5, false);
        assert_eq!(class, ForceCloseClass::RemoteNextToBeRevoked { index: 11 });
    }

    #[test]
    fn far_future_index_classifies_as_future_commitment() {
        let factor = 42;
        let (lt, seq) = encode(50, factor);
        let class = classify(lt, seq, factor, 10, 10, 5, false);
        assert_eq!(class, ForceCloseClass::FutureCommitment);
    }

    #[test]
    fn our_own_broadcast_is_recognised_directly() {
        let factor = 42;
        let (lt, seq) = encode(7, factor);
        let class = classify(lt, seq, factor, 7, 10, 5, true);
        assert_eq!(class, ForceCloseClass::OurLatestPublishedByUs { index: 7 });
    }
}
