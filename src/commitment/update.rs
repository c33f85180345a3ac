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

//! The six update-protocol message bodies and the bucket a proposed change
//! occupies while it works its way through sign/ack.

use crate::htlc::{Htlc, HtlcId};

/// One of the six messages BOLT-2 exchanges after channel establishment to
/// mutate a commitment's pending HTLC set or feerate.
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub enum UpdateMessage {
    AddHtlc(Htlc),
    FulfillHtlc { id: HtlcId, payment_preimage: [u8; 32] },
    FailHtlc { id: HtlcId, reason: Vec<u8> },
    FailMalformedHtlc { id: HtlcId, sha256_of_onion: [u8; 32], failure_code: u16 },
    Fee { feerate_per_kw: u32 },
}

impl UpdateMessage {
    pub fn htlc_id(&self) -> Option<HtlcId> {
        match self {
            UpdateMessage::AddHtlc(htlc) => Some(htlc.id),
            UpdateMessage::FulfillHtlc { id, .. }
            | UpdateMessage::FailHtlc { id, .. }
            | UpdateMessage::FailMalformedHtlc { id, .. } => Some(*id),
            UpdateMessage::Fee { .. } => None,
        }
    }
}

/// Which of the six change buckets a pending update currently occupies.
/// Buckets advance strictly left to right as `commit_sig`/`revoke_and_ack`
/// are exchanged; an update never skips a bucket.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum ChangeBucket {
    LocalProposed,
    LocalSigned,
    LocalAcked,
    RemoteProposed,
    RemoteAcked,
    RemoteSigned,
}

/// A pending change together with the bucket it currently occupies.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct PendingChange {
    pub message: UpdateMessage,
    pub bucket: ChangeBucket,
}

/// Failures raised while applying an update message or advancing the
/// commitment indices.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum UpdateError {
    /// htlc id {received} is not strictly greater than the last accepted
    /// id {last}
    HtlcIdNotMonotonic { received: HtlcId, last: HtlcId },

    /// htlc amount {amount} msat is below the negotiated minimum of
    /// {minimum} msat
    BelowHtlcMinimum { amount: u64, minimum: u64 },

    /// accepting this htlc would exceed the available balance after fees
    /// and reserve
    InsufficientBalance,

    /// accepting this htlc would exceed the maximum accepted htlc count of
    /// {0}
    TooManyHtlcs(u16),

    /// accepting this htlc would exceed the maximum in-flight value of
    /// {0} msat
    MaxInFlightExceeded(u64),

    /// htlc {0} is not known on this channel
    UnknownHtlc(HtlcId),

    /// preimage does not hash to the payment hash of htlc {0}
    PreimageMismatch(HtlcId),

    /// only the channel opener may send update_fee
    FeeUpdateByNonOpener,

    /// revoked secret does not match the counterparty's previously
    /// disclosed per-commitment point
    RevocationSecretMismatch,

    /// a new htlc was proposed after stfu was sent, forbidding further
    /// additions until the splice resolves
    HtlcForbiddenDuringSplice,

    /// commit_sig batch_size {received} does not match the number of
    /// active commitments ({expected})
    BatchSizeMismatch { received: u16, expected: u16 },
}
