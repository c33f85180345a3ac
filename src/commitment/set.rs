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

//! The commitment set: every currently-relevant signed commitment plus the
//! pending HTLC changes that have not yet settled into both sides' specs.

use secp256k1::ecdsa::Signature;

use crate::commitment::update::{
    ChangeBucket, PendingChange, UpdateError, UpdateMessage,
};
use crate::commitment_spec::CommitmentSpec;
use crate::htlc::{Direction, DirectedHtlc, Htlc, HtlcId};
use crate::keys::ShaChain;
use crate::params::ChannelParameters;

/// Where a commitment's funding output currently stands on-chain. Only
/// `Confirmed` commitments may become the channel's sole active one; the
/// others coexist during splicing/RBF or immediately after opening.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum FundingStatus {
    SingleFundedUnconfirmed,
    DualFundedUnconfirmed,
    ZeroconfPublished,
    Confirmed,
}

/// One signed commitment: its index, spec, the commit transaction's remote
/// signature, and one signature per non-dust HTLC output.
#[derive(Clone, PartialEq, Debug)]
pub struct Commitment {
    pub index: u64,
    pub spec: CommitmentSpec,
    pub funding_status: FundingStatus,
    pub remote_signature: Option<Signature>,
    pub htlc_signatures: Vec<(HtlcId, Signature)>,
}

impl Commitment {
    pub fn new(index: u64, spec: CommitmentSpec) -> Self {
        Commitment {
            index,
            spec,
            funding_status: FundingStatus::SingleFundedUnconfirmed,
            remote_signature: None,
            htlc_signatures: Vec::new(),
        }
    }

    pub fn is_signed(&self) -> bool {
        self.remote_signature.is_some()
    }
}

/// Holds every active and inactive commitment plus the six change buckets
/// from spec.md's update protocol, and the shachain of secrets the
/// counterparty has revealed to us.
#[derive(Clone, Debug)]
pub struct CommitmentSet {
    pub params: ChannelParameters,
    pub active: Vec<Commitment>,
    pub inactive: Vec<Commitment>,
    pub local_commitment_number: u64,
    pub remote_commitment_number: u64,
    pub changes: Vec<PendingChange>,
    pub remote_secrets: ShaChain,
    pub next_local_htlc_id: HtlcId,
    pub next_remote_htlc_id: HtlcId,
    /// Set once `stfu` has been sent or received; forbids `update_add_htlc`
    /// until the splice it guards resolves.
    pub splice_quiescent: bool,
}

impl CommitmentSet {
    pub fn new(params: ChannelParameters, initial_spec: CommitmentSpec) -> Self {
        CommitmentSet {
            params,
            active: vec![Commitment::new(0, initial_spec)],
            inactive: Vec::new(),
            local_commitment_number: 0,
            remote_commitment_number: 0,
            changes: Vec::new(),
            remote_secrets: ShaChain::new(),
            next_local_htlc_id: HtlcId::from(0u64),
            next_remote_htlc_id: HtlcId::from(0u64),
            splice_quiescent: false,
        }
    }

    /// The spec every active commitment shares before pending-but-unsigned
    /// changes are applied — all active commitments during normal (non-
    /// splicing) operation carry the same spec, so the first is
    /// representative.
    pub fn current_spec(&self) -> &CommitmentSpec {
        &self.active[0].spec
    }

    fn htlc_minimum_msat(&self) -> u64 {
        self.params.remote.htlc_minimum_msat
    }

    fn max_accepted_htlcs(&self) -> u16 {
        self.params.remote.max_accepted_htlcs
    }

    fn max_in_flight_msat(&self) -> u64 {
        self.params.remote.max_htlc_value_in_flight_msat
    }

    /// Applies `update_add_htlc` received from the remote party, validating
    /// it against this channel's negotiated limits per spec.md 4.2.1.
    pub fn receive_add_htlc(&mut self, htlc: Htlc) -> Result<(), UpdateError> {
        if self.splice_quiescent {
            return Err(UpdateError::HtlcForbiddenDuringSplice);
        }
        if htlc.id != self.next_remote_htlc_id {
            return Err(UpdateError::HtlcIdNotMonotonic {
                received: htlc.id,
                last: self.next_remote_htlc_id,
            });
        }
        if htlc.amount_msat < self.htlc_minimum_msat() {
            return Err(UpdateError::BelowHtlcMinimum {
                amount: htlc.amount_msat,
                minimum: self.htlc_minimum_msat(),
            });
        }
        let spec = self.current_spec();
        let incoming_count = spec
            .htlcs
            .iter()
            .filter(|h| h.direction == Direction::Incoming)
            .count() as u16
            + 1;
        if incoming_count > self.max_accepted_htlcs() {
            return Err(UpdateError::TooManyHtlcs(self.max_accepted_htlcs()));
        }
        let in_flight = spec.total_htlc_amount_msat(Direction::Incoming)
            + htlc.amount_msat;
        if in_flight > self.max_in_flight_msat() {
            return Err(UpdateError::MaxInFlightExceeded(
                self.max_in_flight_msat(),
            ));
        }
        if htlc.amount_msat > spec.to_remote_msat {
            return Err(UpdateError::InsufficientBalance);
        }
        self.next_remote_htlc_id = htlc.id.next();
        self.changes.push(PendingChange {
            message: UpdateMessage::AddHtlc(htlc),
            bucket: ChangeBucket::RemoteProposed,
        });
        Ok(())
    }

    /// Proposes an outgoing HTLC locally, assigning the next strictly
    /// increasing id.
    pub fn propose_add_htlc(
        &mut self,
        amount_msat: u64,
        payment_hash: [u8; 32],
        cltv_expiry: u32,
        onion_routing_packet: Vec<u8>,
    ) -> Result<HtlcId, UpdateError> {
        if self.splice_quiescent {
            return Err(UpdateError::HtlcForbiddenDuringSplice);
        }
        let spec = self.current_spec();
        if amount_msat > spec.to_local_msat {
            return Err(UpdateError::InsufficientBalance);
        }
        let id = self.next_local_htlc_id;
        self.next_local_htlc_id = id.next();
        self.changes.push(PendingChange {
            message: UpdateMessage::AddHtlc(Htlc {
                id,
                amount_msat,
                payment_hash,
                cltv_expiry,
                onion_routing_packet,
                blinding_point: None,
            }),
            bucket: ChangeBucket::LocalProposed,
        });
        Ok(id)
    }

    /// Applies `update_fulfill_htlc`: the preimage must hash to the pending
    /// offered HTLC's payment hash.
    pub fn fulfill_htlc(
        &mut self,
        id: HtlcId,
        payment_preimage: [u8; 32],
    ) -> Result<(), UpdateError> {
        use bitcoin::hashes::{sha256, Hash};

        let htlc = self
            .find_pending_or_committed_htlc(id)
            .ok_or(UpdateError::UnknownHtlc(id))?;
        let hash = sha256::Hash::hash(&payment_preimage).into_inner();
        if hash != htlc.payment_hash {
            return Err(UpdateError::PreimageMismatch(id));
        }
        self.changes.push(PendingChange {
            message: UpdateMessage::FulfillHtlc { id, payment_preimage },
            bucket: ChangeBucket::LocalProposed,
        });
        Ok(())
    }

    /// Applies `update_fail_htlc`, terminating a pending offered HTLC
    /// without revealing a preimage.
    pub fn fail_htlc(&mut self, id: HtlcId, reason: Vec<u8>) -> Result<(), UpdateError> {
        if self.find_pending_or_committed_htlc(id).is_none() {
            return Err(UpdateError::UnknownHtlc(id));
        }
        self.changes.push(PendingChange {
            message: UpdateMessage::FailHtlc { id, reason },
            bucket: ChangeBucket::LocalProposed,
        });
        Ok(())
    }

    /// Applies `update_fee`; rejected unless the local party is the channel
    /// opener.
    pub fn propose_fee_update(&mut self, feerate_per_kw: u32) -> Result<(), UpdateError> {
        if !self.params.is_outbound {
            return Err(UpdateError::FeeUpdateByNonOpener);
        }
        self.changes.push(PendingChange {
            message: UpdateMessage::Fee { feerate_per_kw },
            bucket: ChangeBucket::LocalProposed,
        });
        Ok(())
    }

    fn find_pending_or_committed_htlc(&self, id: HtlcId) -> Option<Htlc> {
        for change in &self.changes {
            if let UpdateMessage::AddHtlc(htlc) = &change.message {
                if htlc.id == id {
                    return Some(htlc.clone());
                }
            }
        }
        self.current_spec()
            .htlcs
            .iter()
            .map(|d: &DirectedHtlc| d.htlc.clone())
            .find(|h| h.id == id)
    }

    /// Applies a batch of `commit_sig` messages: one `(signature,
    /// htlc_signatures)` pair per currently active commitment, in the same
    /// order as [`Self::active`]. Multiple active commitments only arise
    /// while a splice is in flight, in which case every `commit_sig` in the
    /// batch carries the same `batch_size` so the receiver knows how many
    /// to wait for before the round is complete; a single active
    /// commitment expects `batch_size == 1`.
    pub fn receive_commit_sig(
        &mut self,
        batch_size: u16,
        signatures: Vec<(Signature, Vec<(HtlcId, Signature)>)>,
    ) -> Result<(), UpdateError> {
        let expected = self.active.len() as u16;
        if batch_size != expected || signatures.len() != expected as usize {
            warn!(
                "commit_sig batch_size mismatch: received {}, expected {}",
                batch_size, expected
            );
            return Err(UpdateError::BatchSizeMismatch { received: batch_size, expected });
        }
        for (commitment, (signature, htlc_signatures)) in
            self.active.iter_mut().zip(signatures)
        {
            commitment.remote_signature = Some(signature);
            commitment.htlc_signatures = htlc_signatures;
        }
        debug!("applied commit_sig batch to {} active commitment(s)", expected);
        Ok(())
    }

    /// Advances both indices by one and folds every acked change into both
    /// commitment specs, called once a `commit_sig`/`revoke_and_ack` round
    /// trip has fully completed for every active commitment.
    pub fn advance_round(&mut self) {
        self.local_commitment_number += 1;
        self.remote_commitment_number += 1;
        let applied = self.changes.len();
        for change in self.changes.drain(..) {
            for commitment in self.active.iter_mut() {
                apply_change(&mut commitment.spec, &change);
            }
        }
        debug!(
            "advanced to commitment {}/{} folding {} pending change(s)",
            self.local_commitment_number, self.remote_commitment_number, applied
        );
    }

    /// Records the per-commitment secret revealed by `revoke_and_ack`,
    /// which must hash forward to every descendant secret already on file.
    pub fn receive_revocation(
        &mut self,
        revoked_index: u64,
        secret: [u8; 32],
    ) -> Result<(), UpdateError> {
        match self
            .remote_secrets
            .insert_secret(shachain_index(revoked_index), secret)
        {
            Ok(()) => {
                debug!("recorded revocation secret for commitment {}", revoked_index);
                Ok(())
            }
            Err(_) => {
                error!(
                    "revocation secret for commitment {} failed shachain verification",
                    revoked_index
                );
                Err(UpdateError::RevocationSecretMismatch)
            }
        }
    }
}

/// BOLT-3's `I = 2^48 - 1 - N` transform from commitment number to
/// shachain storage index.
fn shachain_index(commitment_number: u64) -> u64 {
    (1u64 << 48) - 1 - commitment_number
}

/// Which side originally proposed a change, derived from the bucket it was
/// pushed into: `Local*` buckets are our own proposals (offered outputs are
/// `Outgoing`), `Remote*` buckets are the counterparty's.
fn originator_direction(bucket: ChangeBucket) -> Direction {
    match bucket {
        ChangeBucket::LocalProposed | ChangeBucket::LocalSigned | ChangeBucket::LocalAcked => {
            Direction::Outgoing
        }
        ChangeBucket::RemoteProposed | ChangeBucket::RemoteAcked | ChangeBucket::RemoteSigned => {
            Direction::Incoming
        }
    }
}

fn apply_change(spec: &mut CommitmentSpec, change: &PendingChange) {
    match &change.message {
        UpdateMessage::AddHtlc(htlc) => {
            let direction = originator_direction(change.bucket);
            spec.htlcs.push(DirectedHtlc::new(htlc.clone(), direction));
        }
        UpdateMessage::FulfillHtlc { id, .. } => {
            if let Some(pos) = spec.htlcs.iter().position(|h| h.id() == *id) {
                let removed = spec.htlcs.remove(pos);
                match removed.direction {
                    // We offered it: the payee (remote) receives the value.
                    Direction::Outgoing => spec.to_remote_msat += removed.amount_msat(),
                    // They offered it: we are the payee.
                    Direction::Incoming => spec.to_local_msat += removed.amount_msat(),
                }
            }
        }
        UpdateMessage::FailHtlc { id, .. }
        | UpdateMessage::FailMalformedHtlc { id, .. } => {
            if let Some(pos) = spec.htlcs.iter().position(|h| h.id() == *id) {
                let removed = spec.htlcs.remove(pos);
                match removed.direction {
                    // We offered it: a failure returns the value to us.
                    Direction::Outgoing => spec.to_local_msat += removed.amount_msat(),
                    // They offered it: a failure returns the value to them.
                    Direction::Incoming => spec.to_remote_msat += removed.amount_msat(),
                }
            }
        }
        UpdateMessage::Fee { feerate_per_kw } => {
            spec.feerate_per_kw = *feerate_per_kw;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::policy::{CommonParams, PeerParams};

    fn params() -> ChannelParameters {
        ChannelParameters {
            common: CommonParams::default(),
            local: PeerParams {
                max_accepted_htlcs: 10,
                max_htlc_value_in_flight_msat: 1_000_000_000,
                htlc_minimum_msat: 1,
                ..PeerParams::default()
            },
            remote: PeerParams {
                max_accepted_htlcs: 10,
                max_htlc_value_in_flight_msat: 1_000_000_000,
                htlc_minimum_msat: 1,
                ..PeerParams::default()
            },
            format: crate::params::CommitmentFormat::DefaultSegwit,
            is_outbound: true,
        }
    }

    fn spec() -> CommitmentSpec {
        CommitmentSpec::new(5000, 400_000_000, 300_000_000)
    }

    #[test]
    fn add_htlc_below_minimum_is_rejected() {
        let mut set = CommitmentSet::new(params(), spec());
        let result = set.receive_add_htlc(Htlc {
            id: HtlcId::from(0u64),
            amount_msat: 0,
            payment_hash: [0u8; 32],
            cltv_expiry: 500_000,
            onion_routing_packet: vec![],
            blinding_point: None,
        });
        assert!(matches!(
            result,
            Err(UpdateError::BelowHtlcMinimum { .. })
        ));
    }

    #[test]
    fn add_htlc_forbidden_during_splice_quiescence() {
        let mut set = CommitmentSet::new(params(), spec());
        set.splice_quiescent = true;
        let result = set.propose_add_htlc(1000, [0u8; 32], 500_000, vec![]);
        assert!(matches!(
            result,
            Err(UpdateError::HtlcForbiddenDuringSplice)
        ));
    }

    #[test]
    fn advance_round_reconverges_indices() {
        let mut set = CommitmentSet::new(params(), spec());
        set.propose_add_htlc(1_000_000, [1u8; 32], 500_000, vec![]).unwrap();
        set.advance_round();
        assert_eq!(set.local_commitment_number, 1);
        assert_eq!(set.remote_commitment_number, 1);
        assert_eq!(set.active[0].spec.htlcs.len(), 1);
    }

    #[test]
    fn fee_update_by_non_opener_is_rejected() {
        let mut p = params();
        p.is_outbound = false;
        let mut set = CommitmentSet::new(p, spec());
        assert!(matches!(
            set.propose_fee_update(6000),
            Err(UpdateError::FeeUpdateByNonOpener)
        ));
    }

    fn dummy_signature() -> Signature {
        let sk = secp256k1::SecretKey::from_slice(&[3u8; 32]).unwrap();
        let msg = secp256k1::Message::from_slice(&[4u8; 32]).unwrap();
        secp256k1::SECP256K1.sign_ecdsa(&msg, &sk)
    }

    #[test]
    fn commit_sig_writes_remote_signature_onto_the_sole_active_commitment() {
        let mut set = CommitmentSet::new(params(), spec());
        set.receive_commit_sig(1, vec![(dummy_signature(), vec![])])
            .unwrap();
        assert!(set.active[0].is_signed());
    }

    #[test]
    fn commit_sig_batch_size_mismatch_is_rejected() {
        let mut set = CommitmentSet::new(params(), spec());
        let result = set.receive_commit_sig(2, vec![(dummy_signature(), vec![])]);
        assert!(matches!(
            result,
            Err(UpdateError::BatchSizeMismatch { received: 2, expected: 1 })
        ));
        assert!(!set.active[0].is_signed());
    }

    #[test]
    fn received_htlc_applies_as_incoming() {
        let mut set = CommitmentSet::new(params(), spec());
        set.receive_add_htlc(Htlc {
            id: HtlcId::from(0u64),
            amount_msat: 1_000_000,
            payment_hash: [7u8; 32],
            cltv_expiry: 500_000,
            onion_routing_packet: vec![],
            blinding_point: None,
        })
        .unwrap();
        set.advance_round();
        assert_eq!(set.active[0].spec.htlcs.len(), 1);
        assert_eq!(set.active[0].spec.htlcs[0].direction, Direction::Incoming);
    }

    #[test]
    fn incoming_htlc_count_limit_is_enforced() {
        let mut p = params();
        p.remote.max_accepted_htlcs = 1;
        let mut set = CommitmentSet::new(p, spec());
        set.receive_add_htlc(Htlc {
            id: HtlcId::from(0u64),
            amount_msat: 1_000,
            payment_hash: [1u8; 32],
            cltv_expiry: 500_000,
            onion_routing_packet: vec![],
            blinding_point: None,
        })
        .unwrap();
        set.advance_round();
        let result = set.receive_add_htlc(Htlc {
            id: HtlcId::from(1u64),
            amount_msat: 1_000,
            payment_hash: [2u8; 32],
            cltv_expiry: 500_000,
            onion_routing_packet: vec![],
            blinding_point: None,
        });
        assert!(matches!(result, Err(UpdateError::TooManyHtlcs(1))));
    }

    #[test]
    fn fulfilling_an_incoming_htlc_credits_to_local_not_to_remote() {
        use bitcoin::hashes::{sha256, Hash};

        let preimage = [9u8; 32];
        let payment_hash = sha256::Hash::hash(&preimage).into_inner();
        let mut set = CommitmentSet::new(params(), spec());
        set.receive_add_htlc(Htlc {
            id: HtlcId::from(0u64),
            amount_msat: 2_000_000,
            payment_hash,
            cltv_expiry: 500_000,
            onion_routing_packet: vec![],
            blinding_point: None,
        })
        .unwrap();
        set.advance_round();
        let to_local_before = set.active[0].spec.to_local_msat;
        let to_remote_before = set.active[0].spec.to_remote_msat;

        set.fulfill_htlc(HtlcId::from(0u64), preimage).unwrap();
        set.advance_round();

        assert_eq!(set.active[0].spec.to_local_msat, to_local_before + 2_000_000);
        assert_eq!(set.active[0].spec.to_remote_msat, to_remote_before);
    }
}
