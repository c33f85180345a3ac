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

//! The persistence collaborator boundary: one versioned record per
//! channel, written after every transition that could expose the node to
//! loss if replayed incorrectly — most importantly every received
//! `revoke_and_ack` (the revocation secret) and every received signature
//! (the commitment we've now signed).

use std::collections::HashMap;

use crate::channel::Lifecycle;
use crate::commitment::Commitment;
use crate::htlc::HtlcId;
use crate::keys::{LocalKeyset, RemoteKeyset, ShaChain};
use crate::params::ChannelParameters;
use crate::wire::ChannelId;

/// Current version of [`ChannelRecord`]'s on-disk encoding. Bumped whenever
/// a field is added, removed or reinterpreted; a persistence backend reads
/// this discriminant before decoding the rest of the record.
pub const CHANNEL_RECORD_VERSION: u8 = 1;

/// Where an in-flight HTLC came from, so a failure can be propagated back
/// to whoever is waiting on it. Routing itself is a collaborator outside
/// this crate; this only remembers enough to hand a failure back.
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub enum HtlcOrigin {
    /// Originated locally (we are the payer).
    LocalCommand,
    /// Forwarded from another channel; failures propagate back to
    /// `incoming_channel_id`/`incoming_htlc_id`.
    Forwarded {
        incoming_channel_id: ChannelId,
        incoming_htlc_id: HtlcId,
    },
}

/// One versioned, persistable snapshot of a channel's full state.
#[derive(Clone, Debug)]
pub struct ChannelRecord {
    pub version: u8,
    pub channel_id: Option<ChannelId>,
    pub params: ChannelParameters,
    pub local_keys: LocalKeyset,
    pub remote_keys: RemoteKeyset,
    pub active_commitments: Vec<Commitment>,
    pub inactive_commitments: Vec<Commitment>,
    pub remote_secrets: ShaChain,
    pub htlc_origins: HashMap<HtlcId, HtlcOrigin>,
    pub lifecycle: Lifecycle,
}

impl ChannelRecord {
    pub fn new(
        channel_id: Option<ChannelId>,
        params: ChannelParameters,
        local_keys: LocalKeyset,
        remote_keys: RemoteKeyset,
    ) -> Self {
        ChannelRecord {
            version: CHANNEL_RECORD_VERSION,
            channel_id,
            params,
            local_keys,
            remote_keys,
            active_commitments: Vec::new(),
            inactive_commitments: Vec::new(),
            remote_secrets: ShaChain::default(),
            htlc_origins: HashMap::new(),
            lifecycle: Lifecycle::Opening,
        }
    }
}

/// Errors a persistence backend can report back. The engine treats any of
/// these as fatal to the in-progress operation: a state change that cannot
/// be durably recorded must not be acted on.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum PersistenceError {
    /// no record found for channel {0}
    NotFound(ChannelId),
    /// the stored record's version {found} is newer than this engine's
    /// supported version {supported}
    UnsupportedVersion { found: u8, supported: u8 },
    /// the backend failed to durably write the record: {0}
    BackendFailure(String),
}

/// Collaborator interface a channel actor awaits after every state change
/// it cannot afford to lose. Implemented by the host against whatever
/// store it has (a KV store, a SQL table, a flat file); this crate only
/// produces [`ChannelRecord`]s and waits for the write to complete.
pub trait ChannelStore {
    fn load(&self, channel_id: ChannelId) -> Result<ChannelRecord, PersistenceError>;
    fn store(&mut self, record: &ChannelRecord) -> Result<(), PersistenceError>;
    fn remove(&mut self, channel_id: ChannelId) -> Result<(), PersistenceError>;
}

/// An in-memory [`ChannelStore`], useful for tests and as a reference
/// implementation of the trait's contract.
#[derive(Clone, Debug, Default)]
pub struct MemoryChannelStore {
    records: HashMap<ChannelId, ChannelRecord>,
}

impl ChannelStore for MemoryChannelStore {
    fn load(&self, channel_id: ChannelId) -> Result<ChannelRecord, PersistenceError> {
        self.records
            .get(&channel_id)
            .cloned()
            .ok_or(PersistenceError::NotFound(channel_id))
    }

    fn store(&mut self, record: &ChannelRecord) -> Result<(), PersistenceError> {
        let channel_id = record
            .channel_id
            .ok_or_else(|| PersistenceError::BackendFailure(
                "cannot persist a channel before it has a channel_id".to_string(),
            ))?;
        self.records.insert(channel_id, record.clone());
        Ok(())
    }

    fn remove(&mut self, channel_id: ChannelId) -> Result<(), PersistenceError> {
        self.records.remove(&channel_id);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use bitcoin::OutPoint;

    use amplify::DumbDefault;

    use super::*;
    use crate::params::CommitmentFormat;
    use crate::policy::{CommonParams, PeerParams};

    fn dummy_channel_id() -> ChannelId {
        use bitcoin::hashes::Hash;
        ChannelId::with(OutPoint::new(bitcoin::Txid::all_zeros(), 0))
    }

    fn dummy_params() -> ChannelParameters {
        ChannelParameters {
            common: CommonParams::default(),
            local: PeerParams { ..PeerParams::default() },
            remote: PeerParams { ..PeerParams::default() },
            format: CommitmentFormat::DefaultSegwit,
            is_outbound: true,
        }
    }

    #[test]
    fn round_trips_through_memory_store() {
        let channel_id = dummy_channel_id();
        let record = ChannelRecord::new(
            Some(channel_id),
            dummy_params(),
            LocalKeyset::dumb_default(),
            RemoteKeyset::dumb_default(),
        );
        let mut store = MemoryChannelStore::default();
        store.store(&record).unwrap();
        let loaded = store.load(channel_id).unwrap();
        assert_eq!(loaded.version, CHANNEL_RECORD_VERSION);
        assert_eq!(loaded.channel_id, Some(channel_id));
    }

    #[test]
    fn loading_unknown_channel_fails() {
        let store = MemoryChannelStore::default();
        let result = store.load(dummy_channel_id());
        assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    }

    #[test]
    fn storing_without_a_channel_id_fails() {
        let record = ChannelRecord::new(
            None,
            dummy_params(),
            LocalKeyset::dumb_default(),
            RemoteKeyset::dumb_default(),
        );
        let mut store = MemoryChannelStore::default();
        assert!(store.store(&record).is_err());
    }
}
