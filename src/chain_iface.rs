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

//! The chain-watcher collaborator boundary: a channel actor subscribes to
//! a handful of watch requests and is later woken by the corresponding
//! event. The watcher itself — a wallet's own chain index, an Electrum
//! client, a full node's `zmq` feed — lives outside this crate; only the
//! request/event shapes and the subscription registry live here.

use bitcoin::{OutPoint, Txid};

/// A request a channel actor places with the chain collaborator. Each
/// variant names the one thing it is watching for.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum WatchRequest {
    /// Notify once `txid` (expected to be a funding transaction) reaches
    /// its required confirmation depth.
    FundingConfirmed { txid: Txid },
    /// Notify if `txid`'s funding output is spent by anything other than
    /// one of the commitments in `alternative_set` — i.e. an unexpected
    /// force-close or a splice race we didn't initiate.
    FundingSpent { txid: Txid, alternative_set: Vec<Txid> },
    /// Notify once `outpoint` (one of our own published claim's inputs) is
    /// spent, so a penalty or delayed claim can be chained after it.
    OutputSpent { outpoint: OutPoint },
    /// Notify once `txid` reaches confirmation, used for any transaction
    /// we've published and are waiting to finalize (second-stage HTLC
    /// transactions, closing transactions).
    TxConfirmed { txid: Txid },
    /// Notify once any of a splice's racing alternative commitments
    /// confirms, so the others can be cancelled.
    AlternativeCommitTxConfirmed { txid: Txid },
}

/// The event a chain collaborator reports back for a previously placed
/// [`WatchRequest`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ChainEvent {
    Confirmed { txid: Txid, height: u32 },
    Spent { outpoint: OutPoint, spending_txid: Txid },
    AlternativeCommitConfirmed { txid: Txid },
}

/// Collaborator interface a channel actor drives to watch the chain.
/// Implemented by the host application against whatever chain source it
/// has; this crate only issues requests and consumes events.
pub trait ChainWatcher {
    fn watch_funding_confirmed(&mut self, txid: Txid);
    fn watch_funding_spent(&mut self, txid: Txid, alternative_set: Vec<Txid>);
    fn watch_output_spent(&mut self, outpoint: OutPoint);
    fn watch_tx_confirmed(&mut self, txid: Txid);
    fn watch_alternative_commit_tx_confirmed(&mut self, txid: Txid);
}

/// An in-memory registry of outstanding watch requests, useful for tests
/// and as the bookkeeping half of a real [`ChainWatcher`] implementation:
/// it tracks *what* has been asked for, leaving the actual chain polling
/// to the host.
#[derive(Clone, Debug, Default)]
pub struct WatchRegistry {
    pending: Vec<WatchRequest>,
}

impl WatchRegistry {
    pub fn register(&mut self, request: WatchRequest) {
        if !self.pending.contains(&request) {
            self.pending.push(request);
        }
    }

    pub fn pending(&self) -> &[WatchRequest] {
        &self.pending
    }

    /// Removes the watch a just-delivered event satisfies, returning
    /// whether it had actually been registered (an event for a request we
    /// never placed is a bug in the collaborator, not in this crate).
    pub fn resolve(&mut self, event: &ChainEvent) -> bool {
        let before = self.pending.len();
        self.pending.retain(|request| !matches(request, event));
        self.pending.len() != before
    }
}

fn matches(request: &WatchRequest, event: &ChainEvent) -> bool {
    match (request, event) {
        (WatchRequest::FundingConfirmed { txid }, ChainEvent::Confirmed { txid: t, .. }) => {
            txid == t
        }
        (WatchRequest::TxConfirmed { txid }, ChainEvent::Confirmed { txid: t, .. }) => txid == t,
        (
            WatchRequest::FundingSpent { txid, .. },
            ChainEvent::Spent { spending_txid, .. },
        ) => txid == spending_txid,
        (WatchRequest::OutputSpent { outpoint }, ChainEvent::Spent { outpoint: o, .. }) => {
            outpoint == o
        }
        (
            WatchRequest::AlternativeCommitTxConfirmed { txid },
            ChainEvent::AlternativeCommitConfirmed { txid: t },
        ) => txid == t,
        _ => false,
    }
}
