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

//! The broadcast collaborator boundary: every transaction this crate
//! builds is handed to a publisher rather than broadcast directly, so the
//! host can apply its own mempool policy, RBF bumping and retry schedule.

use bitcoin::Transaction;

pub use crate::forceclose::ConfirmationTarget;

/// A command emitted to the publisher collaborator.
#[derive(Clone, Debug)]
pub enum PublishCommand {
    /// An already fully-signed transaction with nothing left to bump —
    /// commitment transactions, penalty spends, anything that can only be
    /// published once and is final the moment it is valid.
    Final(Transaction),
    /// A transaction the publisher may fee-bump (via RBF) until it
    /// confirms or is cancelled, aiming for `target`.
    Replaceable { transaction: Transaction, target: ConfirmationTarget },
}

/// Collaborator interface a channel actor drives to get transactions onto
/// the chain. The publisher promises at-least-once publication with RBF
/// until either confirmation or explicit cancellation; this crate only
/// issues commands and reacts to whatever [`crate::chain_iface`] later
/// reports confirmed.
pub trait Publisher {
    fn publish_final_tx(&mut self, tx: Transaction);
    fn publish_replaceable_tx(&mut self, tx: Transaction, target: ConfirmationTarget);
    /// Stops fee-bumping a previously submitted replaceable transaction,
    /// e.g. because a racing alternative commitment confirmed first.
    fn cancel(&mut self, txid: bitcoin::Txid);
}

/// An in-memory queue of not-yet-dispatched [`PublishCommand`]s, useful
/// for tests and as the outbox half of a real [`Publisher`]
/// implementation.
#[derive(Clone, Debug, Default)]
pub struct PublishQueue {
    queue: Vec<PublishCommand>,
}

impl PublishQueue {
    pub fn push_final(&mut self, tx: Transaction) {
        self.queue.push(PublishCommand::Final(tx));
    }

    pub fn push_replaceable(&mut self, tx: Transaction, target: ConfirmationTarget) {
        self.queue
            .push(PublishCommand::Replaceable { transaction: tx, target });
    }

    pub fn drain(&mut self) -> Vec<PublishCommand> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod test {
    use bitcoin::PackedLockTime;

    use super::*;

    fn dummy_tx() -> Transaction {
        Transaction {
            version: 2,
            lock_time: PackedLockTime(0),
            input: vec![],
            output: vec![],
        }
    }

    #[test]
    fn queued_commands_drain_in_order() {
        let mut queue = PublishQueue::default();
        queue.push_final(dummy_tx());
        queue.push_replaceable(dummy_tx(), ConfirmationTarget::Absolute(100));
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], PublishCommand::Final(_)));
        assert!(matches!(drained[1], PublishCommand::Replaceable { .. }));
        assert!(queue.drain().is_empty());
    }
}
