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

use crate::channel::ReestablishError;
use crate::commitment::UpdateError;
use crate::forceclose::ForceCloseError;
use crate::funding::InteractiveTxError;
use crate::policy::PolicyError;
use crate::txbuilder::TxBuilderError;

/// Aggregate error type for the engine. Each module keeps its own
/// fine-grained error enum; this type only composes them so that a
/// collaborator driving several modules can propagate a single `Result`.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum Error {
    /// error building a channel transaction: {0}
    #[from]
    #[display(inner)]
    TxBuilder(TxBuilderError),

    /// error applying a commitment update: {0}
    #[from]
    #[display(inner)]
    Update(UpdateError),

    /// policy rejected the proposed channel parameters: {0}
    #[from]
    #[display(inner)]
    Policy(PolicyError),

    /// error during channel re-establishment: {0}
    #[from]
    #[display(inner)]
    Reestablish(ReestablishError),

    /// error in the interactive funding session: {0}
    #[from]
    #[display(inner)]
    InteractiveTx(InteractiveTxError),

    /// error while reacting to a force-close: {0}
    #[from]
    #[display(inner)]
    ForceClose(ForceCloseError),

    /// channel is in lifecycle state {current} which does not permit the
    /// requested operation; one of {required:#?} is needed
    LifecycleMismatch {
        current: &'static str,
        required: &'static [&'static str],
    },

    /// the channel has no assigned permanent channel id yet
    NoChannelId,
}
