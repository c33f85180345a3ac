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

//! The top-level channel state machine: the finite set of lifecycle states
//! a channel passes through, the `Normal`-state splicing/RBF sub-states,
//! and the owned value (`Channel`) a single actor mutates end to end.

pub mod reestablish;

pub use reestablish::{compute_retransmissions, ReestablishError, RetransmitAction};

use crate::commitment::CommitmentSet;
use crate::params::{ChannelKeys, ChannelParameters};
use crate::wire::ChannelId;

/// Splicing sub-state tracked only while [`Lifecycle::Normal`].
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum SpliceState {
    NoSplice,
    SpliceRequested,
    SpliceInProgress,
    SpliceWaitingForSigs,
}

impl Default for SpliceState {
    fn default() -> Self {
        SpliceState::NoSplice
    }
}

/// RBF sub-state tracked only while [`Lifecycle::Normal`], structurally
/// identical to [`SpliceState`] but kept distinct since the two exclusive
/// operations may not run concurrently and have independently-named states
/// in the wire protocol.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[display(Debug)]
pub enum RbfState {
    NoRbf,
    RbfRequested,
    RbfInProgress,
    RbfWaitingForSigs,
}

impl Default for RbfState {
    fn default() -> Self {
        RbfState::NoRbf
    }
}

/// The channel's top-level finite state, per spec.md 4.3. Each variant
/// holds exactly the data relevant to it rather than leaving unrelated
/// fields present-but-meaningless.
#[derive(Clone, PartialEq, Debug, Display)]
#[display(Debug)]
pub enum Lifecycle {
    Opening,
    AwaitingFundingConfirmation,
    AwaitingChannelReady,
    Normal { splice: SpliceState, rbf: RbfState },
    Shutdown,
    Negotiating,
    Closing,
    ForceClosing,
    Closed,
    Offline { resume: Box<Lifecycle> },
}

impl Lifecycle {
    pub fn normal() -> Self {
        Lifecycle::Normal {
            splice: SpliceState::default(),
            rbf: RbfState::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Opening => "Opening",
            Lifecycle::AwaitingFundingConfirmation => "AwaitingFundingConfirmation",
            Lifecycle::AwaitingChannelReady => "AwaitingChannelReady",
            Lifecycle::Normal { .. } => "Normal",
            Lifecycle::Shutdown => "Shutdown",
            Lifecycle::Negotiating => "Negotiating",
            Lifecycle::Closing => "Closing",
            Lifecycle::ForceClosing => "ForceClosing",
            Lifecycle::Closed => "Closed",
            Lifecycle::Offline { .. } => "Offline",
        }
    }

    /// `true` once no further state transition will ever be observed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Lifecycle::Closed)
    }
}

/// Everything that survives a disconnect: lifecycle, parameters, keys and
/// the commitment set. Persisted as a whole after every transition that
/// could expose the node to fund loss if replayed incorrectly.
#[derive(Clone, Debug)]
pub struct ChannelState {
    pub channel_id: Option<ChannelId>,
    pub lifecycle: Lifecycle,
    pub params: ChannelParameters,
    pub keys: ChannelKeys,
    pub commitments: CommitmentSet,
}

impl ChannelState {
    pub fn new(
        params: ChannelParameters,
        keys: ChannelKeys,
        commitments: CommitmentSet,
    ) -> Self {
        ChannelState {
            channel_id: None,
            lifecycle: Lifecycle::Opening,
            params,
            keys,
            commitments,
        }
    }

    /// Goes offline without losing any sub-state, wrapping whatever
    /// lifecycle was active so it resumes verbatim on reconnect.
    pub fn disconnect(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Offline { .. }) {
            info!("channel {:?} going offline from {}", self.channel_id, self.lifecycle.name());
            let resume = std::mem::replace(&mut self.lifecycle, Lifecycle::Closed);
            self.lifecycle = Lifecycle::Offline {
                resume: Box::new(resume),
            };
        }
    }

    /// Restores the lifecycle that was active before [`Self::disconnect`].
    pub fn reconnect(&mut self) {
        if let Lifecycle::Offline { resume } = std::mem::replace(&mut self.lifecycle, Lifecycle::Closed) {
            info!("channel {:?} reconnecting into {}", self.channel_id, resume.name());
            self.lifecycle = *resume;
        }
    }

    /// Rejects any attempt to add a new HTLC while a splice or RBF round
    /// has not yet fully quiesced, or while offline.
    pub fn accepts_new_htlcs(&self) -> bool {
        matches!(
            &self.lifecycle,
            Lifecycle::Normal { splice, rbf }
                if *splice == SpliceState::NoSplice && *rbf == RbfState::NoRbf
        ) && !self.commitments.splice_quiescent
    }
}

/// A channel actor: the single owner of a [`ChannelState`], driven to
/// completion one inbound message or local command at a time. Thin by
/// design — the state transition logic itself lives in the cooperating
/// modules ([`crate::commitment`], [`crate::funding`], [`crate::forceclose`]);
/// this type only threads the current state through them.
#[derive(Clone, Debug)]
pub struct Channel {
    pub state: ChannelState,
}

impl Channel {
    pub fn new(state: ChannelState) -> Self {
        Channel { state }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.state.lifecycle
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn offline_then_reconnect_restores_normal_substates() {
        let mut lifecycle = Lifecycle::Normal {
            splice: SpliceState::SpliceInProgress,
            rbf: RbfState::NoRbf,
        };
        let mut state = ChannelState {
            channel_id: None,
            lifecycle: lifecycle.clone(),
            params: dummy_params(),
            keys: dummy_keys(),
            commitments: dummy_commitments(),
        };
        state.disconnect();
        assert_eq!(state.lifecycle.name(), "Offline");
        state.reconnect();
        lifecycle = Lifecycle::Normal {
            splice: SpliceState::SpliceInProgress,
            rbf: RbfState::NoRbf,
        };
        assert_eq!(state.lifecycle, lifecycle);
    }

    #[test]
    fn new_htlcs_forbidden_outside_quiescent_normal() {
        let mut state = ChannelState {
            channel_id: None,
            lifecycle: Lifecycle::Normal {
                splice: SpliceState::SpliceRequested,
                rbf: RbfState::NoRbf,
            },
            params: dummy_params(),
            keys: dummy_keys(),
            commitments: dummy_commitments(),
        };
        assert!(!state.accepts_new_htlcs());
        state.lifecycle = Lifecycle::normal();
        assert!(state.accepts_new_htlcs());
    }

    fn dummy_params() -> ChannelParameters {
        use crate::policy::{CommonParams, PeerParams};
        ChannelParameters {
            common: CommonParams::default(),
            local: PeerParams::default(),
            remote: PeerParams::default(),
            format: crate::params::CommitmentFormat::DefaultSegwit,
            is_outbound: true,
        }
    }

    fn dummy_keys() -> ChannelKeys {
        use amplify::DumbDefault;
        ChannelKeys {
            local: DumbDefault::dumb_default(),
            remote: DumbDefault::dumb_default(),
        }
    }

    fn dummy_commitments() -> CommitmentSet {
        use crate::commitment_spec::CommitmentSpec;
        CommitmentSet::new(dummy_params(), CommitmentSpec::new(5000, 500_000_000, 500_000_000))
    }
}
