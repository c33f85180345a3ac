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

//! Immutable per-channel parameters agreed at opening, and the enumerated
//! commitment format that selects script shapes and signing rules.

use crate::keys::{LocalKeyset, RemoteKeyset};
use crate::policy::{CommonParams, PeerParams};

/// Which BOLT-3 output shapes and second-stage signing rules this channel
/// uses. Selected once at opening time via `channel_type` and never changes.
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Display, StrictEncode, StrictDecode,
)]
#[display(Debug)]
pub enum CommitmentFormat {
    /// `option_static_remotekey` off or on, no anchors: `to_remote` is a
    /// plain key-path payment, second-stage transactions pay their own fee.
    DefaultSegwit,

    /// `option_anchors`: `to_remote` is CSV(1)-delayed, both parties get a
    /// 330-satoshi anchor, second-stage transactions still pay a market
    /// fee.
    AnchorOutputs,

    /// `option_anchors_zero_fee_htlc_tx`: as [`Self::AnchorOutputs`] but
    /// second-stage transactions carry zero absolute fee and rely entirely
    /// on child-pays-for-parent.
    ZeroFeeAnchorOutputs,

    /// `option_taproot`/`option_simple_taproot`: 2-of-2 MuSig2 funding
    /// output, script-path BIP-341 commitment outputs.
    Taproot,
}

impl CommitmentFormat {
    /// `true` for the two formats that carry per-party anchor outputs.
    pub fn has_anchors(self) -> bool {
        matches!(
            self,
            CommitmentFormat::AnchorOutputs
                | CommitmentFormat::ZeroFeeAnchorOutputs
                | CommitmentFormat::Taproot
        )
    }

    /// `true` when second-stage HTLC transactions are built with zero
    /// absolute fee.
    pub fn zero_fee_htlc_tx(self) -> bool {
        matches!(self, CommitmentFormat::ZeroFeeAnchorOutputs)
    }

    pub fn is_taproot(self) -> bool {
        matches!(self, CommitmentFormat::Taproot)
    }

    /// Value of each anchor output under formats that carry one.
    pub fn anchor_sat(self) -> u64 {
        330
    }
}

/// Everything agreed at channel opening that never changes afterwards:
/// BOLT-2's [`CommonParams`] plus each side's [`PeerParams`] plus each
/// side's basepoints.
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct ChannelParameters {
    pub common: CommonParams,
    pub local: PeerParams,
    pub remote: PeerParams,
    pub format: CommitmentFormat,
    pub is_outbound: bool,
}

impl ChannelParameters {
    /// The dust limit that applies to outputs on a transaction broadcast by
    /// `side`: BOLT-3 says each side uses *its own* dust limit for its own
    /// commitment.
    pub fn dust_limit(&self, broadcaster_is_local: bool) -> u64 {
        if broadcaster_is_local {
            self.local.dust_limit_satoshis
        } else {
            self.remote.dust_limit_satoshis
        }
    }

    pub fn to_self_delay(&self, broadcaster_is_local: bool) -> u16 {
        if broadcaster_is_local {
            self.local.to_self_delay
        } else {
            self.remote.to_self_delay
        }
    }

    pub fn reserve(&self, side_is_local: bool) -> u64 {
        if side_is_local {
            // our reserve is requested by the remote party
            self.remote.channel_reserve_satoshis
        } else {
            self.local.channel_reserve_satoshis
        }
    }
}

/// Both parties' public basepoints, carried alongside [`ChannelParameters`]
/// but kept separate since they are mutated far less often than the
/// commitment set and are reused verbatim for every construction call.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChannelKeys {
    pub local: LocalKeyset,
    pub remote: RemoteKeyset,
}
