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

//! In-flight payment obligations and their direction relative to the local
//! party.

use amplify::Wrapper;
use secp256k1::PublicKey;

/// Per-direction HTLC identifier, strictly increasing as assigned by
/// whichever side proposed the HTLC.
#[derive(
    Wrapper,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Display,
    Default,
    From,
    StrictEncode,
    StrictDecode,
    LightningEncode,
    LightningDecode,
)]
#[display(inner)]
pub struct HtlcId(u64);

impl HtlcId {
    pub fn next(self) -> HtlcId {
        HtlcId(self.0 + 1)
    }
}

/// Which side of the channel proposed an HTLC, from the local party's point
/// of view.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, StrictEncode, StrictDecode)]
#[display(Debug)]
pub enum Direction {
    /// We offered the HTLC; it is an offered (`to_local`-reducing) output
    /// on our commitment.
    Outgoing,
    /// The remote party offered the HTLC; an incoming payment from our
    /// point of view.
    Incoming,
}

impl Direction {
    pub fn is_outgoing(self) -> bool {
        matches!(self, Direction::Outgoing)
    }

    /// From the opposite party's point of view the same HTLC has the
    /// opposite direction.
    pub fn flipped(self) -> Direction {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
        }
    }
}

/// An in-flight payment obligation. Amounts and ids survive unchanged
/// across signing rounds; only `state` inside [`crate::commitment::Update`]
/// changes.
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct Htlc {
    pub id: HtlcId,
    pub amount_msat: u64,
    pub payment_hash: [u8; 32],
    pub cltv_expiry: u32,
    pub onion_routing_packet: Vec<u8>,
    pub blinding_point: Option<PublicKey>,
}

impl Htlc {
    /// `true` once `amount_msat` after subtracting the weight-proportional
    /// fee share would fall below `dust_limit`, per BOLT-3's trimming rule
    /// — but that arithmetic needs the commitment feerate and output
    /// weight, so callers should use
    /// [`crate::commitment_spec::CommitmentSpec::is_htlc_trimmed`] instead
    /// of duplicating it here.
    pub fn htlc_timeout_weight(is_anchor: bool) -> u64 {
        if is_anchor {
            666
        } else {
            663
        }
    }

    pub fn htlc_success_weight(is_anchor: bool) -> u64 {
        if is_anchor {
            706
        } else {
            703
        }
    }
}

/// An [`Htlc`] tagged with its direction from the local party's point of
/// view, the unit the commitment spec and transaction builder operate on.
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct DirectedHtlc {
    pub htlc: Htlc,
    pub direction: Direction,
}

impl DirectedHtlc {
    pub fn new(htlc: Htlc, direction: Direction) -> Self {
        DirectedHtlc { htlc, direction }
    }

    pub fn id(&self) -> HtlcId {
        self.htlc.id
    }

    pub fn amount_msat(&self) -> u64 {
        self.htlc.amount_msat
    }
}
