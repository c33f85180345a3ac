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

//! The BOLT-2/BOLT-3 wire messages this engine consumes and produces, plus
//! their splice/RBF/`stfu` extensions. Framing (length-prefixing, transport
//! encryption, message-type dispatch) is the peer transport collaborator's
//! job; this module only defines the TLV-encoded message bodies.

use amplify::{DumbDefault, Slice32, Wrapper};
use bitcoin::{OutPoint, Txid};
use bitcoin_scripts::PubkeyScript;
use secp256k1::ecdsa::Signature;
use secp256k1::PublicKey;

use crate::htlc::HtlcId;

/// Legacy lightning network channel id: funding txid XOR'ed with the
/// big-endian funding output index.
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
    LightningEncode,
    LightningDecode,
    StrictEncode,
    StrictDecode,
)]
#[display(LowerHex)]
#[wrapper(FromStr, LowerHex, UpperHex)]
pub struct ChannelId(Slice32);

impl ChannelId {
    pub fn with(funding_outpoint: OutPoint) -> Self {
        use bitcoin::hashes::Hash;
        let mut slice: [u8; 32] = funding_outpoint.txid.into_inner();
        let vout = funding_outpoint.vout.to_be_bytes();
        slice[30] ^= vout[0];
        slice[31] ^= vout[1];
        ChannelId::from_inner(Slice32::from_inner(slice))
    }

    /// An all-zero channel id is a wildcard meaning "every channel with this
    /// peer" in `error`/`warning` messages.
    pub fn is_wildcard(&self) -> bool {
        self.to_inner().to_inner() == [0u8; 32]
    }
}

/// Temporary channel id used before the funding outpoint (and thus the
/// permanent [`ChannelId`]) is known.
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
    From,
    LightningEncode,
    LightningDecode,
    StrictEncode,
    StrictDecode,
)]
#[display(LowerHex)]
#[wrapper(FromStr, LowerHex, UpperHex)]
pub struct TempChannelId(Slice32);

impl TempChannelId {
    pub fn random() -> Self {
        TempChannelId::from_inner(Slice32::random())
    }
}

impl DumbDefault for TempChannelId {
    fn dumb_default() -> Self {
        TempChannelId::from_inner(Slice32::from_inner([0u8; 32]))
    }
}

impl From<TempChannelId> for ChannelId {
    fn from(temp: TempChannelId) -> Self {
        Self(temp.into_inner())
    }
}

impl From<ChannelId> for TempChannelId {
    fn from(id: ChannelId) -> Self {
        Self(id.into_inner())
    }
}

/// The persistent channel features negotiated at opening, reused verbatim
/// on every reconnection as `channel_type`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Debug, Display, Default,
    LightningEncode, LightningDecode, StrictEncode, StrictDecode,
)]
#[display(Debug)]
pub enum ChannelType {
    #[default]
    Basic,
    StaticRemotekey,
    AnchorOutputsStaticRemotekey,
    AnchorsZeroFeeHtlcTxStaticRemotekey,
}

impl ChannelType {
    pub fn has_static_remotekey(self) -> bool {
        self != ChannelType::Basic
    }

    pub fn commitment_format(self) -> crate::params::CommitmentFormat {
        use crate::params::CommitmentFormat::*;
        match self {
            ChannelType::Basic | ChannelType::StaticRemotekey => DefaultSegwit,
            ChannelType::AnchorOutputsStaticRemotekey => AnchorOutputs,
            ChannelType::AnchorsZeroFeeHtlcTxStaticRemotekey => {
                ZeroFeeAnchorOutputs
            }
        }
    }
}

/// First step of single-funded channel opening.
#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[lightning_encoding(use_tlv)]
#[display("open_channel({temporary_channel_id}, {funding_satoshis}, ...)")]
pub struct OpenChannel {
    pub chain_hash: Slice32,
    pub temporary_channel_id: TempChannelId,
    pub funding_satoshis: u64,
    pub push_msat: u64,
    pub dust_limit_satoshis: u64,
    pub max_htlc_value_in_flight_msat: u64,
    pub channel_reserve_satoshis: u64,
    pub htlc_minimum_msat: u64,
    pub feerate_per_kw: u32,
    pub to_self_delay: u16,
    pub max_accepted_htlcs: u16,
    pub funding_pubkey: PublicKey,
    pub revocation_basepoint: PublicKey,
    pub payment_point: PublicKey,
    pub delayed_payment_basepoint: PublicKey,
    pub htlc_basepoint: PublicKey,
    pub first_per_commitment_point: PublicKey,
    pub channel_flags: u8,
    #[lightning_encoding(tlv = 0)]
    pub shutdown_scriptpubkey: Option<PubkeyScript>,
    #[lightning_encoding(tlv = 1)]
    pub channel_type: Option<ChannelType>,
}

impl OpenChannel {
    pub fn should_announce_channel(&self) -> bool {
        self.channel_flags & 0x01 == 0x01
    }
}

impl DumbDefault for OpenChannel {
    fn dumb_default() -> Self {
        OpenChannel {
            chain_hash: Slice32::from_inner([0u8; 32]),
            temporary_channel_id: TempChannelId::dumb_default(),
            funding_satoshis: 0,
            push_msat: 0,
            dust_limit_satoshis: 0,
            max_htlc_value_in_flight_msat: 0,
            channel_reserve_satoshis: 0,
            htlc_minimum_msat: 0,
            feerate_per_kw: 0,
            to_self_delay: 0,
            max_accepted_htlcs: 0,
            funding_pubkey: dumb_pubkey!(),
            revocation_basepoint: dumb_pubkey!(),
            payment_point: dumb_pubkey!(),
            delayed_payment_basepoint: dumb_pubkey!(),
            htlc_basepoint: dumb_pubkey!(),
            first_per_commitment_point: dumb_pubkey!(),
            channel_flags: 0,
            shutdown_scriptpubkey: None,
            channel_type: None,
        }
    }
}

/// Reply to [`OpenChannel`] accepting the proposed parameters.
#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[lightning_encoding(use_tlv)]
#[display("accept_channel({temporary_channel_id}, ...)")]
pub struct AcceptChannel {
    pub temporary_channel_id: TempChannelId,
    pub dust_limit_satoshis: u64,
    pub max_htlc_value_in_flight_msat: u64,
    pub channel_reserve_satoshis: u64,
    pub htlc_minimum_msat: u64,
    pub minimum_depth: u32,
    pub to_self_delay: u16,
    pub max_accepted_htlcs: u16,
    pub funding_pubkey: PublicKey,
    pub revocation_basepoint: PublicKey,
    pub payment_point: PublicKey,
    pub delayed_payment_basepoint: PublicKey,
    pub htlc_basepoint: PublicKey,
    pub first_per_commitment_point: PublicKey,
    #[lightning_encoding(tlv = 0)]
    pub shutdown_scriptpubkey: Option<PubkeyScript>,
    #[lightning_encoding(tlv = 1)]
    pub channel_type: Option<ChannelType>,
}

impl DumbDefault for AcceptChannel {
    fn dumb_default() -> Self {
        AcceptChannel {
            temporary_channel_id: TempChannelId::dumb_default(),
            dust_limit_satoshis: 0,
            max_htlc_value_in_flight_msat: 0,
            channel_reserve_satoshis: 0,
            htlc_minimum_msat: 0,
            minimum_depth: 0,
            to_self_delay: 0,
            max_accepted_htlcs: 0,
            funding_pubkey: dumb_pubkey!(),
            revocation_basepoint: dumb_pubkey!(),
            payment_point: dumb_pubkey!(),
            delayed_payment_basepoint: dumb_pubkey!(),
            htlc_basepoint: dumb_pubkey!(),
            first_per_commitment_point: dumb_pubkey!(),
            shutdown_scriptpubkey: None,
            channel_type: None,
        }
    }
}

/// `open_channel2`: the dual-funding counterpart of [`OpenChannel`], adding
/// the fields needed to seed an interactive funding session instead of a
/// single funder-pays-all transaction.
#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[lightning_encoding(use_tlv)]
#[display("open_channel2({temporary_channel_id}, {funding_satoshis}, ...)")]
pub struct OpenChannel2 {
    pub chain_hash: Slice32,
    pub temporary_channel_id: TempChannelId,
    pub funding_feerate_per_kw: u32,
    pub commitment_feerate_per_kw: u32,
    pub funding_satoshis: u64,
    pub dust_limit_satoshis: u64,
    pub max_htlc_value_in_flight_msat: u64,
    pub htlc_minimum_msat: u64,
    pub to_self_delay: u16,
    pub max_accepted_htlcs: u16,
    pub locktime: u32,
    pub funding_pubkey: PublicKey,
    pub revocation_basepoint: PublicKey,
    pub payment_point: PublicKey,
    pub delayed_payment_basepoint: PublicKey,
    pub htlc_basepoint: PublicKey,
    pub first_per_commitment_point: PublicKey,
    pub second_per_commitment_point: PublicKey,
    pub channel_flags: u8,
    #[lightning_encoding(tlv = 0)]
    pub shutdown_scriptpubkey: Option<PubkeyScript>,
    #[lightning_encoding(tlv = 1)]
    pub channel_type: Option<ChannelType>,
    #[lightning_encoding(tlv = 2)]
    pub require_confirmed_inputs: Option<()>,
}

/// Reply to [`OpenChannel2`].
#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[lightning_encoding(use_tlv)]
#[display("accept_channel2({temporary_channel_id}, ...)")]
pub struct AcceptChannel2 {
    pub temporary_channel_id: TempChannelId,
    pub funding_satoshis: u64,
    pub dust_limit_satoshis: u64,
    pub max_htlc_value_in_flight_msat: u64,
    pub htlc_minimum_msat: u64,
    pub minimum_depth: u32,
    pub to_self_delay: u16,
    pub max_accepted_htlcs: u16,
    pub funding_pubkey: PublicKey,
    pub revocation_basepoint: PublicKey,
    pub payment_point: PublicKey,
    pub delayed_payment_basepoint: PublicKey,
    pub htlc_basepoint: PublicKey,
    pub first_per_commitment_point: PublicKey,
    pub second_per_commitment_point: PublicKey,
    #[lightning_encoding(tlv = 0)]
    pub shutdown_scriptpubkey: Option<PubkeyScript>,
    #[lightning_encoding(tlv = 1)]
    pub channel_type: Option<ChannelType>,
    #[lightning_encoding(tlv = 2)]
    pub require_confirmed_inputs: Option<()>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("funding_created({temporary_channel_id}, {funding_txid}:{funding_output_index})")]
pub struct FundingCreated {
    pub temporary_channel_id: TempChannelId,
    pub funding_txid: Txid,
    pub funding_output_index: u16,
    pub signature: Signature,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("funding_signed({channel_id})")]
pub struct FundingSigned {
    pub channel_id: ChannelId,
    pub signature: Signature,
}

/// Sent once the funding transaction reaches `minimum_depth`. Named
/// `channel_ready` in modern BOLT-2 (was `funding_locked`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("channel_ready({channel_id})")]
pub struct ChannelReady {
    pub channel_id: ChannelId,
    pub next_per_commitment_point: PublicKey,
}

/// Interactive-tx construction: contribute an input. `serial_id` parity
/// identifies the contributor (even = initiator, odd = acceptor).
#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_add_input({channel_id}, {serial_id})")]
pub struct TxAddInput {
    pub channel_id: ChannelId,
    pub serial_id: u64,
    pub prevtx: Vec<u8>,
    pub prevtx_vout: u32,
    pub sequence: u32,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_add_output({channel_id}, {serial_id}, {sats})")]
pub struct TxAddOutput {
    pub channel_id: ChannelId,
    pub serial_id: u64,
    pub sats: u64,
    pub script: PubkeyScript,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_remove_input({channel_id}, {serial_id})")]
pub struct TxRemoveInput {
    pub channel_id: ChannelId,
    pub serial_id: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_remove_output({channel_id}, {serial_id})")]
pub struct TxRemoveOutput {
    pub channel_id: ChannelId,
    pub serial_id: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_complete({channel_id})")]
pub struct TxComplete {
    pub channel_id: ChannelId,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_signatures({channel_id}, {tx_hash})")]
pub struct TxSignatures {
    pub channel_id: ChannelId,
    pub tx_hash: Txid,
    pub witnesses: Vec<Vec<Vec<u8>>>,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_abort({channel_id}, {data:?})")]
pub struct TxAbort {
    pub channel_id: ChannelId,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_init_rbf({channel_id}, {locktime}, {funding_feerate_per_kw})")]
pub struct TxInitRbf {
    pub channel_id: ChannelId,
    pub locktime: u32,
    pub funding_feerate_per_kw: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("tx_ack_rbf({channel_id})")]
pub struct TxAckRbf {
    pub channel_id: ChannelId,
}

/// `update_add_htlc`: the fixed fields plus the 1366-byte opaque
/// onion routing packet this engine forwards without interpreting.
#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("update_add_htlc({channel_id}, {htlc_id}, {amount_msat})")]
pub struct UpdateAddHtlc {
    pub channel_id: ChannelId,
    pub htlc_id: HtlcId,
    pub amount_msat: u64,
    pub payment_hash: [u8; 32],
    pub cltv_expiry: u32,
    pub onion_routing_packet: Vec<u8>,
    #[lightning_encoding(tlv = 0)]
    pub blinding_point: Option<PublicKey>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("update_fulfill_htlc({channel_id}, {htlc_id})")]
pub struct UpdateFulfillHtlc {
    pub channel_id: ChannelId,
    pub htlc_id: HtlcId,
    pub payment_preimage: [u8; 32],
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("update_fail_htlc({channel_id}, {htlc_id})")]
pub struct UpdateFailHtlc {
    pub channel_id: ChannelId,
    pub htlc_id: HtlcId,
    pub reason: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("update_fail_malformed_htlc({channel_id}, {htlc_id})")]
pub struct UpdateFailMalformedHtlc {
    pub channel_id: ChannelId,
    pub htlc_id: HtlcId,
    pub sha256_of_onion: [u8; 32],
    pub failure_code: u16,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("update_fee({channel_id}, {feerate_per_kw})")]
pub struct UpdateFee {
    pub channel_id: ChannelId,
    pub feerate_per_kw: u32,
}

/// Signs the counterparty's next commitment. `htlc_signatures` carries one
/// signature per non-dust HTLC output, in the same order as the commitment
/// transaction's outputs. `batch_size` (present only during splicing, when
/// several active commitments are signed atomically) says how many
/// `commit_sig` messages make up this logical batch.
#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[lightning_encoding(use_tlv)]
#[display("commit_sig({channel_id})")]
pub struct CommitSig {
    pub channel_id: ChannelId,
    pub signature: Signature,
    pub htlc_signatures: Vec<Signature>,
    #[lightning_encoding(tlv = 0)]
    pub batch_size: Option<u16>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("revoke_and_ack({channel_id})")]
pub struct RevokeAndAck {
    pub channel_id: ChannelId,
    pub per_commitment_secret: [u8; 32],
    pub next_per_commitment_point: PublicKey,
}

/// Quiescence marker: once sent, no new `update_add_htlc` is accepted until
/// the splice or other exclusive operation concludes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("stfu({channel_id}, initiator={initiator})")]
pub struct Stfu {
    pub channel_id: ChannelId,
    pub initiator: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("splice_init({channel_id}, {funding_contribution_satoshis})")]
pub struct SpliceInit {
    pub channel_id: ChannelId,
    pub funding_contribution_satoshis: i64,
    pub funding_feerate_per_kw: u32,
    pub locktime: u32,
    pub funding_pubkey: PublicKey,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("splice_ack({channel_id}, {funding_contribution_satoshis})")]
pub struct SpliceAck {
    pub channel_id: ChannelId,
    pub funding_contribution_satoshis: i64,
    pub funding_pubkey: PublicKey,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("splice_locked({channel_id}, {splice_txid})")]
pub struct SpliceLocked {
    pub channel_id: ChannelId,
    pub splice_txid: Txid,
}

/// Sent upon reconnection to resynchronize retransmission state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[lightning_encoding(use_tlv)]
#[display("channel_reestablish({channel_id}, next_local={next_local_commitment_number})")]
pub struct ChannelReestablish {
    pub channel_id: ChannelId,
    pub next_local_commitment_number: u64,
    pub next_remote_commitment_number: u64,
    pub your_last_per_commitment_secret: [u8; 32],
    pub my_current_per_commitment_point: PublicKey,
    #[lightning_encoding(tlv = 0)]
    pub next_funding_txid: Option<Txid>,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("shutdown({channel_id})")]
pub struct Shutdown {
    pub channel_id: ChannelId,
    pub scriptpubkey: PubkeyScript,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("closing_signed({channel_id}, {fee_satoshis})")]
pub struct ClosingSigned {
    pub channel_id: ChannelId,
    pub fee_satoshis: u64,
    pub signature: Signature,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("warning({channel_id}, {data:?})")]
pub struct Warning {
    pub channel_id: ChannelId,
    pub data: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Debug, Display, LightningEncode, LightningDecode)]
#[display("error({channel_id}, {data:?})")]
pub struct ErrorMessage {
    pub channel_id: ChannelId,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;

    use super::*;

    #[test]
    fn channel_id_xors_vout_into_txid() {
        let txid = Txid::from_slice(&[0x11u8; 32]).unwrap();
        let outpoint = OutPoint::new(txid, 1);
        let id = ChannelId::with(outpoint);
        let mut expected = [0x11u8; 32];
        expected[31] ^= 1;
        assert_eq!(id.to_inner().to_inner(), expected);
    }

    #[test]
    fn wildcard_channel_id_is_all_zero() {
        assert!(ChannelId::default().is_wildcard());
    }
}
