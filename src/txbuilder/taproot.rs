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

//! `option_taproot` commitment outputs: a MuSig2-aggregated 2-of-2 funding
//! key and a BIP-341 script tree per output, with the revocation pubkey as
//! the tree's internal key so the revocation path is always a cheap
//! key-path spend rather than a script-path reveal.
//!
//! The delay/preimage/timeout conditions that segwit v0 encodes as
//! `OP_IF`/`OP_ELSE` branches inside one P2WSH script become separate
//! tapscript leaves here: each leaf is a single spending condition, and the
//! revocation case never touches the script tree at all.

use bitcoin::blockdata::opcodes::all::*;
use bitcoin::blockdata::script;
use bitcoin::util::taproot::{TaprootBuilder, TaprootSpendInfo};
use bitcoin::{Script, TxOut};
use musig2::KeyAggContext;
use secp256k1::{PublicKey, XOnlyPublicKey};

use crate::commitment_spec::CommitmentSpec;
use crate::htlc::Direction;
use crate::txbuilder::commitment::{sort_outputs, CommitmentOutput};

/// Aggregates the two funding basepoints into the single MuSig2 public key
/// that the Taproot funding output's key path spends. BIP-69 lexicographic
/// ordering does not apply here — MuSig2 key aggregation is order-sensitive
/// by design, so both sides must aggregate in the same, channel-wide-fixed
/// order (lesser-serialization-first, to match the non-Taproot formats'
/// convention) rather than the order either side happens to call this in.
pub fn aggregate_funding_key(
    pubkey1: PublicKey,
    pubkey2: PublicKey,
) -> Result<XOnlyPublicKey, TaprootError> {
    let (a, b) = if pubkey1.serialize() <= pubkey2.serialize() {
        (pubkey1, pubkey2)
    } else {
        (pubkey2, pubkey1)
    };
    let ctx = KeyAggContext::new(vec![a, b]).map_err(|_| TaprootError::KeyAggregation)?;
    Ok(XOnlyPublicKey::from(ctx.aggregated_pubkey::<PublicKey>()))
}

/// Errors from Taproot output construction. Kept distinct from
/// [`crate::txbuilder::TxBuilderError`] since these are about key/script
/// assembly rather than dust-limit arithmetic.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum TaprootError {
    /// MuSig2 key aggregation of the two funding basepoints failed
    KeyAggregation,

    /// assembling the BIP-341 script tree failed
    TreeAssembly,
}

fn leaf_script_to_local(local_delayedpubkey: PublicKey, to_self_delay: u16) -> Script {
    script::Builder::new()
        .push_int(to_self_delay as i64)
        .push_opcode(OP_CSV)
        .push_opcode(OP_DROP)
        .push_x_only_key(&XOnlyPublicKey::from(local_delayedpubkey))
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

fn leaf_offered_htlc(remote_htlcpubkey: PublicKey, payment_hash: [u8; 32]) -> Script {
    script::Builder::new()
        .push_opcode(OP_HASH160)
        .push_slice(&payment_hash[..20])
        .push_opcode(OP_EQUALVERIFY)
        .push_x_only_key(&XOnlyPublicKey::from(remote_htlcpubkey))
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

fn leaf_received_htlc(
    remote_htlcpubkey: PublicKey,
    cltv_expiry: u32,
    payment_hash: [u8; 32],
) -> Script {
    script::Builder::new()
        .push_opcode(OP_HASH160)
        .push_slice(&payment_hash[..20])
        .push_opcode(OP_EQUALVERIFY)
        .push_int(cltv_expiry as i64)
        .push_opcode(OP_CLTV)
        .push_opcode(OP_DROP)
        .push_x_only_key(&XOnlyPublicKey::from(remote_htlcpubkey))
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

fn leaf_anchor(funding_pubkey: PublicKey) -> Script {
    script::Builder::new()
        .push_x_only_key(&XOnlyPublicKey::from(funding_pubkey))
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

fn leaf_to_remote(remote_pubkey: PublicKey) -> Script {
    script::Builder::new()
        .push_x_only_key(&XOnlyPublicKey::from(remote_pubkey))
        .push_opcode(OP_CHECKSIGVERIFY)
        .push_int(1)
        .push_opcode(OP_CSV)
        .into_script()
}

/// BIP-341's published unspendable NUMS point, used as the internal key for
/// outputs (`to_remote`, the per-party anchor) that have no revocation
/// condition of their own: with no known discrete log for this point, the
/// key path can never be taken, so the CSV delay baked into the single
/// tapscript leaf is the only way in.
fn unspendable_internal_key() -> XOnlyPublicKey {
    XOnlyPublicKey::from_slice(&[
        0x50, 0x92, 0x9b, 0x74, 0xc1, 0xa0, 0x49, 0x54, 0xb7, 0x8b, 0x4b, 0x60,
        0x35, 0xe9, 0x7a, 0x5e, 0x07, 0x8a, 0x5a, 0x0f, 0x28, 0xec, 0x96, 0xd5,
        0x47, 0xbf, 0xee, 0x9a, 0xce, 0x80, 0x3a, 0xc0,
    ])
    .expect("hardcoded BIP-341 NUMS point is a valid x-only key")
}

/// Builds a one-or-two-leaf tree rooted at `internal_key` and wraps the
/// result into the P2TR [`TxOut`] the commitment transaction carries.
/// `internal_key` is always the revocation pubkey: revocation is then a
/// plain key-path spend, and every other spending path is a tapscript leaf.
fn taproot_txout(
    amount_sat: u64,
    internal_key: XOnlyPublicKey,
    leaves: &[Script],
) -> Result<TxOut, TaprootError> {
    let mut builder = TaprootBuilder::new();
    let depth = if leaves.len() > 1 { 1 } else { 0 };
    for leaf in leaves {
        builder = builder
            .add_leaf(depth, leaf.clone())
            .map_err(|_| TaprootError::TreeAssembly)?;
    }
    let spend_info: TaprootSpendInfo = builder
        .finalize(secp256k1::SECP256K1, internal_key)
        .map_err(|_| TaprootError::TreeAssembly)?;
    let script_pubkey = Script::new_v1_p2tr(
        secp256k1::SECP256K1,
        internal_key,
        spend_info.merkle_root(),
    );
    Ok(TxOut { value: amount_sat, script_pubkey })
}

/// The Taproot counterpart of
/// [`crate::txbuilder::commitment::make_commit_tx_outputs`]'s segwit-v0
/// body: same dust-trimming and fee arithmetic, but every output is a P2TR
/// key-path-revocable output built from the relevant tapscript leaves
/// instead of a P2WSH redeem script.
#[allow(clippy::too_many_arguments)]
pub fn make_taproot_commit_tx_outputs(
    spec: &CommitmentSpec,
    dust_limit_sat: u64,
    revocationpubkey: PublicKey,
    local_delayedpubkey: PublicKey,
    remote_paymentpubkey: PublicKey,
    to_self_delay: u16,
    local_htlcpubkey: PublicKey,
    remote_htlcpubkey: PublicKey,
    local_funding_pubkey: PublicKey,
    remote_funding_pubkey: PublicKey,
) -> (Vec<CommitmentOutput>, u64) {
    use crate::params::CommitmentFormat;

    let format = CommitmentFormat::Taproot;
    let mut outputs = Vec::new();
    let mut fee_sat = spec.htlc_commitment_weight_fee()
        * spec.non_dust_htlc_count(dust_limit_sat, format) as u64;

    let to_local_sat = spec.to_local_msat / 1000;
    if to_local_sat >= dust_limit_sat {
        let leaf = leaf_script_to_local(local_delayedpubkey, to_self_delay);
        let internal = XOnlyPublicKey::from(revocationpubkey);
        if let Ok(txout) = taproot_txout(to_local_sat, internal, &[leaf]) {
            outputs.push(CommitmentOutput {
                txout,
                htlc: None,
                is_anchor: false,
                cltv_expiry: None,
            });
        } else {
            fee_sat += to_local_sat;
        }
    } else {
        fee_sat += to_local_sat;
    }

    let to_remote_sat = spec.to_remote_msat / 1000;
    if to_remote_sat >= dust_limit_sat {
        let leaf = leaf_to_remote(remote_paymentpubkey);
        if let Ok(txout) = taproot_txout(to_remote_sat, unspendable_internal_key(), &[leaf]) {
            outputs.push(CommitmentOutput {
                txout,
                htlc: None,
                is_anchor: false,
                cltv_expiry: None,
            });
        } else {
            fee_sat += to_remote_sat;
        }
    } else {
        fee_sat += to_remote_sat;
    }

    if to_local_sat > 0 || !spec.htlcs.is_empty() {
        if let Ok(txout) = taproot_txout(
            format.anchor_sat(),
            unspendable_internal_key(),
            &[leaf_anchor(local_funding_pubkey)],
        ) {
            outputs.push(CommitmentOutput {
                txout,
                htlc: None,
                is_anchor: true,
                cltv_expiry: None,
            });
        }
    }
    if to_remote_sat > 0 || !spec.htlcs.is_empty() {
        if let Ok(txout) = taproot_txout(
            format.anchor_sat(),
            unspendable_internal_key(),
            &[leaf_anchor(remote_funding_pubkey)],
        ) {
            outputs.push(CommitmentOutput {
                txout,
                htlc: None,
                is_anchor: true,
                cltv_expiry: None,
            });
        }
    }

    for directed in &spec.htlcs {
        if spec.is_htlc_trimmed(directed.id(), dust_limit_sat, format) {
            fee_sat += directed.amount_msat() / 1000;
            continue;
        }
        let amount_sat = directed.amount_msat() / 1000;
        let htlc = &directed.htlc;
        let leaf = match directed.direction {
            Direction::Outgoing => {
                leaf_offered_htlc(remote_htlcpubkey, htlc.payment_hash)
            }
            Direction::Incoming => leaf_received_htlc(
                remote_htlcpubkey,
                htlc.cltv_expiry,
                htlc.payment_hash,
            ),
        };
        let _ = local_htlcpubkey;
        let internal = XOnlyPublicKey::from(revocationpubkey);
        if let Ok(txout) = taproot_txout(amount_sat, internal, &[leaf]) {
            outputs.push(CommitmentOutput {
                txout,
                htlc: Some((directed.id(), directed.direction)),
                is_anchor: false,
                cltv_expiry: Some(htlc.cltv_expiry),
            });
        } else {
            fee_sat += amount_sat;
        }
    }

    sort_outputs(&mut outputs);
    (outputs, fee_sat)
}

#[cfg(test)]
mod test {
    use super::*;

    fn pubkey(byte: u8) -> PublicKey {
        let mut sk = [0u8; 32];
        sk[31] = byte;
        PublicKey::from_secret_key(
            secp256k1::SECP256K1,
            &secp256k1::SecretKey::from_slice(&sk).unwrap(),
        )
    }

    #[test]
    fn funding_key_aggregation_is_order_independent() {
        let a = aggregate_funding_key(pubkey(1), pubkey(2)).unwrap();
        let b = aggregate_funding_key(pubkey(2), pubkey(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn to_local_output_is_p2tr() {
        let leaf = leaf_script_to_local(pubkey(2), 144);
        let internal = XOnlyPublicKey::from(pubkey(1));
        let txout = taproot_txout(100_000, internal, &[leaf]).unwrap();
        assert!(txout.script_pubkey.is_v1_p2tr());
        assert_eq!(txout.value, 100_000);
    }

    #[test]
    fn offered_and_received_htlc_leaves_differ() {
        let hash = [9u8; 32];
        let offered = leaf_offered_htlc(pubkey(3), hash);
        let received = leaf_received_htlc(pubkey(3), 500_000, hash);
        assert_ne!(offered, received);
    }

    #[test]
    fn taproot_commit_outputs_sort_like_segwit_outputs() {
        let mut spec = CommitmentSpec::new(0, 400_000_000, 300_000_000);
        let (outputs, _fee) = make_taproot_commit_tx_outputs(
            &spec,
            330,
            pubkey(1),
            pubkey(2),
            pubkey(3),
            144,
            pubkey(4),
            pubkey(5),
            pubkey(6),
            pubkey(7),
        );
        assert!(outputs.len() >= 2);
        let mut sorted = outputs.clone();
        sort_outputs(&mut sorted);
        assert_eq!(outputs, sorted);
        let _ = &mut spec;
    }
}
