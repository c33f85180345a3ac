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

//! Construction of the commitment transaction itself: the obscured
//! commitment number encoding and the ordered, dust-trimmed output set.

use bitcoin::hashes::{sha256, Hash, HashEngine};
use bitcoin::{OutPoint, PackedLockTime, Sequence, Transaction, TxIn, TxOut};
use secp256k1::PublicKey;

use crate::commitment_spec::CommitmentSpec;
use crate::htlc::{Direction, HtlcId};
use crate::params::CommitmentFormat;
use crate::txbuilder::scripts::{lock_script_txout, to_remote_v1_txout, ScriptGenerators};
use crate::txbuilder::taproot;
use bitcoin_scripts::LockScript;

/// A single output of an unsigned commitment transaction, tagged with the
/// HTLC it belongs to (if any) so the caller can later pick out which
/// output index to build a second-stage transaction against.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CommitmentOutput {
    pub txout: TxOut,
    pub htlc: Option<(HtlcId, Direction)>,
    pub is_anchor: bool,
    /// The HTLC's CLTV expiry, carried alongside the output purely to break
    /// ties between same-amount, same-script offered HTLCs when sorting —
    /// an offered-HTLC script carries no CLTV of its own, so two such
    /// outputs can otherwise be indistinguishable by script content alone.
    pub cltv_expiry: Option<u32>,
}

/// An unsigned commitment transaction plus enough metadata to locate its
/// outputs again once signatures arrive.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CommitTx {
    pub transaction: Transaction,
    pub outputs: Vec<CommitmentOutput>,
    pub obscured_commitment_number: u64,
}

/// `SHA256(local_payment_basepoint ‖ remote_payment_basepoint)`'s lower 48
/// bits, masked with the lexicographically-first-pubkey-first ordering
/// BOLT-3 specifies: the *opener*'s basepoint goes first regardless of
/// which side is building the transaction.
pub fn obscuring_factor(
    local_is_opener: bool,
    local_payment_pubkey: PublicKey,
    remote_payment_pubkey: PublicKey,
) -> u64 {
    let mut engine = sha256::Hash::engine();
    if local_is_opener {
        engine.input(&local_payment_pubkey.serialize());
        engine.input(&remote_payment_pubkey.serialize());
    } else {
        engine.input(&remote_payment_pubkey.serialize());
        engine.input(&local_payment_pubkey.serialize());
    }
    let hash = sha256::Hash::from_engine(engine);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&hash[24..]);
    u64::from_be_bytes(buf) & 0x0000_FFFF_FFFF_FFFF
}

/// Masks `commit_number` with `obscuring_factor` and splits the resulting
/// 48-bit value across the input sequence's top 24 bits and the locktime's
/// top 8 plus bottom 24 bits, per BOLT-3.
pub fn encode_obscured_commitment_number(
    commit_number: u64,
    obscuring_factor: u64,
) -> (u32, u32) {
    let obscured = (commit_number ^ obscuring_factor) & 0x0000_FFFF_FFFF_FFFF;
    let lock_time = 0x2000_0000 | (obscured as u32 & 0x00FF_FFFF);
    let sequence = 0x8000_0000 | ((obscured >> 24) as u32 & 0x00FF_FFFF);
    (lock_time, sequence)
}

/// Recovers `commit_number ^ obscuring_factor`'s original 48-bit value from
/// a commitment transaction's locktime and sequence fields. Used to
/// recognise which index a commitment we observe on-chain belongs to.
pub fn decode_obscured_commitment_number(lock_time: u32, sequence: u32) -> u64 {
    let low = (lock_time & 0x00FF_FFFF) as u64;
    let high = (sequence & 0x00FF_FFFF) as u64;
    (high << 24) | low
}

/// Builds the unsigned commitment transaction spending `funding_input` with
/// the given ordered, already-trimmed output set.
pub fn make_commit_tx(
    funding_input: OutPoint,
    commit_number: u64,
    local_payment_pubkey: PublicKey,
    remote_payment_pubkey: PublicKey,
    local_is_opener: bool,
    outputs: Vec<CommitmentOutput>,
) -> CommitTx {
    let factor = obscuring_factor(
        local_is_opener,
        local_payment_pubkey,
        remote_payment_pubkey,
    );
    let (lock_time, sequence) =
        encode_obscured_commitment_number(commit_number, factor);
    let transaction = Transaction {
        version: 2,
        lock_time: PackedLockTime(lock_time),
        input: vec![TxIn {
            previous_output: funding_input,
            script_sig: bitcoin::Script::new(),
            sequence: Sequence(sequence),
            witness: bitcoin::Witness::new(),
        }],
        output: outputs.iter().map(|o| o.txout.clone()).collect(),
    };
    CommitTx {
        transaction,
        outputs,
        obscured_commitment_number: commit_number ^ factor,
    }
}

/// Builds the ordered, dust-trimmed set of commitment outputs: `to_local`,
/// `to_remote`, per-direction HTLC outputs, and (under anchor formats) the
/// two 330-satoshi anchor outputs — one per party.
///
/// `broadcaster_is_local` selects which side's `to_self_delay`/revocation
/// key applies to the `to_local` output (the commitment being built is
/// always the one signed *by the other side*, so `to_local` there is
/// "local" from the broadcaster's perspective, never the caller's).
#[allow(clippy::too_many_arguments)]
pub fn make_commit_tx_outputs(
    spec: &CommitmentSpec,
    format: CommitmentFormat,
    dust_limit_sat: u64,
    broadcaster_is_local: bool,
    revocationpubkey: PublicKey,
    local_delayedpubkey: PublicKey,
    remote_paymentpubkey: PublicKey,
    to_self_delay: u16,
    local_htlcpubkey: PublicKey,
    remote_htlcpubkey: PublicKey,
    local_funding_pubkey: PublicKey,
    remote_funding_pubkey: PublicKey,
) -> (Vec<CommitmentOutput>, u64) {
    let _ = broadcaster_is_local;

    if format.is_taproot() {
        return taproot::make_taproot_commit_tx_outputs(
            spec,
            dust_limit_sat,
            revocationpubkey,
            local_delayedpubkey,
            remote_paymentpubkey,
            to_self_delay,
            local_htlcpubkey,
            remote_htlcpubkey,
            local_funding_pubkey,
            remote_funding_pubkey,
        );
    }

    let mut outputs = Vec::new();
    let mut fee_sat = spec.htlc_commitment_weight_fee() * spec.non_dust_htlc_count(
        dust_limit_sat,
        format,
    ) as u64;

    let to_local_sat = spec.to_local_msat / 1000;
    if to_local_sat >= dust_limit_sat {
        let lock = LockScript::ln_to_local(revocationpubkey, local_delayedpubkey, to_self_delay);
        outputs.push(CommitmentOutput {
            txout: lock_script_txout(to_local_sat, lock),
            htlc: None,
            is_anchor: false,
            cltv_expiry: None,
        });
    } else {
        fee_sat += to_local_sat;
    }

    let to_remote_sat = spec.to_remote_msat / 1000;
    if to_remote_sat >= dust_limit_sat {
        let txout = if format.has_anchors() {
            lock_script_txout(to_remote_sat, LockScript::ln_to_remote_v2(remote_paymentpubkey))
        } else {
            to_remote_v1_txout(to_remote_sat, remote_paymentpubkey)
        };
        outputs.push(CommitmentOutput {
            txout,
            htlc: None,
            is_anchor: false,
            cltv_expiry: None,
        });
    } else {
        fee_sat += to_remote_sat;
    }

    if format.has_anchors() && (to_local_sat > 0 || !spec.htlcs.is_empty()) {
        let lock = LockScript::ln_anchor(local_funding_pubkey);
        outputs.push(CommitmentOutput {
            txout: lock_script_txout(format.anchor_sat(), lock),
            htlc: None,
            is_anchor: true,
            cltv_expiry: None,
        });
    }
    if format.has_anchors() && (to_remote_sat > 0 || !spec.htlcs.is_empty()) {
        let lock = LockScript::ln_anchor(remote_funding_pubkey);
        outputs.push(CommitmentOutput {
            txout: lock_script_txout(format.anchor_sat(), lock),
            htlc: None,
            is_anchor: true,
            cltv_expiry: None,
        });
    }

    for directed in &spec.htlcs {
        if spec.is_htlc_trimmed(directed.id(), dust_limit_sat, format) {
            fee_sat += directed.amount_msat() / 1000;
            continue;
        }
        let amount_sat = directed.amount_msat() / 1000;
        let htlc = &directed.htlc;
        let lock = match directed.direction {
            Direction::Outgoing => LockScript::ln_offered_htlc(
                revocationpubkey,
                local_htlcpubkey,
                remote_htlcpubkey,
                htlc.payment_hash,
            ),
            Direction::Incoming => LockScript::ln_received_htlc(
                revocationpubkey,
                local_htlcpubkey,
                remote_htlcpubkey,
                htlc.cltv_expiry,
                htlc.payment_hash,
            ),
        };
        outputs.push(CommitmentOutput {
            txout: lock_script_txout(amount_sat, lock),
            htlc: Some((directed.id(), directed.direction)),
            is_anchor: false,
            cltv_expiry: Some(htlc.cltv_expiry),
        });
    }

    sort_outputs(&mut outputs);
    (outputs, fee_sat)
}

/// BIP-69 ascending amount, then ascending script, then (for two offered
/// HTLCs of equal amount whose scripts carry no CLTV and so collide)
/// ascending CLTV expiry. Shared with [`crate::txbuilder::taproot`], whose
/// output set needs the identical tie-break even though its scripts are
/// P2TR rather than P2WSH.
pub(crate) fn sort_outputs(outputs: &mut [CommitmentOutput]) {
    outputs.sort_by(|a, b| {
        a.txout
            .value
            .cmp(&b.txout.value)
            .then_with(|| {
                a.txout
                    .script_pubkey
                    .as_bytes()
                    .cmp(b.txout.script_pubkey.as_bytes())
            })
            .then_with(|| {
                a.cltv_expiry.unwrap_or(0).cmp(&b.cltv_expiry.unwrap_or(0))
            })
    });
}
