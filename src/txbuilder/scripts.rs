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

//! BOLT-3 output scripts for the segwit v0 commitment formats: funding
//! multisig, `to_local`, `to_remote` (v1 for plain key-path payments, v2
//! for the CSV(1)-delayed anchor variant), the per-party anchor output,
//! and the two HTLC output shapes. Every shape is built once as a
//! [`LockScript`], its consensus opcodes laid out exactly as BOLT-3
//! specifies; [`lock_script_txout`] below is the single place that wraps
//! one into the P2WSH [`TxOut`] the commitment transaction actually
//! carries, rather than re-deriving the wrapping per output kind.

use bitcoin::blockdata::opcodes::all::*;
use bitcoin::blockdata::script;
use bitcoin::secp256k1::PublicKey;
use bitcoin::TxOut;
use bitcoin_scripts::{LockScript, WitnessScript};

pub trait ScriptGenerators {
    fn ln_funding(pubkey1: PublicKey, pubkey2: PublicKey) -> Self;

    fn ln_to_local(
        revocationpubkey: PublicKey,
        local_delayedpubkey: PublicKey,
        to_self_delay: u16,
    ) -> Self;

    fn ln_to_remote_v2(remote_pubkey: PublicKey) -> Self;

    /// `option_anchors`' per-party anchor output: spendable immediately by
    /// its owner, or by anyone after one block once the owner can no longer
    /// be bothered (CPFP carry-forward).
    fn ln_anchor(funding_pubkey: PublicKey) -> Self;

    fn ln_offered_htlc(
        revocationpubkey: PublicKey,
        local_htlcpubkey: PublicKey,
        remote_htlcpubkey: PublicKey,
        payment_hash: [u8; 32],
    ) -> Self;

    fn ln_received_htlc(
        revocationpubkey: PublicKey,
        local_htlcpubkey: PublicKey,
        remote_htlcpubkey: PublicKey,
        cltv_expiry: u32,
        payment_hash: [u8; 32],
    ) -> Self;

    /// The `to_local`-shaped output on the *second-stage* HTLC transaction
    /// (HTLC-success / HTLC-timeout), identical in shape to
    /// [`Self::ln_to_local`] but kept distinct since BOLT-3 documents it
    /// separately.
    fn ln_htlc_output(
        revocationpubkey: PublicKey,
        local_delayedpubkey: PublicKey,
        to_self_delay: u16,
    ) -> Self;
}

/// Sorts two pubkeys per BIP-69 (ascending lexicographic order of the
/// compressed encoding), as BOLT-3 requires for the 2-of-2 funding script.
fn lex_order_keys(
    pubkey1: PublicKey,
    pubkey2: PublicKey,
) -> (bitcoin::PublicKey, bitcoin::PublicKey) {
    let (a, b) = (bitcoin::PublicKey::new(pubkey1), bitcoin::PublicKey::new(pubkey2));
    if a.inner.serialize() <= b.inner.serialize() {
        (a, b)
    } else {
        (b, a)
    }
}

impl ScriptGenerators for LockScript {
    fn ln_funding(pubkey1: PublicKey, pubkey2: PublicKey) -> Self {
        let (a, b) = lex_order_keys(pubkey1, pubkey2);
        script::Builder::new()
            .push_int(2)
            .push_key(&a)
            .push_key(&b)
            .push_int(2)
            .push_opcode(OP_CHECKMULTISIG)
            .into_script()
            .into()
    }

    fn ln_to_local(
        revocationpubkey: PublicKey,
        local_delayedpubkey: PublicKey,
        to_self_delay: u16,
    ) -> Self {
        script::Builder::new()
            .push_opcode(OP_IF)
            .push_key(&bitcoin::PublicKey::new(revocationpubkey))
            .push_opcode(OP_ELSE)
            .push_int(to_self_delay as i64)
            .push_opcode(OP_CSV)
            .push_opcode(OP_DROP)
            .push_key(&bitcoin::PublicKey::new(local_delayedpubkey))
            .push_opcode(OP_ENDIF)
            .push_opcode(OP_CHECKSIG)
            .into_script()
            .into()
    }

    fn ln_to_remote_v2(remote_pubkey: PublicKey) -> Self {
        script::Builder::new()
            .push_key(&bitcoin::PublicKey::new(remote_pubkey))
            .push_opcode(OP_CHECKSIGVERIFY)
            .push_int(1)
            .push_opcode(OP_CSV)
            .into_script()
            .into()
    }

    fn ln_anchor(funding_pubkey: PublicKey) -> Self {
        script::Builder::new()
            .push_key(&bitcoin::PublicKey::new(funding_pubkey))
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_IFDUP)
            .push_opcode(OP_NOTIF)
            .push_int(16)
            .push_opcode(OP_CSV)
            .push_opcode(OP_ENDIF)
            .into_script()
            .into()
    }

    fn ln_offered_htlc(
        revocationpubkey: PublicKey,
        local_htlcpubkey: PublicKey,
        remote_htlcpubkey: PublicKey,
        payment_hash: [u8; 32],
    ) -> Self {
        script::Builder::new()
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(&bitcoin::PublicKey::new(revocationpubkey).pubkey_hash())
            .push_opcode(OP_EQUAL)
            .push_opcode(OP_IF)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ELSE)
            .push_key(&bitcoin::PublicKey::new(remote_htlcpubkey))
            .push_opcode(OP_SWAP)
            .push_opcode(OP_SIZE)
            .push_int(32)
            .push_opcode(OP_EQUAL)
            .push_opcode(OP_NOTIF)
            .push_opcode(OP_DROP)
            .push_int(2)
            .push_opcode(OP_SWAP)
            .push_key(&bitcoin::PublicKey::new(local_htlcpubkey))
            .push_int(2)
            .push_opcode(OP_CHECKMULTISIG)
            .push_opcode(OP_ELSE)
            .push_opcode(OP_HASH160)
            .push_slice(&payment_hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ENDIF)
            .push_opcode(OP_ENDIF)
            .into_script()
            .into()
    }

    fn ln_received_htlc(
        revocationpubkey: PublicKey,
        local_htlcpubkey: PublicKey,
        remote_htlcpubkey: PublicKey,
        cltv_expiry: u32,
        payment_hash: [u8; 32],
    ) -> Self {
        script::Builder::new()
            .push_opcode(OP_DUP)
            .push_opcode(OP_HASH160)
            .push_slice(&bitcoin::PublicKey::new(revocationpubkey).pubkey_hash())
            .push_opcode(OP_EQUAL)
            .push_opcode(OP_IF)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ELSE)
            .push_key(&bitcoin::PublicKey::new(remote_htlcpubkey))
            .push_opcode(OP_SWAP)
            .push_opcode(OP_SIZE)
            .push_int(32)
            .push_opcode(OP_EQUAL)
            .push_opcode(OP_IF)
            .push_opcode(OP_HASH160)
            .push_slice(&payment_hash)
            .push_opcode(OP_EQUALVERIFY)
            .push_int(2)
            .push_opcode(OP_SWAP)
            .push_key(&bitcoin::PublicKey::new(local_htlcpubkey))
            .push_int(2)
            .push_opcode(OP_CHECKMULTISIG)
            .push_opcode(OP_ELSE)
            .push_opcode(OP_DROP)
            .push_int(cltv_expiry as i64)
            .push_opcode(OP_CLTV)
            .push_opcode(OP_DROP)
            .push_opcode(OP_CHECKSIG)
            .push_opcode(OP_ENDIF)
            .push_opcode(OP_ENDIF)
            .into_script()
            .into()
    }

    fn ln_htlc_output(
        revocationpubkey: PublicKey,
        local_delayedpubkey: PublicKey,
        to_self_delay: u16,
    ) -> Self {
        LockScript::ln_to_local(revocationpubkey, local_delayedpubkey, to_self_delay)
    }
}

/// `to_remote` under `option_static_remotekey`/legacy formats carries no
/// redeem script at all — it is a plain key-path payment — so it is built
/// directly as a P2WPKH [`TxOut`] rather than through [`ScriptGenerators`].
pub fn to_remote_v1_txout(amount_sat: u64, remote_pubkey: PublicKey) -> TxOut {
    let wpkh = bitcoin::PublicKey::new(remote_pubkey)
        .wpubkey_hash()
        .expect("remote_pubkey is always generated compressed");
    TxOut { value: amount_sat, script_pubkey: wpkh.into() }
}

/// Wraps any [`LockScript`] produced above into the P2WSH [`TxOut`] the
/// commitment transaction pays `amount_sat` to.
pub fn lock_script_txout(amount_sat: u64, lock: LockScript) -> TxOut {
    let witness_script: WitnessScript = lock.into();
    TxOut { value: amount_sat, script_pubkey: witness_script.to_p2wsh().into() }
}
