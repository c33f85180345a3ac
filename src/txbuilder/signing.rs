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

//! Sighash-flag-aware signing and verification for the two kinds of
//! segwit-v0 input this engine spends: commitment transactions, always
//! under `SIGHASH_ALL`, and anchor-format second-stage HTLC transactions,
//! under `SIGHASH_SINGLE|SIGHASH_ANYONECANPAY` so either side can attach
//! fee-bumping inputs without invalidating the other's signature.
//!
//! A produced signature is DER-encoded with the sighash type byte appended,
//! matching the bytes a P2WSH witness actually carries; verification checks
//! that trailing byte against the flag the caller expects before touching
//! the signature itself, so a signature signed under the wrong flag is
//! rejected outright rather than merely failing an ECDSA check it might
//! coincidentally still pass against a different sighash.

use bitcoin::util::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Script, Transaction};
use secp256k1::{ecdsa, Message, PublicKey, SecretKey};

use crate::params::CommitmentFormat;

/// Failures from sighash computation or flag validation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum SigningError {
    /// computing the sighash for input {0} failed
    SighashComputation(usize),

    /// signature carries no sighash type byte
    MissingSighashByte,

    /// signature was produced under sighash flag {0:#04x}, expected {1:#04x}
    WrongSighashFlag(u8, u8),

    /// signature bytes are not valid DER
    InvalidSignatureEncoding,
}

fn sighash_byte(sighash_type: EcdsaSighashType) -> u8 {
    sighash_type.to_u32() as u8
}

/// Signs `tx`'s input `input_index` spending `amount_sat` under
/// `script_code`, returning the DER-encoded signature with `sighash_type`'s
/// byte appended — exactly the bytes a P2WSH witness element carries.
fn sign_with_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    amount_sat: u64,
    secret_key: &SecretKey,
    sighash_type: EcdsaSighashType,
) -> Result<Vec<u8>, SigningError> {
    let sighash = SighashCache::new(tx)
        .segwit_signature_hash(input_index, script_code, amount_sat, sighash_type)
        .map_err(|_| SigningError::SighashComputation(input_index))?;
    let message = Message::from_slice(&sighash[..]).expect("sighash is 32 bytes");
    let signature = secp256k1::SECP256K1.sign_ecdsa(&message, secret_key);
    let mut bytes = signature.serialize_der().to_vec();
    bytes.push(sighash_byte(sighash_type));
    Ok(bytes)
}

/// Verifies `signature` (DER plus trailing sighash byte) against `tx`'s
/// input `input_index`, rejecting it outright if its trailing byte does not
/// match `expected_sighash_type` — a signature signed under any other flag
/// never reaches the ECDSA check at all.
fn verify_with_sighash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    amount_sat: u64,
    signature: &[u8],
    pubkey: &PublicKey,
    expected_sighash_type: EcdsaSighashType,
) -> Result<bool, SigningError> {
    let (der, flag) = signature
        .split_last()
        .ok_or(SigningError::MissingSighashByte)?;
    let expected = sighash_byte(expected_sighash_type);
    if *flag != expected {
        return Err(SigningError::WrongSighashFlag(*flag, expected));
    }
    let sig = ecdsa::Signature::from_der(der)
        .map_err(|_| SigningError::InvalidSignatureEncoding)?;
    let sighash = SighashCache::new(tx)
        .segwit_signature_hash(input_index, script_code, amount_sat, expected_sighash_type)
        .map_err(|_| SigningError::SighashComputation(input_index))?;
    let message = Message::from_slice(&sighash[..]).expect("sighash is 32 bytes");
    Ok(secp256k1::SECP256K1.verify_ecdsa(&message, &sig, pubkey).is_ok())
}

/// Commitment transactions are always signed under `SIGHASH_ALL`: every
/// output must be covered, since a partial commitment signature would let
/// either side rewrite the other's balance after the fact.
pub fn sign_commitment(
    tx: &Transaction,
    funding_script: &Script,
    funding_amount_sat: u64,
    funding_key: &SecretKey,
) -> Result<Vec<u8>, SigningError> {
    sign_with_sighash(
        tx,
        0,
        funding_script,
        funding_amount_sat,
        funding_key,
        EcdsaSighashType::All,
    )
}

pub fn verify_commitment(
    tx: &Transaction,
    funding_script: &Script,
    funding_amount_sat: u64,
    signature: &[u8],
    funding_pubkey: &PublicKey,
) -> Result<bool, SigningError> {
    verify_with_sighash(
        tx,
        0,
        funding_script,
        funding_amount_sat,
        signature,
        funding_pubkey,
        EcdsaSighashType::All,
    )
}

/// Second-stage HTLC transactions under an anchor format sign under
/// `SIGHASH_SINGLE|SIGHASH_ANYONECANPAY`, leaving room for either side to
/// add its own fee-bumping inputs and outputs without invalidating the
/// other's signature; non-anchor formats pay their own fee outright and
/// sign under plain `SIGHASH_ALL`.
pub fn htlc_sighash_type(format: CommitmentFormat) -> EcdsaSighashType {
    if format.has_anchors() {
        EcdsaSighashType::SinglePlusAnyoneCanPay
    } else {
        EcdsaSighashType::All
    }
}

pub fn sign_htlc_claim(
    tx: &Transaction,
    htlc_script: &Script,
    htlc_amount_sat: u64,
    htlc_key: &SecretKey,
    format: CommitmentFormat,
) -> Result<Vec<u8>, SigningError> {
    sign_with_sighash(
        tx,
        0,
        htlc_script,
        htlc_amount_sat,
        htlc_key,
        htlc_sighash_type(format),
    )
}

pub fn verify_htlc_claim(
    tx: &Transaction,
    htlc_script: &Script,
    htlc_amount_sat: u64,
    signature: &[u8],
    htlc_pubkey: &PublicKey,
    format: CommitmentFormat,
) -> Result<bool, SigningError> {
    verify_with_sighash(
        tx,
        0,
        htlc_script,
        htlc_amount_sat,
        signature,
        htlc_pubkey,
        htlc_sighash_type(format),
    )
}

#[cfg(test)]
mod test {
    use bitcoin::{OutPoint, PackedLockTime, Sequence, TxIn, TxOut};

    use super::*;

    fn keypair(byte: u8) -> (SecretKey, PublicKey) {
        let mut buf = [0u8; 32];
        buf[31] = byte;
        let sk = SecretKey::from_slice(&buf).unwrap();
        let pk = PublicKey::from_secret_key(secp256k1::SECP256K1, &sk);
        (sk, pk)
    }

    fn dummy_tx() -> Transaction {
        Transaction {
            version: 2,
            lock_time: PackedLockTime(0),
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: Script::new(),
                sequence: Sequence(0),
                witness: bitcoin::Witness::new(),
            }],
            output: vec![TxOut {
                value: 100_000,
                script_pubkey: Script::new(),
            }],
        }
    }

    #[test]
    fn commitment_signature_round_trips() {
        let (sk, pk) = keypair(1);
        let tx = dummy_tx();
        let script_code = Script::new();
        let sig = sign_commitment(&tx, &script_code, 1_000_000, &sk).unwrap();
        assert!(verify_commitment(&tx, &script_code, 1_000_000, &sig, &pk).unwrap());
    }

    #[test]
    fn htlc_claim_uses_all_for_non_anchor_formats() {
        let (sk, pk) = keypair(2);
        let tx = dummy_tx();
        let script_code = Script::new();
        let sig = sign_htlc_claim(
            &tx,
            &script_code,
            500_000,
            &sk,
            CommitmentFormat::DefaultSegwit,
        )
        .unwrap();
        assert_eq!(*sig.last().unwrap(), EcdsaSighashType::All.to_u32() as u8);
        assert!(verify_htlc_claim(
            &tx,
            &script_code,
            500_000,
            &sig,
            &pk,
            CommitmentFormat::DefaultSegwit
        )
        .unwrap());
    }

    #[test]
    fn htlc_claim_uses_single_anyonecanpay_under_anchors() {
        let (sk, _pk) = keypair(3);
        let tx = dummy_tx();
        let script_code = Script::new();
        let sig = sign_htlc_claim(
            &tx,
            &script_code,
            500_000,
            &sk,
            CommitmentFormat::AnchorOutputs,
        )
        .unwrap();
        assert_eq!(
            *sig.last().unwrap(),
            EcdsaSighashType::SinglePlusAnyoneCanPay.to_u32() as u8
        );
    }

    #[test]
    fn verification_rejects_signature_with_wrong_flag() {
        let (sk, pk) = keypair(4);
        let tx = dummy_tx();
        let script_code = Script::new();
        // Signed for a commitment (SIGHASH_ALL) but checked against the
        // anchor-format HTLC-claim flag.
        let sig = sign_commitment(&tx, &script_code, 1_000_000, &sk).unwrap();
        let result = verify_htlc_claim(
            &tx,
            &script_code,
            1_000_000,
            &sig,
            &pk,
            CommitmentFormat::AnchorOutputs,
        );
        assert!(matches!(result, Err(SigningError::WrongSighashFlag(_, _))));
    }
}
