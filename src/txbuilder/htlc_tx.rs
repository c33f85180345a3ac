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

//! Second-stage transactions: HTLC-timeout for offered HTLCs, HTLC-success
//! for received HTLCs. Both spend a commitment's HTLC output and re-lock
//! the proceeds under the standard `to_local`-shaped CSV-delay script.

use bitcoin::{OutPoint, PackedLockTime, Sequence, Transaction, TxIn, TxOut};
use secp256k1::PublicKey;

use crate::commitment_spec::weight_fee;
use crate::htlc::Direction;
use crate::params::CommitmentFormat;
use bitcoin_scripts::LockScript;

use crate::txbuilder::scripts::{lock_script_txout, ScriptGenerators};
use crate::txbuilder::{TxBuilderError, TxOutRef};

const HTLC_TIMEOUT_WEIGHT: u64 = 663;
const HTLC_SUCCESS_WEIGHT: u64 = 703;

/// Builds the unsigned second-stage transaction for one non-dust HTLC
/// output of `commit_tx`. `direction` is from the commitment broadcaster's
/// point of view: `Outgoing` (offered) produces an HTLC-timeout locked to
/// `cltv_expiry`; `Incoming` (received) produces an HTLC-success, which
/// carries no locktime of its own since the preimage is the only unlock
/// condition at this stage.
#[allow(clippy::too_many_arguments)]
pub fn make_htlc_tx(
    commit_txid: bitcoin::Txid,
    htlc_output: TxOutRef,
    direction: Direction,
    cltv_expiry: u32,
    amount_sat: u64,
    feerate_per_kw: u32,
    format: CommitmentFormat,
    revocationpubkey: PublicKey,
    local_delayedpubkey: PublicKey,
    to_self_delay: u16,
) -> Result<Transaction, TxBuilderError> {
    let weight = match direction {
        Direction::Outgoing => HTLC_TIMEOUT_WEIGHT,
        Direction::Incoming => HTLC_SUCCESS_WEIGHT,
    };
    let fee = if format.zero_fee_htlc_tx() {
        0
    } else {
        weight_fee(weight, feerate_per_kw)
    };
    let output_amount = amount_sat
        .checked_sub(fee)
        .ok_or(TxBuilderError::AmountBelowDustLimit(amount_sat, fee))?;

    let sequence = if format.has_anchors() {
        Sequence(1)
    } else {
        Sequence(0)
    };
    let lock_time = match direction {
        Direction::Outgoing => PackedLockTime(cltv_expiry),
        Direction::Incoming => PackedLockTime(0),
    };

    Ok(Transaction {
        version: 2,
        lock_time,
        input: vec![TxIn {
            previous_output: OutPoint::new(commit_txid, htlc_output.vout),
            script_sig: bitcoin::Script::new(),
            sequence,
            witness: bitcoin::Witness::new(),
        }],
        output: vec![lock_script_txout(
            output_amount,
            LockScript::ln_htlc_output(revocationpubkey, local_delayedpubkey, to_self_delay),
        )],
    })
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;

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
    fn offered_htlc_locks_to_expiry() {
        let tx = make_htlc_tx(
            bitcoin::Txid::all_zeros(),
            TxOutRef { vout: 0 },
            Direction::Outgoing,
            550_000,
            1_000_000,
            5000,
            CommitmentFormat::DefaultSegwit,
            pubkey(1),
            pubkey(2),
            144,
        )
        .unwrap();
        assert_eq!(tx.lock_time, PackedLockTime(550_000));
        assert_eq!(tx.input[0].sequence, Sequence(0));
    }

    #[test]
    fn received_htlc_has_no_locktime() {
        let tx = make_htlc_tx(
            bitcoin::Txid::all_zeros(),
            TxOutRef { vout: 1 },
            Direction::Incoming,
            550_000,
            1_000_000,
            5000,
            CommitmentFormat::AnchorOutputs,
            pubkey(1),
            pubkey(2),
            144,
        )
        .unwrap();
        assert_eq!(tx.lock_time, PackedLockTime(0));
        assert_eq!(tx.input[0].sequence, Sequence(1));
    }

    #[test]
    fn zero_fee_anchor_format_keeps_full_amount() {
        let tx = make_htlc_tx(
            bitcoin::Txid::all_zeros(),
            TxOutRef { vout: 0 },
            Direction::Outgoing,
            550_000,
            1_000,
            5000,
            CommitmentFormat::ZeroFeeAnchorOutputs,
            pubkey(1),
            pubkey(2),
            144,
        )
        .unwrap();
        assert_eq!(tx.output[0].value, 1_000);
    }

    #[test]
    fn below_dust_after_fee_is_rejected() {
        let result = make_htlc_tx(
            bitcoin::Txid::all_zeros(),
            TxOutRef { vout: 0 },
            Direction::Outgoing,
            550_000,
            100,
            5000,
            CommitmentFormat::DefaultSegwit,
            pubkey(1),
            pubkey(2),
            144,
        );
        assert!(result.is_err());
    }
}
