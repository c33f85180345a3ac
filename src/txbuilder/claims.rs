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

//! Third-stage and penalty transactions: every way either party can
//! eventually move coins out of a broadcast commitment or one of its
//! second-stage transactions into a final address.
//!
//! Every function here spends a single known output by value (amount plus
//! `vout`), applies `fee_sat`, and fails with [`TxBuilderError`] rather than
//! producing an output below the dust limit.

use bitcoin::{OutPoint, PackedLockTime, Sequence, Transaction, TxIn, TxOut};
use bitcoin_scripts::PubkeyScript;

use crate::txbuilder::TxBuilderError;

fn claim_single_output(
    parent_txid: bitcoin::Txid,
    vout: u32,
    input_amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    destination: PubkeyScript,
    sequence: Sequence,
    lock_time: PackedLockTime,
) -> Result<Transaction, TxBuilderError> {
    let output_amount = input_amount_sat
        .checked_sub(fee_sat)
        .filter(|amount| *amount >= dust_limit_sat)
        .ok_or(TxBuilderError::AmountBelowDustLimit(
            input_amount_sat.saturating_sub(fee_sat),
            dust_limit_sat,
        ))?;
    Ok(Transaction {
        version: 2,
        lock_time,
        input: vec![TxIn {
            previous_output: OutPoint::new(parent_txid, vout),
            script_sig: bitcoin::Script::new(),
            sequence,
            witness: bitcoin::Witness::new(),
        }],
        output: vec![TxOut {
            value: output_amount,
            script_pubkey: destination.into(),
        }],
    })
}

/// Local party spending its own revoked-but-not-yet `to_local` output after
/// `to_self_delay` blocks have passed since the commitment confirmed.
pub fn claim_main_delayed(
    commit_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    to_self_delay: u16,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    claim_single_output(
        commit_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        Sequence(to_self_delay as u32),
        PackedLockTime(0),
    )
}

/// Remote party spending its plain (non-anchor) or CSV(1)-delayed (anchor)
/// `to_remote` output.
pub fn claim_remote_main(
    commit_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    has_anchors: bool,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    let sequence = if has_anchors { Sequence(1) } else { Sequence(0) };
    claim_single_output(
        commit_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        sequence,
        PackedLockTime(0),
    )
}

/// Remote party claiming a received HTLC directly from our (non-revoked)
/// commitment by revealing the preimage. No CSV delay, no CLTV — the
/// preimage script path opens immediately.
pub fn claim_htlc_success(
    commit_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    claim_single_output(
        commit_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        Sequence(0),
        PackedLockTime(0),
    )
}

/// Remote party claiming an offered HTLC directly from our commitment once
/// its CLTV expiry has passed.
pub fn claim_htlc_timeout(
    commit_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    cltv_expiry: u32,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    claim_single_output(
        commit_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        Sequence(0),
        PackedLockTime(cltv_expiry),
    )
}

/// Penalty spend of a revoked `to_local` output, using the revocation
/// private key derived once the per-commitment secret was revealed.
pub fn main_penalty(
    commit_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    claim_single_output(
        commit_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        Sequence(0),
        PackedLockTime(0),
    )
}

/// Penalty spend of a revoked commitment's HTLC output, via the revocation
/// branch shared by both the offered and received HTLC scripts.
pub fn htlc_penalty(
    commit_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    claim_single_output(
        commit_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        Sequence(0),
        PackedLockTime(0),
    )
}

/// Penalty spend of a revoked commitment's second-stage HTLC-success or
/// HTLC-timeout output, exercised when the counterparty still manages to
/// publish the second-stage transaction after we've already learned the
/// commitment was revoked.
pub fn claim_htlc_delayed_penalty(
    htlc_tx_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    claim_single_output(
        htlc_tx_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        Sequence(0),
        PackedLockTime(0),
    )
}

/// Either party sweeping their own 330-satoshi anchor output once it is no
/// longer needed for fee-bumping, or to reclaim it before the commitment
/// expires uneconomically.
pub fn claim_anchor(
    commit_txid: bitcoin::Txid,
    vout: u32,
    amount_sat: u64,
    fee_sat: u64,
    dust_limit_sat: u64,
    destination: PubkeyScript,
) -> Result<Transaction, TxBuilderError> {
    claim_single_output(
        commit_txid,
        vout,
        amount_sat,
        fee_sat,
        dust_limit_sat,
        destination,
        Sequence(16),
        PackedLockTime(0),
    )
}

#[cfg(test)]
mod test {
    use bitcoin::hashes::Hash;
    use bitcoin_scripts::PubkeyScript;

    use super::*;

    fn destination() -> PubkeyScript {
        bitcoin::Script::new_op_return(&[]).into()
    }

    #[test]
    fn claim_below_dust_after_fee_fails() {
        let result = claim_main_delayed(
            bitcoin::Txid::all_zeros(),
            0,
            1000,
            900,
            546,
            144,
            destination(),
        );
        assert!(matches!(
            result,
            Err(TxBuilderError::AmountBelowDustLimit(100, 546))
        ));
    }

    #[test]
    fn claim_main_delayed_encodes_to_self_delay_as_sequence() {
        let tx = claim_main_delayed(
            bitcoin::Txid::all_zeros(),
            2,
            100_000,
            500,
            546,
            720,
            destination(),
        )
        .unwrap();
        assert_eq!(tx.input[0].sequence, Sequence(720));
        assert_eq!(tx.output[0].value, 99_500);
    }

    #[test]
    fn claim_htlc_timeout_sets_locktime_to_expiry() {
        let tx = claim_htlc_timeout(
            bitcoin::Txid::all_zeros(),
            0,
            50_000,
            400,
            546,
            600_000,
            destination(),
        )
        .unwrap();
        assert_eq!(tx.lock_time, PackedLockTime(600_000));
    }
}
