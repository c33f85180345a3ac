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

//! The mutual-close transaction: a single spend of the funding output with
//! zero, one or two plain outputs, agreed via `shutdown`/`closing_signed`.

use bitcoin::{OutPoint, PackedLockTime, Sequence, Transaction, TxIn, TxOut};
use bitcoin_scripts::PubkeyScript;

use crate::commitment_spec::CommitmentSpec;

/// Builds the unsigned mutual-close transaction. `fee_sat` has already been
/// agreed via `closing_signed` fee negotiation; it is subtracted from
/// whichever side's balance `local_pays_fees` selects. A balance that can't
/// clear `dust_limit_sat` after the fee is dropped from the output set
/// entirely rather than erroring — a close with one or even zero outputs is
/// valid.
pub fn make_closing_tx(
    funding_input: OutPoint,
    local_script: PubkeyScript,
    remote_script: PubkeyScript,
    local_pays_fees: bool,
    dust_limit_sat: u64,
    fee_sat: u64,
    spec: &CommitmentSpec,
) -> Transaction {
    let mut local_sat = spec.to_local_msat / 1000;
    let mut remote_sat = spec.to_remote_msat / 1000;
    if local_pays_fees {
        local_sat = local_sat.saturating_sub(fee_sat);
    } else {
        remote_sat = remote_sat.saturating_sub(fee_sat);
    }

    let mut outputs = Vec::with_capacity(2);
    if local_sat >= dust_limit_sat {
        outputs.push(TxOut {
            value: local_sat,
            script_pubkey: local_script.into(),
        });
    }
    if remote_sat >= dust_limit_sat {
        outputs.push(TxOut {
            value: remote_sat,
            script_pubkey: remote_script.into(),
        });
    }
    outputs.sort_by(|a, b| {
        a.script_pubkey
            .as_bytes()
            .cmp(b.script_pubkey.as_bytes())
    });

    Transaction {
        version: 2,
        lock_time: PackedLockTime(0),
        input: vec![TxIn {
            previous_output: funding_input,
            script_sig: bitcoin::Script::new(),
            sequence: Sequence::MAX,
            witness: bitcoin::Witness::new(),
        }],
        output: outputs,
    }
}
