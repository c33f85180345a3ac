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

//! Pure, I/O-free construction of every transaction a channel may ever
//! broadcast: the commitment transaction itself, second-stage HTLC
//! transactions, third-stage delayed claims, penalty transactions and the
//! mutual close, plus the sighash-flag-aware signing surface in
//! [`signing`] and the `option_taproot` output builder in [`taproot`].

pub mod claims;
pub mod closing;
pub mod commitment;
pub mod htlc_tx;
pub mod scripts;
pub mod signing;
pub mod taproot;
pub mod weight;

pub use claims::{claim_anchor, claim_htlc_delayed_penalty, claim_htlc_success,
    claim_htlc_timeout, claim_main_delayed, claim_remote_main, htlc_penalty,
    main_penalty};
pub use closing::make_closing_tx;
pub use commitment::{make_commit_tx, make_commit_tx_outputs, CommitTx, CommitmentOutput};
pub use htlc_tx::make_htlc_tx;
pub use signing::{sign_commitment, sign_htlc_claim, verify_commitment, verify_htlc_claim,
    SigningError};
pub use taproot::{aggregate_funding_key, TaprootError};

/// A bare reference to one output of some other transaction, used by the
/// claim-building functions so they need not carry the whole parent
/// `Transaction` around just to read one `TxOut` and its index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TxOutRef {
    pub vout: u32,
}

/// Failures from the transaction-construction library. Every function here
/// is total over well-formed inputs; these are the only two ways a
/// well-formed input can still fail to produce a spendable transaction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum TxBuilderError {
    /// the parent transaction has no output at the index this claim
    /// expects to spend
    OutputNotFound,

    /// claim amount of {0} sat after fee is below the dust limit of
    /// {1} sat
    AmountBelowDustLimit(u64, u64),
}
