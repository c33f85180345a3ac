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

//! Reacting to an on-chain commitment publication: classifying what was
//! observed, then queuing the claim transactions it calls for.

pub mod classify;
pub mod reactor;

pub use classify::{classify, ForceCloseClass, ForceCloseError};
pub use reactor::{
    check_before_publish, htlc_confirmation_target, react_our_commitment,
    AlternativeCommitRace, ConfirmationTarget, PendingClaim, Urgency,
};
