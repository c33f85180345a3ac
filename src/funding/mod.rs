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

//! The interactive funding session: dual-funded opening, splicing and RBF
//! all drive the same round-based contribution protocol, specialised by
//! the modules here.

pub mod liquidity;
pub mod rbf;
pub mod session;
pub mod splice;

pub use liquidity::{RequestFunding, WillFund};
pub use rbf::{validate_rbf_attempt, AttemptStatus, RbfAttempts};
pub use session::{Contribution, InteractiveTxError, InteractiveTxSession, SessionPhase};
pub use splice::{balance_delta_sat, find_shared_funding};
