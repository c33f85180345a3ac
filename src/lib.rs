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

#![recursion_limit = "256"]
// Coding conventions
#![deny(
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case,
    unused_mut,
    unused_imports,
    dead_code,
    //missing_docs
)]

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate strict_encoding;
#[macro_use]
extern crate lightning_encoding;

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde_with;
#[cfg(feature = "serde")]
extern crate serde_crate as serde;

#[macro_use]
extern crate log;

/// A placeholder public key with no known discrete log, used only to fill
/// in `DumbDefault` implementations for round-trip tests and scaffolding
/// that never actually signs anything.
macro_rules! dumb_pubkey {
    () => {
        secp256k1::PublicKey::from_secret_key(
            secp256k1::SECP256K1,
            &secp256k1::ONE_KEY,
        )
    };
}

pub mod error;
pub mod keys;
pub mod params;
pub mod policy;
pub mod htlc;
pub mod commitment_spec;
pub mod txbuilder;
pub mod commitment;
pub mod channel;
pub mod funding;
pub mod forceclose;
pub mod wire;
pub mod persistence;
pub mod chain_iface;
pub mod publisher;

pub use channel::{Channel, ChannelState, Lifecycle};
pub use error::Error;
