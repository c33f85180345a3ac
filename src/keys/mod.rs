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

//! Channel basepoints, per-commitment key tweaking and the per-commitment
//! secret chain (BOLT-3 section "`shachain`").

mod derive;
mod shachain;

pub use derive::{
    derive_pubkey, derive_revocation_pubkey, revocation_privkey,
};
pub use shachain::{ShaChain, ShaChainError};

use std::collections::BTreeMap;

use amplify::DumbDefault;
use bitcoin::util::bip32::{ChildNumber, ExtendedPrivKey, KeySource};
use bitcoin_scripts::PubkeyScript;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// A public key together with the derivation path that produced it, so a
/// collaborating hardware wallet or remote signer can be told how to
/// re-derive the matching private key.
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct LocalPubkey {
    pub key: PublicKey,
    pub source: KeySource,
}

impl LocalPubkey {
    pub fn to_bip32_derivation_map(&self) -> BTreeMap<PublicKey, KeySource> {
        bmap! { self.key => self.source.clone() }
    }

    pub fn to_bitcoin_pk(&self) -> bitcoin::PublicKey {
        bitcoin::PublicKey::new(self.key)
    }
}

impl DumbDefault for LocalPubkey {
    fn dumb_default() -> Self {
        LocalPubkey {
            key: dumb_pubkey!(),
            source: KeySource::default(),
        }
    }
}

/// The five BOLT-3 basepoints plus the first per-commitment point, owned by
/// the local party. Held by value inside a [`crate::channel::ChannelState`];
/// cloning is cheap (public key material only).
#[derive(Clone, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct LocalKeyset {
    pub funding_pubkey: LocalPubkey,
    pub revocation_basepoint: LocalPubkey,
    pub payment_basepoint: LocalPubkey,
    pub delayed_payment_basepoint: LocalPubkey,
    pub htlc_basepoint: LocalPubkey,
    pub first_per_commitment_point: LocalPubkey,
    pub first_per_commitment_secret: Option<SecretKey>,
    /// Present once a `shutdown` scriptpubkey was pinned at opening time
    /// (`option_upfront_shutdown_script`).
    pub shutdown_scriptpubkey: Option<PubkeyScript>,
    pub static_remotekey: bool,
}

impl DumbDefault for LocalKeyset {
    fn dumb_default() -> Self {
        LocalKeyset {
            funding_pubkey: DumbDefault::dumb_default(),
            revocation_basepoint: DumbDefault::dumb_default(),
            payment_basepoint: DumbDefault::dumb_default(),
            delayed_payment_basepoint: DumbDefault::dumb_default(),
            htlc_basepoint: DumbDefault::dumb_default(),
            first_per_commitment_point: DumbDefault::dumb_default(),
            first_per_commitment_secret: None,
            shutdown_scriptpubkey: None,
            static_remotekey: false,
        }
    }
}

/// Mirror of [`LocalKeyset`] holding only what the remote party disclosed in
/// `open_channel`/`accept_channel` (bare public keys, no derivation source).
#[derive(Clone, Copy, PartialEq, Eq, Debug, StrictEncode, StrictDecode)]
pub struct RemoteKeyset {
    pub funding_pubkey: PublicKey,
    pub revocation_basepoint: PublicKey,
    pub payment_basepoint: PublicKey,
    pub delayed_payment_basepoint: PublicKey,
    pub htlc_basepoint: PublicKey,
    pub first_per_commitment_point: PublicKey,
    pub static_remotekey: bool,
}

impl DumbDefault for RemoteKeyset {
    fn dumb_default() -> Self {
        RemoteKeyset {
            funding_pubkey: dumb_pubkey!(),
            revocation_basepoint: dumb_pubkey!(),
            payment_basepoint: dumb_pubkey!(),
            delayed_payment_basepoint: dumb_pubkey!(),
            htlc_basepoint: dumb_pubkey!(),
            first_per_commitment_point: dumb_pubkey!(),
            static_remotekey: false,
        }
    }
}

/// LNPBP-46-style hardened derivation of the six channel basepoints plus
/// the first per-commitment secret from a single per-channel extended key.
/// Index assignment follows BOLT-3's advisory layout: `0` funding, `1`
/// payment, `2` delayed_payment, `3` revocation, `4` first per-commitment,
/// `5` htlc.
impl LocalKeyset {
    pub fn with<C: secp256k1::Signing>(
        secp: &Secp256k1<C>,
        channel_source: KeySource,
        channel_xpriv: ExtendedPrivKey,
        shutdown_scriptpubkey: Option<PubkeyScript>,
    ) -> Self {
        let fingerprint = channel_source.0;

        let path_for = |index: u32| {
            [ChildNumber::from_hardened_idx(index)
                .expect("index <= 5 is always a valid hardened child")]
        };

        let seckey_at = |index: u32| {
            channel_xpriv
                .derive_priv(secp, &path_for(index))
                .expect("negligible probability")
                .private_key
        };

        let pubkey_at = |index: u32| -> LocalPubkey {
            let seckey = seckey_at(index);
            let derivation_path = channel_source.1.clone().extend(path_for(index));
            LocalPubkey {
                key: PublicKey::from_secret_key(secp, &seckey),
                source: (fingerprint, derivation_path),
            }
        };

        LocalKeyset {
            funding_pubkey: pubkey_at(0),
            payment_basepoint: pubkey_at(1),
            delayed_payment_basepoint: pubkey_at(2),
            revocation_basepoint: pubkey_at(3),
            first_per_commitment_point: pubkey_at(4),
            first_per_commitment_secret: Some(seckey_at(4)),
            htlc_basepoint: pubkey_at(5),
            shutdown_scriptpubkey,
            static_remotekey: false,
        }
    }
}
