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

//! BOLT-3 per-commitment key tweaking: `pubkey = basepoint +
//! SHA256(per_commitment_point || basepoint) * G`, and the revocation
//! pubkey's two-term combination.

use bitcoin::hashes::{sha256, Hash, HashEngine};
use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// Derives `payment_pubkey`, `delayed_payment_pubkey` or `htlc_pubkey` for a
/// given per-commitment point, per BOLT-3 `derivation of per-commitment
/// secrets and keys`.
pub fn derive_pubkey(
    basepoint: PublicKey,
    per_commitment_point: PublicKey,
) -> PublicKey {
    let secp = Secp256k1::verification_only();
    let mut engine = sha256::Hash::engine();
    engine.input(&per_commitment_point.serialize());
    engine.input(&basepoint.serialize());
    let tweak = sha256::Hash::from_engine(engine);

    let mut tweaked = basepoint;
    tweaked
        .add_exp_assign(&secp, tweak.as_ref())
        .expect("negligible probability of tweak landing on the curve order");
    tweaked
}

/// Derives the matching private key for [`derive_pubkey`], used by the
/// party that owns `base_secret`.
pub fn derive_privkey(
    base_secret: SecretKey,
    basepoint: PublicKey,
    per_commitment_point: PublicKey,
) -> SecretKey {
    let mut engine = sha256::Hash::engine();
    engine.input(&per_commitment_point.serialize());
    engine.input(&basepoint.serialize());
    let tweak = sha256::Hash::from_engine(engine);

    let mut tweaked = base_secret;
    tweaked
        .add_assign(tweak.as_ref())
        .expect("negligible probability of tweak landing on the curve order");
    tweaked
}

/// Derives the revocation pubkey from the revocation basepoint and the
/// per-commitment point. Constructible by either party, but only usable by
/// the counterparty once they also know `per_commitment_secret`.
pub fn derive_revocation_pubkey(
    revocation_basepoint: PublicKey,
    per_commitment_point: PublicKey,
) -> PublicKey {
    let secp = Secp256k1::verification_only();

    let mut tweaked_basepoint = revocation_basepoint;
    let mut engine = sha256::Hash::engine();
    engine.input(&revocation_basepoint.serialize());
    engine.input(&per_commitment_point.serialize());
    let basepoint_tweak = sha256::Hash::from_engine(engine);
    tweaked_basepoint
        .mul_assign(&secp, basepoint_tweak.as_ref())
        .expect("negligible probability");

    let mut tweaked_point = per_commitment_point;
    let mut engine = sha256::Hash::engine();
    engine.input(&per_commitment_point.serialize());
    engine.input(&revocation_basepoint.serialize());
    let point_tweak = sha256::Hash::from_engine(engine);
    tweaked_point
        .mul_assign(&secp, point_tweak.as_ref())
        .expect("negligible probability");

    tweaked_basepoint
        .combine(&tweaked_point)
        .expect("negligible probability")
}

/// Derives the revocation private key once the per-commitment secret for the
/// now-superseded commitment has been revealed. Only ever computable by the
/// counterparty, after `revoke_and_ack`.
pub fn revocation_privkey(
    revocation_base_secret: SecretKey,
    revocation_basepoint: PublicKey,
    per_commitment_secret: SecretKey,
    per_commitment_point: PublicKey,
) -> SecretKey {
    let mut engine = sha256::Hash::engine();
    engine.input(&revocation_basepoint.serialize());
    engine.input(&per_commitment_point.serialize());
    let basepoint_tweak = sha256::Hash::from_engine(engine);
    let mut part_a = revocation_base_secret;
    part_a
        .mul_assign(basepoint_tweak.as_ref())
        .expect("negligible probability");

    let mut engine = sha256::Hash::engine();
    engine.input(&per_commitment_point.serialize());
    engine.input(&revocation_basepoint.serialize());
    let point_tweak = sha256::Hash::from_engine(engine);
    let mut part_b = per_commitment_secret;
    part_b
        .mul_assign(point_tweak.as_ref())
        .expect("negligible probability");

    part_a
        .add_assign(part_b.as_ref())
        .expect("negligible probability");
    part_a
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    fn pk(hex: &str) -> PublicKey {
        PublicKey::from_str(hex).unwrap()
    }

    #[test]
    fn bolt3_pubkey_derivation_vector() {
        let base_point = pk("036d6caac248af96f6afa7f904f550253a0f3ef3f5aa2fe6838a95b216691468e2");
        let per_commitment_point = pk("025f7117a78150fe2ef97db7cfc83bd57b2e2c0d0dd25eaf467a4a1c2a45ce1486");
        assert_eq!(
            derive_pubkey(base_point, per_commitment_point),
            pk("0235f2dbfaa89b57ec7b055afe29849ef7ddfeb1cefdb9ebdc43f5494984db29e5")
        );
    }

    #[test]
    fn bolt3_revocation_pubkey_vector() {
        let base_point = pk("036d6caac248af96f6afa7f904f550253a0f3ef3f5aa2fe6838a95b216691468e2");
        let per_commitment_point = pk("025f7117a78150fe2ef97db7cfc83bd57b2e2c0d0dd25eaf467a4a1c2a45ce1486");
        assert_eq!(
            derive_revocation_pubkey(base_point, per_commitment_point),
            pk("02916e326636d19c33f13e8c0c3a03dd157f332f3e99c317c141dd865eb01f8ff0")
        );
    }
}
