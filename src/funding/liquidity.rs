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

//! Liquidity purchase: a splice initiator renting inbound capacity from
//! the acceptor, paid for out of the initiator's own to-local balance.

use bitcoin::hashes::{sha256, Hash, HashEngine};
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, Verification};

use crate::funding::InteractiveTxError;

/// The initiator's request, quoting the feerate it expects the acceptor's
/// contributed inputs to justify.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RequestFunding {
    pub requested_sats: u64,
    pub funding_feerate_per_kw: u32,
}

/// The acceptor's signed commitment to provide `requested_sats` of
/// funding, together with the fee the initiator will pay for it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WillFund {
    pub funded_sats: u64,
    pub fee_base_sat: u64,
    pub fee_proportional_millionths: u32,
    pub signature: Signature,
}

impl WillFund {
    pub fn total_fee_sat(&self) -> u64 {
        self.fee_base_sat
            + (self.funded_sats * self.fee_proportional_millionths as u64) / 1_000_000
    }

    fn signed_digest(request: &RequestFunding, funded_sats: u64) -> Message {
        let mut engine = sha256::Hash::engine();
        engine.input(&request.requested_sats.to_be_bytes());
        engine.input(&request.funding_feerate_per_kw.to_be_bytes());
        engine.input(&funded_sats.to_be_bytes());
        let hash = sha256::Hash::from_engine(engine);
        Message::from_slice(&hash.into_inner()).expect("32-byte hash is always a valid message")
    }

    /// Verifies the acceptor's signature over the request plus the amount
    /// actually offered, using the acceptor's node (not channel) key.
    pub fn verify<C: Verification>(
        &self,
        secp: &Secp256k1<C>,
        request: &RequestFunding,
        acceptor_node_pubkey: PublicKey,
    ) -> Result<(), InteractiveTxError> {
        let digest = Self::signed_digest(request, self.funded_sats);
        secp.verify_ecdsa(&digest, &self.signature, &acceptor_node_pubkey)
            .map_err(|_| InteractiveTxError::InvalidLiquidityWitness)
    }
}

#[cfg(test)]
mod test {
    use secp256k1::SecretKey;

    use super::*;

    #[test]
    fn total_fee_combines_base_and_proportional() {
        let offer = WillFund {
            funded_sats: 1_000_000,
            fee_base_sat: 500,
            fee_proportional_millionths: 1000,
            signature: dummy_signature(),
        };
        assert_eq!(offer.total_fee_sat(), 500 + 1000);
    }

    #[test]
    fn valid_signature_verifies() {
        let secp = Secp256k1::new();
        let seckey = SecretKey::from_slice(&[7u8; 32]).unwrap();
        let pubkey = PublicKey::from_secret_key(&secp, &seckey);
        let request = RequestFunding { requested_sats: 500_000, funding_feerate_per_kw: 2000 };
        let funded_sats = 500_000;
        let digest = WillFund::signed_digest(&request, funded_sats);
        let signature = secp.sign_ecdsa(&digest, &seckey);
        let offer = WillFund {
            funded_sats,
            fee_base_sat: 0,
            fee_proportional_millionths: 0,
            signature,
        };
        assert!(offer.verify(&secp, &request, pubkey).is_ok());
    }

    #[test]
    fn tampered_amount_fails_verification() {
        let secp = Secp256k1::new();
        let seckey = SecretKey::from_slice(&[7u8; 32]).unwrap();
        let pubkey = PublicKey::from_secret_key(&secp, &seckey);
        let request = RequestFunding { requested_sats: 500_000, funding_feerate_per_kw: 2000 };
        let digest = WillFund::signed_digest(&request, 500_000);
        let signature = secp.sign_ecdsa(&digest, &seckey);
        let offer = WillFund {
            funded_sats: 600_000,
            fee_base_sat: 0,
            fee_proportional_millionths: 0,
            signature,
        };
        assert!(offer.verify(&secp, &request, pubkey).is_err());
    }

    fn dummy_signature() -> Signature {
        let secp = Secp256k1::new();
        let seckey = SecretKey::from_slice(&[1u8; 32]).unwrap();
        let msg = Message::from_slice(&[2u8; 32]).unwrap();
        secp.sign_ecdsa(&msg, &seckey)
    }
}
