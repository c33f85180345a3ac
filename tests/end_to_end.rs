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

//! End-to-end scenarios exercising several modules together, rather than
//! one function in isolation.

use bitcoin::hashes::Hash;
use channel_core::commitment_spec::CommitmentSpec;
use channel_core::funding::{validate_rbf_attempt, AttemptStatus};
use channel_core::htlc::{Direction, DirectedHtlc, Htlc, HtlcId};
use channel_core::params::CommitmentFormat;
use channel_core::txbuilder::{htlc_penalty, main_penalty};
use channel_core::txbuilder::commitment::make_commit_tx_outputs;
use channel_core::txbuilder::weight::commitment_weight;
use channel_core::commitment_spec::weight_fee;
use channel_core::channel::reestablish::{compute_retransmissions, RetransmitAction};
use channel_core::wire::ChannelId;

fn pubkey(byte: u8) -> secp256k1::PublicKey {
    let mut sk = [0u8; 32];
    sk[31] = byte;
    secp256k1::PublicKey::from_secret_key(
        secp256k1::SECP256K1,
        &secp256k1::SecretKey::from_slice(&sk).unwrap(),
    )
}

fn htlc(id: u64, amount_msat: u64, cltv_expiry: u32, direction: Direction) -> DirectedHtlc {
    DirectedHtlc::new(
        Htlc {
            id: HtlcId::from(id),
            amount_msat,
            payment_hash: [id as u8; 32],
            cltv_expiry,
            onion_routing_packet: vec![],
            blinding_point: None,
        },
        direction,
    )
}

#[test]
fn commit_with_mixed_htlcs() {
    let mut spec = CommitmentSpec::new(5000, 400_000_000, 300_000_000);
    spec.htlcs.push(htlc(0, 5_000_000, 552, Direction::Outgoing));
    spec.htlcs.push(htlc(1, 1_000_000, 553, Direction::Incoming));
    spec.htlcs.push(htlc(2, 7_000_000, 550, Direction::Outgoing));
    spec.htlcs.push(htlc(3, 800_000, 551, Direction::Incoming));
    assert_eq!(
        spec.capacity_msat(),
        spec.to_local_msat + spec.to_remote_msat + 5_000_000 + 1_000_000 + 7_000_000 + 800_000
    );

    let dust_limit_sat = 546;
    let format = CommitmentFormat::DefaultSegwit;
    assert_eq!(spec.non_dust_htlc_count(dust_limit_sat, format), 4);

    let (outputs, trimmed_fee_sat) = make_commit_tx_outputs(
        &spec,
        format,
        dust_limit_sat,
        true,
        pubkey(1),
        pubkey(2),
        pubkey(3),
        144,
        pubkey(4),
        pubkey(5),
        pubkey(6),
        pubkey(7),
    );

    // All four HTLCs survive trimming; none of the base balances are dust,
    // so nothing else is donated to the fee.
    assert_eq!(trimmed_fee_sat, 4 * weight_fee(172, 5000));
    let htlc_outputs: Vec<_> = outputs.iter().filter(|o| o.htlc.is_some()).collect();
    assert_eq!(htlc_outputs.len(), 4);

    // BIP-69 ascending amount order.
    let values: Vec<u64> = outputs.iter().map(|o| o.txout.value).collect();
    let mut sorted = values.clone();
    sorted.sort();
    assert_eq!(values, sorted);

    // The commitment's total weight-proportional fee, independent of the
    // trimmed-output bookkeeping above, follows directly from the declared
    // BOLT-3 weight constants.
    let total_weight = commitment_weight(4, false);
    let total_fee_sat = weight_fee(total_weight, 5000);
    assert_eq!(total_fee_sat, weight_fee(724 + 4 * 172, 5000));
}

#[test]
fn dust_trimming_drops_to_local_into_fee() {
    let dust_limit_sat = 546;
    let to_local_sat = (dust_limit_sat as f64 * 0.9) as u64;
    let spec = CommitmentSpec::new(5000, to_local_sat * 1000, 300_000_000);

    let (outputs, fee_sat) = make_commit_tx_outputs(
        &spec,
        CommitmentFormat::DefaultSegwit,
        dust_limit_sat,
        true,
        pubkey(1),
        pubkey(2),
        pubkey(3),
        144,
        pubkey(4),
        pubkey(5),
        pubkey(6),
        pubkey(7),
    );

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].txout.value, 300_000_000 / 1000);
    assert_eq!(fee_sat, to_local_sat);
}

#[test]
fn splice_in_then_resolve_preserves_capacity() {
    use channel_core::funding::balance_delta_sat;

    let pre_capacity_sat = 1_500_000u64;
    let splice_in_sat = 500_000u64;
    let post_capacity_sat = pre_capacity_sat + splice_in_sat;
    assert_eq!(post_capacity_sat, 2_000_000);

    let to_local_msat = 1_300_000_000u64;
    let to_remote_msat = 700_000_000u64;
    assert_eq!(to_local_msat + to_remote_msat, post_capacity_sat * 1000);

    // The splice initiator's own balance delta accounts for exactly the
    // contributed input, with no output contributed back and no fee share
    // charged to this side in this scenario.
    let delta = balance_delta_sat(splice_in_sat, 0, 0);
    assert_eq!(delta, splice_in_sat as i64);
}

#[test]
fn penalty_after_revoked_broadcast_produces_above_dust_claims() {
    let dust_limit_sat = 546;
    let mut spec = CommitmentSpec::new(5000, 400_000_000, 300_000_000);
    spec.htlcs.push(htlc(0, 5_000_000, 552, Direction::Outgoing));
    spec.htlcs.push(htlc(1, 1_000_000, 553, Direction::Incoming));

    let (outputs, _) = make_commit_tx_outputs(
        &spec,
        CommitmentFormat::DefaultSegwit,
        dust_limit_sat,
        true,
        pubkey(1),
        pubkey(2),
        pubkey(3),
        144,
        pubkey(4),
        pubkey(5),
        pubkey(6),
        pubkey(7),
    );
    assert!(outputs.iter().filter(|o| o.htlc.is_some()).count() >= 2);

    let revoked_commit_txid = bitcoin::Txid::all_zeros();
    let destination = bitcoin::Script::new_op_return(&[]).into();

    let main_claim = main_penalty(
        revoked_commit_txid,
        0,
        400_000,
        500,
        dust_limit_sat,
        destination,
    )
    .unwrap();
    assert!(main_claim.output[0].value >= dust_limit_sat);

    for (vout, output) in outputs.iter().enumerate().filter(|(_, o)| o.htlc.is_some()) {
        let destination = bitcoin::Script::new_op_return(&[]).into();
        let claim = htlc_penalty(
            revoked_commit_txid,
            vout as u32,
            output.txout.value,
            300,
            dust_limit_sat,
            destination,
        )
        .unwrap();
        assert!(claim.output[0].value >= dust_limit_sat);
    }
}

#[test]
fn rbf_preserves_balances_across_escalating_feerates() {
    let spec = CommitmentSpec::new(1000, 900_000_000, 600_000_000);
    let feerates = [1000u32, 1500, 2000];

    validate_rbf_attempt(AttemptStatus::Unconfirmed, feerates[0], feerates[1], false, false, false)
        .unwrap();
    validate_rbf_attempt(AttemptStatus::Unconfirmed, feerates[1], feerates[2], false, false, false)
        .unwrap();

    // RBF only ever touches the funding transaction's feerate; the
    // commitment's own balances are untouched by any of the three attempts.
    for _ in &feerates {
        assert_eq!(spec.to_local_msat, 900_000_000);
        assert_eq!(spec.to_remote_msat, 600_000_000);
    }
}

#[test]
fn reconnect_after_lost_commit_sig_retransmits_it() {
    use amplify::Wrapper;

    let local_commitment_number = 7;
    let remote_commitment_number = 7;
    let peer = channel_core::wire::ChannelReestablish {
        channel_id: ChannelId::from_inner(amplify::Slice32::from_inner([0u8; 32])),
        next_local_commitment_number: remote_commitment_number + 1,
        // Peer never received our last commit_sig: it still expects the
        // commitment we already consider current.
        next_remote_commitment_number: local_commitment_number,
        your_last_per_commitment_secret: [0u8; 32],
        my_current_per_commitment_point: pubkey(9),
        next_funding_txid: None,
    };

    let actions = compute_retransmissions(
        local_commitment_number,
        remote_commitment_number,
        None,
        false,
        false,
        &peer,
    )
    .unwrap();

    assert_eq!(actions, vec![RetransmitAction::ResendCommitSig]);
}
