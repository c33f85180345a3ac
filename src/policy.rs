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

//! Local node policy for validating the peer-proposed parameters carried in
//! `open_channel`/`accept_channel`, and the typed parameter sets those
//! messages produce once accepted.

use std::ops::Range;

use crate::wire::{AcceptChannel, ChannelType, OpenChannel};

/// Limit for the maximum number of the accepted HTLCs towards some node.
pub const BOLT3_MAX_ACCEPTED_HTLC_LIMIT: u16 = 483;

/// BOLT-3 dust limit.
pub const BOLT3_DUST_LIMIT: u64 = 354;

/// Errors from policy validation of `open_channel` and `accept_channel`
/// messages.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Display,
    Error,
    StrictEncode,
    StrictDecode
)]
#[display(doc_comments)]
pub enum PolicyError {
    /// proposed `to_self_delay` value {proposed} is unreasonably large and
    /// exceeds node policy limit of {allowed_maximum}; rejecting the channel
    ToSelfDelayUnreasonablyLarge { proposed: u16, allowed_maximum: u16 },

    /// proposed limit for maximum accepted number of HTLCs {0} exceeds
    /// BOLT-3 requirement to be below 483; rejecting the channel
    MaxAcceptedHtlcLimitExceeded(u16),

    /// proposed fee rate {proposed} sat/kw is outside of the fee rate
    /// policy of the local node ({lowest_accepted}..{highest_accepted}
    /// sat/kw); rejecting the channel
    FeeRateUnreasonable {
        proposed: u32,
        lowest_accepted: u32,
        highest_accepted: u32,
    },

    /// proposed channel reserve limit {reserve} sat is less than dust
    /// limit {dust_limit} sat; rejecting the channel
    ChannelReserveLessDust { reserve: u64, dust_limit: u64 },

    /// dust limit {0} sat is less than protocol minimum requirement of
    /// 354 sat; rejecting the channel
    DustLimitTooSmall(u64),

    /// offered channel funding of {proposed} sat is too small and less
    /// than {required_minimum} required by the node policy
    ChannelFundingTooSmall {
        proposed: u64,
        required_minimum: u64,
    },

    /// HTLC minimum {proposed} is too large and exceeds node policy
    /// requirements ({allowed_maximum})
    HtlcMinimumTooLarge { proposed: u64, allowed_maximum: u64 },

    /// HTLC-in-flight maximum requirement of {proposed} is too small and
    /// does not match the node policy; the smallest requirement is
    /// {required_minimum}
    HtlcInFlightMaximumTooSmall {
        proposed: u64,
        required_minimum: u64,
    },

    /// requested {proposed} channel reserve is too large and exceeds
    /// local policy requirement of {allowed_maximum}
    ChannelReserveTooLarge { proposed: u64, allowed_maximum: u64 },

    /// maximum number of HTLCs {proposed} that can be accepted by the
    /// remote node is too small and does not match node policy
    /// requirement of {required_minimum}
    MaxAcceptedHtlcsTooSmall {
        proposed: u16,
        required_minimum: u16,
    },

    /// dust limit {proposed} sats exceeds node policy requirement of
    /// {allowed_maximum}
    DustLimitTooLarge { proposed: u64, allowed_maximum: u64 },

    /// minimum depth of {proposed} requested by the remote peer exceeds
    /// local policy limit of {allowed_maximum}
    UnreasonableMinDepth { proposed: u32, allowed_maximum: u32 },

    /// `channel_reserve_satoshis` ({channel_reserve}) is less than
    /// `dust_limit_satoshis` ({dust_limit}) within the `open_channel`
    /// message
    LocalDustExceedsRemoteReserve {
        channel_reserve: u64,
        dust_limit: u64,
    },

    /// `channel_reserve_satoshis` from the `open_channel` message
    /// ({channel_reserve}) is less than `dust_limit_satoshis`
    /// ({dust_limit})
    RemoteDustExceedsLocalReserve {
        channel_reserve: u64,
        dust_limit: u64,
    },
}

/// Policy used to validate channel parameters proposed by a remote peer.
///
/// A new channel uses the reasonable defaults from [`Policy::default`]
/// unless the node operator supplies a custom policy.
#[derive(Clone, Eq, PartialEq, Hash, Debug, StrictEncode, StrictDecode)]
pub struct Policy {
    /// Reasonable limit to check the value of `to_self_delay` required by
    /// a remote node, in blocks.
    pub to_self_delay_max: u16,

    /// Range of acceptable channel fees.
    pub feerate_per_kw_range: Range<u32>,

    /// Minimum funding transaction mining depth required from the remote
    /// node for a channel proposed by it.
    pub minimum_depth: u32,

    /// Maximum funding transaction mining depth which may be required by
    /// a remote node for a channel opened by the local node.
    pub maximum_depth: Option<u32>,

    /// Minimum funding for a channel opened by the local node.
    pub funding_satoshis_min: Option<u64>,

    /// Maximum acceptable limit on the value stored in a single HTLC.
    pub htlc_minimum_msat_max: Option<u64>,

    /// Minimum boundary for the upper limit of in-flight HTLC funds.
    pub max_htlc_value_in_flight_msat_min: Option<u64>,

    /// Maximum reserve for a channel from the local node required by the
    /// remote node, in absolute value.
    pub channel_reserve_satoshis_max_abs: Option<u64>,

    /// Maximum reserve for a channel from the local node required by the
    /// remote node, as a percentage of the channel funding.
    pub channel_reserve_satoshis_max_percent: Option<u8>,

    /// Minimum boundary on the limit of HTLCs offered to a remote peer.
    pub max_accepted_htlcs_min: Option<u16>,

    /// Maximum value for the dust limit required by a remote node.
    pub dust_limit_satoshis_max: Option<u64>,
}

impl Default for Policy {
    /// Reasonable values for the local node policy.
    fn default() -> Policy {
        Policy {
            to_self_delay_max: 250,
            feerate_per_kw_range: 1..500,
            minimum_depth: 3,
            maximum_depth: Some(6),
            funding_satoshis_min: Some(10000),
            htlc_minimum_msat_max: None,
            max_htlc_value_in_flight_msat_min: Some(10000),
            max_accepted_htlcs_min: Some(10),
            channel_reserve_satoshis_max_abs: None,
            channel_reserve_satoshis_max_percent: Some(10),
            dust_limit_satoshis_max: Some(1000),
        }
    }
}

impl Policy {
    /// Policy matching c-lightning's defaults.
    pub fn with_clightning_defaults() -> Policy {
        Policy {
            to_self_delay_max: 14 * 24 * 6,
            feerate_per_kw_range: 1..1000,
            minimum_depth: 3,
            maximum_depth: Some(6),
            funding_satoshis_min: Some(10000),
            htlc_minimum_msat_max: None,
            max_htlc_value_in_flight_msat_min: Some(10000),
            max_accepted_htlcs_min: Some(10),
            channel_reserve_satoshis_max_abs: None,
            channel_reserve_satoshis_max_percent: Some(10),
            dust_limit_satoshis_max: Some(546),
        }
    }

    /// Policy matching LND's defaults.
    pub fn with_lnd_defaults() -> Policy {
        Policy {
            to_self_delay_max: 14 * 24 * 6,
            feerate_per_kw_range: 1..1000,
            minimum_depth: 3,
            maximum_depth: Some(6),
            funding_satoshis_min: Some(20000),
            htlc_minimum_msat_max: None,
            max_htlc_value_in_flight_msat_min: Some(10000),
            max_accepted_htlcs_min: Some(10),
            channel_reserve_satoshis_max_abs: None,
            channel_reserve_satoshis_max_percent: Some(1),
            dust_limit_satoshis_max: Some(546),
        }
    }

    /// Policy matching Eclair's defaults.
    pub fn with_eclair_defaults() -> Policy {
        Policy {
            to_self_delay_max: 14 * 24 * 6,
            feerate_per_kw_range: 1..1000,
            minimum_depth: 3,
            maximum_depth: Some(6),
            funding_satoshis_min: Some(100000),
            htlc_minimum_msat_max: None,
            max_htlc_value_in_flight_msat_min: Some(10000),
            max_accepted_htlcs_min: Some(10),
            channel_reserve_satoshis_max_abs: None,
            channel_reserve_satoshis_max_percent: Some(5),
            dust_limit_satoshis_max: Some(546),
        }
    }

    /// `to_self_delay` and the 483 HTLC-count ceiling are protocol-wide
    /// constants, independent of any per-node policy knob.
    fn check_protocol_limits(&self, params: PeerParams) -> Result<(), PolicyError> {
        if params.to_self_delay > self.to_self_delay_max {
            return Err(PolicyError::ToSelfDelayUnreasonablyLarge {
                proposed: params.to_self_delay,
                allowed_maximum: self.to_self_delay_max,
            });
        }

        if params.max_accepted_htlcs > BOLT3_MAX_ACCEPTED_HTLC_LIMIT {
            return Err(PolicyError::MaxAcceptedHtlcLimitExceeded(
                params.max_accepted_htlcs,
            ));
        }

        Ok(())
    }

    /// The dust limit must sit between the BOLT-3 floor and the channel
    /// reserve (a reserve smaller than dust would leave nothing enforceable
    /// on-chain).
    fn check_dust_limit(&self, params: PeerParams) -> Result<(), PolicyError> {
        if params.dust_limit_satoshis > params.channel_reserve_satoshis {
            return Err(PolicyError::ChannelReserveLessDust {
                reserve: params.channel_reserve_satoshis,
                dust_limit: params.dust_limit_satoshis,
            });
        }

        if params.dust_limit_satoshis < BOLT3_DUST_LIMIT {
            return Err(PolicyError::DustLimitTooSmall(
                params.dust_limit_satoshis,
            ));
        }

        if let Some(limit) = self.dust_limit_satoshis_max {
            if params.dust_limit_satoshis > limit {
                return Err(PolicyError::DustLimitTooLarge {
                    proposed: params.dust_limit_satoshis,
                    allowed_maximum: limit,
                });
            }
        }

        Ok(())
    }

    /// HTLC sizing: the per-HTLC minimum and the aggregate in-flight cap.
    fn check_htlc_value_limits(&self, params: PeerParams) -> Result<(), PolicyError> {
        if let Some(limit) = self.htlc_minimum_msat_max {
            if params.htlc_minimum_msat > limit {
                return Err(PolicyError::HtlcMinimumTooLarge {
                    proposed: params.htlc_minimum_msat,
                    allowed_maximum: limit,
                });
            }
        }

        if let Some(limit) = self.max_htlc_value_in_flight_msat_min {
            if params.max_htlc_value_in_flight_msat < limit {
                return Err(PolicyError::HtlcInFlightMaximumTooSmall {
                    proposed: params.max_htlc_value_in_flight_msat,
                    required_minimum: limit,
                });
            }
        }

        if let Some(limit) = self.max_accepted_htlcs_min {
            if params.max_accepted_htlcs < limit {
                return Err(PolicyError::MaxAcceptedHtlcsTooSmall {
                    proposed: params.max_accepted_htlcs,
                    required_minimum: limit,
                });
            }
        }

        Ok(())
    }

    /// The absolute ceiling a local policy may place on the reserve it is
    /// willing to lock up for the counterparty.
    fn check_reserve_ceiling(&self, params: PeerParams) -> Result<(), PolicyError> {
        if let Some(limit) = self.channel_reserve_satoshis_max_abs {
            if params.channel_reserve_satoshis > limit {
                return Err(PolicyError::ChannelReserveTooLarge {
                    proposed: params.channel_reserve_satoshis,
                    allowed_maximum: limit,
                });
            }
        }

        Ok(())
    }

    fn validate_peer_params(
        &self,
        params: PeerParams,
    ) -> Result<(), PolicyError> {
        self.check_protocol_limits(params)
            .and_then(|_| self.check_dust_limit(params))
            .and_then(|_| self.check_htlc_value_limits(params))
            .and_then(|_| self.check_reserve_ceiling(params))
            .map_err(|error| {
                debug!("peer params rejected by local policy: {}", error);
                error
            })
    }

    /// Validates parameters proposed by a remote peer in an `open_channel`
    /// message against this policy, returning the [`PeerParams`] to use
    /// for constructing the transactions the local node must sign.
    pub fn validate_inbound(
        &self,
        open_channel: &OpenChannel,
    ) -> Result<PeerParams, PolicyError> {
        if !self
            .feerate_per_kw_range
            .contains(&open_channel.feerate_per_kw)
        {
            let error = PolicyError::FeeRateUnreasonable {
                proposed: open_channel.feerate_per_kw,
                lowest_accepted: self.feerate_per_kw_range.start,
                highest_accepted: self.feerate_per_kw_range.end,
            };
            warn!("rejecting inbound open_channel: {}", error);
            return Err(error);
        }

        if let Some(limit) = self.funding_satoshis_min {
            if open_channel.funding_satoshis < limit {
                let error = PolicyError::ChannelFundingTooSmall {
                    proposed: open_channel.funding_satoshis,
                    required_minimum: limit,
                };
                warn!("rejecting inbound open_channel: {}", error);
                return Err(error);
            }
        }

        if let Some(percents) = self.channel_reserve_satoshis_max_percent {
            let limit = open_channel.funding_satoshis as f64
                * (percents as f64 / 100.);
            let limit = limit as u64;
            if open_channel.channel_reserve_satoshis > limit {
                let error = PolicyError::ChannelReserveTooLarge {
                    proposed: open_channel.channel_reserve_satoshis,
                    allowed_maximum: limit,
                };
                warn!("rejecting inbound open_channel: {}", error);
                return Err(error);
            }
        }

        let peer_params = PeerParams::from(open_channel);
        self.validate_peer_params(peer_params)?;
        Ok(peer_params)
    }

    /// Confirms that the parameters asked for by a remote node in an
    /// `accept_channel` message conform to this policy, given the
    /// parameters the local node already proposed in `open_channel`.
    pub fn confirm_outbound(
        &self,
        our_params: PeerParams,
        accept_channel: &AcceptChannel,
    ) -> Result<PeerParams, PolicyError> {
        if let Some(limit) = self.maximum_depth {
            if accept_channel.minimum_depth > limit {
                let error = PolicyError::UnreasonableMinDepth {
                    proposed: accept_channel.minimum_depth,
                    allowed_maximum: limit,
                };
                warn!("rejecting accept_channel: {}", error);
                return Err(error);
            }
        }

        if accept_channel.channel_reserve_satoshis
            < our_params.dust_limit_satoshis
        {
            let error = PolicyError::LocalDustExceedsRemoteReserve {
                channel_reserve: accept_channel.channel_reserve_satoshis,
                dust_limit: our_params.dust_limit_satoshis,
            };
            warn!("rejecting accept_channel: {}", error);
            return Err(error);
        }

        if our_params.channel_reserve_satoshis
            < accept_channel.dust_limit_satoshis
        {
            let error = PolicyError::RemoteDustExceedsLocalReserve {
                channel_reserve: our_params.channel_reserve_satoshis,
                dust_limit: accept_channel.dust_limit_satoshis,
            };
            warn!("rejecting accept_channel: {}", error);
            return Err(error);
        }

        let peer_params = PeerParams::from(accept_channel);
        self.validate_peer_params(peer_params)?;
        Ok(peer_params)
    }
}

/// Channel parameters that both peers agree on at opening time and that
/// never change afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, StrictEncode, StrictDecode)]
pub struct CommonParams {
    /// Minimum depth of the funding transaction before the channel is
    /// considered open.
    pub minimum_depth: u32,

    /// Initial feerate in satoshi per 1000-weight that the channel opener
    /// pays for commitment and HTLC transactions; adjustable later via
    /// `update_fee`.
    pub feerate_per_kw: u32,

    /// Whether the initiator wishes to announce this channel publicly.
    pub announce_channel: bool,

    /// Persistent feature set negotiated for the channel's lifetime.
    pub channel_type: ChannelType,
}

impl Default for CommonParams {
    fn default() -> Self {
        CommonParams {
            minimum_depth: 3,
            feerate_per_kw: 256,
            announce_channel: true,
            channel_type: ChannelType::default(),
        }
    }
}

impl CommonParams {
    /// Extracts the common parameters from an incoming `open_channel`
    /// message plus the local node's own minimum-depth requirement.
    pub fn with(open_channel: &OpenChannel, minimum_depth: u32) -> Self {
        CommonParams {
            minimum_depth,
            feerate_per_kw: open_channel.feerate_per_kw,
            announce_channel: open_channel.should_announce_channel(),
            channel_type: open_channel.channel_type.unwrap_or_default(),
        }
    }
}

/// Channel parameters requested by one peer of the other; applies only to
/// the side that requested them and is used when constructing the
/// transactions the *other* side must sign.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, StrictEncode, StrictDecode)]
pub struct PeerParams {
    /// Threshold below which outputs on transactions broadcast by the
    /// requesting side will be omitted.
    pub dust_limit_satoshis: u64,

    /// Number of blocks the counterparty must wait to claim on-chain
    /// funds after broadcasting a commitment transaction.
    pub to_self_delay: u16,

    /// Smallest HTLC value this node will accept.
    pub htlc_minimum_msat: u64,

    /// Maximum inbound HTLC value in flight, in millisatoshi.
    pub max_htlc_value_in_flight_msat: u64,

    /// Minimum value, unencumbered by HTLCs, the counterparty must keep
    /// in the channel.
    pub channel_reserve_satoshis: u64,

    /// Maximum number of inbound HTLCs.
    pub max_accepted_htlcs: u16,
}

impl Default for PeerParams {
    fn default() -> Self {
        PeerParams {
            dust_limit_satoshis: BOLT3_DUST_LIMIT,
            to_self_delay: 3,
            htlc_minimum_msat: 1,
            max_htlc_value_in_flight_msat: 1_000_000_000,
            channel_reserve_satoshis: 10000,
            max_accepted_htlcs: BOLT3_MAX_ACCEPTED_HTLC_LIMIT,
        }
    }
}

impl From<&OpenChannel> for PeerParams {
    fn from(open_channel: &OpenChannel) -> Self {
        PeerParams {
            dust_limit_satoshis: open_channel.dust_limit_satoshis,
            to_self_delay: open_channel.to_self_delay,
            htlc_minimum_msat: open_channel.htlc_minimum_msat,
            max_htlc_value_in_flight_msat: open_channel
                .max_htlc_value_in_flight_msat,
            channel_reserve_satoshis: open_channel.channel_reserve_satoshis,
            max_accepted_htlcs: open_channel.max_accepted_htlcs,
        }
    }
}

impl From<&AcceptChannel> for PeerParams {
    fn from(accept_channel: &AcceptChannel) -> Self {
        PeerParams {
            dust_limit_satoshis: accept_channel.dust_limit_satoshis,
            to_self_delay: accept_channel.to_self_delay,
            htlc_minimum_msat: accept_channel.htlc_minimum_msat,
            max_htlc_value_in_flight_msat: accept_channel
                .max_htlc_value_in_flight_msat,
            channel_reserve_satoshis: accept_channel.channel_reserve_satoshis,
            max_accepted_htlcs: accept_channel.max_accepted_htlcs,
        }
    }
}

#[cfg(test)]
mod test {
    use amplify::DumbDefault;

    use super::*;

    /// A peer-proposed `open_channel` that satisfies every default policy
    /// knob; individual tests mutate one field away from this baseline.
    fn baseline_open_channel() -> OpenChannel {
        let mut open_channel = OpenChannel::dumb_default();
        open_channel.to_self_delay = 250;
        open_channel.max_accepted_htlcs = BOLT3_MAX_ACCEPTED_HTLC_LIMIT;
        open_channel.channel_reserve_satoshis = 10000;
        open_channel.max_htlc_value_in_flight_msat = 10000;
        open_channel.dust_limit_satoshis = BOLT3_DUST_LIMIT;
        open_channel.htlc_minimum_msat = 10;
        open_channel.feerate_per_kw = 1;
        open_channel
    }

    fn baseline_accept_channel() -> AcceptChannel {
        let mut accept_channel = AcceptChannel::dumb_default();
        accept_channel.to_self_delay = 250;
        accept_channel.max_accepted_htlcs = BOLT3_MAX_ACCEPTED_HTLC_LIMIT;
        accept_channel.channel_reserve_satoshis = 10000;
        accept_channel.max_htlc_value_in_flight_msat = 10000;
        accept_channel.dust_limit_satoshis = BOLT3_DUST_LIMIT;
        accept_channel.htlc_minimum_msat = 10;
        accept_channel
    }

    /// Every field mutation below violates exactly one `Policy` knob on top
    /// of [`baseline_open_channel`]; `validate_peer_params` must reject each
    /// with the corresponding error variant.
    #[test]
    fn validate_peer_params_rejects_each_policy_violation() {
        let policy = Policy::default();

        let cases: Vec<(&str, Box<dyn Fn(&mut OpenChannel)>)> = vec![
            ("to_self_delay", Box::new(|o: &mut OpenChannel| {
                o.to_self_delay = policy.to_self_delay_max + 1;
            })),
            ("max_accepted_htlcs", Box::new(|o: &mut OpenChannel| {
                o.max_accepted_htlcs = BOLT3_MAX_ACCEPTED_HTLC_LIMIT + 1;
            })),
            ("reserve_below_dust", Box::new(|o: &mut OpenChannel| {
                o.channel_reserve_satoshis = o.dust_limit_satoshis - 1;
            })),
            ("dust_below_protocol_floor", Box::new(|o: &mut OpenChannel| {
                o.dust_limit_satoshis = BOLT3_DUST_LIMIT - 1;
            })),
        ];

        for (label, mutate) in cases {
            let mut open_channel = baseline_open_channel();
            mutate(&mut open_channel);
            let params = PeerParams::from(&open_channel);
            assert!(
                policy.validate_peer_params(params).is_err(),
                "case {} should have been rejected",
                label
            );
        }
    }

    #[test]
    fn to_self_delay_violation_reports_both_bounds() {
        let policy = Policy::default();
        let mut open_channel = baseline_open_channel();
        open_channel.to_self_delay = policy.to_self_delay_max + 1;
        let params = PeerParams::from(&open_channel);

        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::ToSelfDelayUnreasonablyLarge {
                proposed: params.to_self_delay,
                allowed_maximum: policy.to_self_delay_max,
            })
        );
    }

    #[test]
    fn dust_limit_errors_cover_both_the_floor_and_the_reserve() {
        let policy = Policy::default();

        let mut too_small = baseline_open_channel();
        too_small.dust_limit_satoshis = BOLT3_DUST_LIMIT - 1;
        let params = PeerParams::from(&too_small);
        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::DustLimitTooSmall(params.dust_limit_satoshis))
        );

        let mut above_reserve = baseline_open_channel();
        above_reserve.channel_reserve_satoshis =
            above_reserve.dust_limit_satoshis - 1;
        let params = PeerParams::from(&above_reserve);
        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::ChannelReserveLessDust {
                dust_limit: params.dust_limit_satoshis,
                reserve: params.channel_reserve_satoshis,
            })
        );
    }

    #[test]
    fn htlc_value_limits_are_enforced_in_both_directions() {
        let mut policy = Policy::default();
        let open_channel = baseline_open_channel();

        let htlc_minimum_msat_max = open_channel.htlc_minimum_msat - 1;
        policy.htlc_minimum_msat_max = Some(htlc_minimum_msat_max);
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::HtlcMinimumTooLarge {
                proposed: params.htlc_minimum_msat,
                allowed_maximum: htlc_minimum_msat_max,
            })
        );

        let policy = Policy::default();
        let mut open_channel = baseline_open_channel();
        let in_flight_min = policy.max_htlc_value_in_flight_msat_min.unwrap();
        open_channel.max_htlc_value_in_flight_msat = in_flight_min - 1;
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::HtlcInFlightMaximumTooSmall {
                proposed: params.max_htlc_value_in_flight_msat,
                required_minimum: in_flight_min,
            })
        );

        let mut policy = Policy::default();
        let mut open_channel = baseline_open_channel();
        policy.max_accepted_htlcs_min = Some(20);
        open_channel.max_accepted_htlcs = 19;
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::MaxAcceptedHtlcsTooSmall {
                proposed: 19,
                required_minimum: 20,
            })
        );
    }

    #[test]
    fn reserve_and_dust_ceilings_cap_from_above() {
        let mut policy = Policy::default();
        let open_channel = baseline_open_channel();

        let reserve_ceiling = open_channel.channel_reserve_satoshis - 1;
        policy.channel_reserve_satoshis_max_abs = Some(reserve_ceiling);
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::ChannelReserveTooLarge {
                proposed: params.channel_reserve_satoshis,
                allowed_maximum: reserve_ceiling,
            })
        );

        let mut policy = Policy::default();
        let mut open_channel = open_channel;
        let dust_ceiling = policy.dust_limit_satoshis_max.unwrap();
        open_channel.dust_limit_satoshis = dust_ceiling + 1;
        policy.channel_reserve_satoshis_max_abs = None;
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.validate_peer_params(params),
            Err(PolicyError::DustLimitTooLarge {
                proposed: params.dust_limit_satoshis,
                allowed_maximum: dust_ceiling,
            })
        );
    }

    #[test]
    fn inbound_open_channel_is_rejected_outside_the_feerate_window() {
        let policy = Policy::default();
        let mut open_channel = baseline_open_channel();
        open_channel.feerate_per_kw = policy.feerate_per_kw_range.end + 1;
        assert_eq!(
            policy.validate_inbound(&open_channel),
            Err(PolicyError::FeeRateUnreasonable {
                proposed: open_channel.feerate_per_kw,
                lowest_accepted: policy.feerate_per_kw_range.start,
                highest_accepted: policy.feerate_per_kw_range.end,
            })
        );
    }

    #[test]
    fn inbound_open_channel_is_rejected_below_minimum_funding() {
        let policy = Policy::default();
        let mut open_channel = baseline_open_channel();
        let funding_satoshis_min = policy.funding_satoshis_min.unwrap();
        open_channel.funding_satoshis = funding_satoshis_min - 1;
        assert_eq!(
            policy.validate_inbound(&open_channel),
            Err(PolicyError::ChannelFundingTooSmall {
                proposed: open_channel.funding_satoshis,
                required_minimum: funding_satoshis_min,
            })
        );
    }

    #[test]
    fn inbound_open_channel_reserve_percentage_is_computed_from_funding() {
        let policy = Policy::default();
        let mut open_channel = baseline_open_channel();
        open_channel.funding_satoshis = 20000;
        let percents = policy.channel_reserve_satoshis_max_percent.unwrap();
        let expected_ceiling = (open_channel.funding_satoshis as f64
            * (percents as f64 / 100.)) as u64;
        assert_eq!(
            policy.validate_inbound(&open_channel),
            Err(PolicyError::ChannelReserveTooLarge {
                proposed: open_channel.channel_reserve_satoshis,
                allowed_maximum: expected_ceiling,
            })
        );
    }

    #[test]
    fn confirm_outbound_rejects_a_minimum_depth_past_our_ceiling() {
        let policy = Policy::default();
        let open_channel = baseline_open_channel();
        let mut accept_channel = baseline_accept_channel();
        let maximum_depth = policy.maximum_depth.unwrap();
        accept_channel.minimum_depth = maximum_depth + 1;
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.confirm_outbound(params, &accept_channel),
            Err(PolicyError::UnreasonableMinDepth {
                proposed: accept_channel.minimum_depth,
                allowed_maximum: maximum_depth,
            })
        );
    }

    #[test]
    fn confirm_outbound_cross_checks_dust_against_both_reserves() {
        let policy = Policy::default();

        let open_channel = baseline_open_channel();
        let mut accept_channel = baseline_accept_channel();
        accept_channel.channel_reserve_satoshis =
            open_channel.dust_limit_satoshis - 1;
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.confirm_outbound(params, &accept_channel),
            Err(PolicyError::LocalDustExceedsRemoteReserve {
                channel_reserve: accept_channel.channel_reserve_satoshis,
                dust_limit: params.dust_limit_satoshis,
            })
        );

        let mut open_channel = baseline_open_channel();
        let accept_channel = baseline_accept_channel();
        open_channel.channel_reserve_satoshis =
            accept_channel.dust_limit_satoshis - 1;
        let params = PeerParams::from(&open_channel);
        assert_eq!(
            policy.confirm_outbound(params, &accept_channel),
            Err(PolicyError::RemoteDustExceedsLocalReserve {
                channel_reserve: params.channel_reserve_satoshis,
                dust_limit: accept_channel.dust_limit_satoshis,
            })
        );
    }
}
