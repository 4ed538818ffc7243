//! Relevancy scoring.
//!
//! A candidate's score is a pure function of the candidate, a reference
//! instant, and a versioned weight table:
//!
//! ```text
//! total = (base × relationshipMultiplier + accountQuality + bonuses) × freshnessDecay
//! ```
//!
//! Every term is kept on the [`ScoreBreakdown`] so callers can explain a
//! ranking. Changing any weight must come with a new `version`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use pathfinder_graph::EdgeType;

use crate::aggregate::Candidate;
use crate::error::{PathfinderError, Result};
use crate::path::PathType;
use crate::request::PathRequest;

/// Current weight table version.
pub const SCORING_VERSION: &str = "v1";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Base score per path type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseWeights {
    pub direct: f64,
    pub chain_affinity: f64,
    pub org_indirect: f64,
    pub shared_third_party: f64,
    pub org_direct: f64,
}

impl Default for BaseWeights {
    fn default() -> Self {
        Self {
            direct: 10.0,
            chain_affinity: 12.0,
            org_indirect: 20.0,
            shared_third_party: 25.0,
            org_direct: 30.0,
        }
    }
}

impl BaseWeights {
    pub fn get(&self, path_type: PathType) -> f64 {
        match path_type {
            PathType::Direct => self.direct,
            PathType::ChainAffinity => self.chain_affinity,
            PathType::OrgIndirect => self.org_indirect,
            PathType::SharedThirdParty => self.shared_third_party,
            PathType::OrgDirect => self.org_direct,
        }
    }

    fn values(&self) -> [f64; 5] {
        [
            self.direct,
            self.chain_affinity,
            self.org_indirect,
            self.shared_third_party,
            self.org_direct,
        ]
    }
}

/// Strength multiplier per edge type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeMultipliers {
    pub works_at: f64,
    pub worked_at: f64,
    pub invested_in: f64,
    pub audits: f64,
    pub member_of: f64,
    pub partners_with: f64,
    pub affiliated_with: f64,
    pub follows: f64,
}

impl Default for EdgeMultipliers {
    fn default() -> Self {
        Self {
            works_at: 1.5,
            worked_at: 1.3,
            invested_in: 1.3,
            audits: 1.2,
            member_of: 1.2,
            partners_with: 1.15,
            affiliated_with: 1.1,
            follows: 1.0,
        }
    }
}

impl EdgeMultipliers {
    pub fn get(&self, edge_type: EdgeType) -> f64 {
        match edge_type {
            EdgeType::WorksAt => self.works_at,
            EdgeType::WorkedAt => self.worked_at,
            EdgeType::InvestedIn => self.invested_in,
            EdgeType::Audits => self.audits,
            EdgeType::MemberOf => self.member_of,
            EdgeType::PartnersWith => self.partners_with,
            EdgeType::AffiliatedWith => self.affiliated_with,
            EdgeType::Follows => self.follows,
        }
    }

    fn values(&self) -> [f64; 8] {
        [
            self.works_at,
            self.worked_at,
            self.invested_in,
            self.audits,
            self.member_of,
            self.partners_with,
            self.affiliated_with,
            self.follows,
        ]
    }
}

/// Versioned scoring weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Reported on every breakdown
    pub version: String,
    pub base: BaseWeights,
    pub multipliers: EdgeMultipliers,
    /// Scale for log10(1 + followers)
    pub followers_weight: f64,
    pub verified_bonus: f64,
    /// Added per connection type beyond the first
    pub multi_path_bonus: f64,
    /// Age at which freshness halves
    pub half_life_days: f64,
    /// Floor for the freshness factor (must be > 0)
    pub min_freshness: f64,
    /// Freshness when no node carries a timestamp
    pub unknown_freshness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            version: SCORING_VERSION.to_string(),
            base: BaseWeights::default(),
            multipliers: EdgeMultipliers::default(),
            followers_weight: 2.0,
            verified_bonus: 5.0,
            multi_path_bonus: 10.0,
            half_life_days: 180.0,
            min_freshness: 0.1,
            unknown_freshness: 0.75,
        }
    }
}

impl ScoringWeights {
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(PathfinderError::Config("scoring.version is empty".into()));
        }

        let scalars = [
            self.followers_weight,
            self.verified_bonus,
            self.multi_path_bonus,
        ];
        let all = self
            .base
            .values()
            .into_iter()
            .chain(self.multipliers.values())
            .chain(scalars);
        for value in all {
            if !value.is_finite() || value < 0.0 {
                return Err(PathfinderError::Config(format!(
                    "scoring weights must be finite and non-negative, got {}",
                    value
                )));
            }
        }

        if !(self.half_life_days.is_finite() && self.half_life_days > 0.0) {
            return Err(PathfinderError::Config(
                "scoring.half_life_days must be positive".into(),
            ));
        }
        if !(self.min_freshness > 0.0 && self.min_freshness <= 1.0) {
            return Err(PathfinderError::Config(
                "scoring.min_freshness must be in (0, 1]".into(),
            ));
        }
        if !(self.unknown_freshness >= self.min_freshness && self.unknown_freshness <= 1.0) {
            return Err(PathfinderError::Config(
                "scoring.unknown_freshness must be in [min_freshness, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Every term of a candidate's score.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base: f64,
    pub relationship_multiplier: f64,
    pub account_quality: f64,
    pub bonuses: f64,
    pub freshness_decay: f64,
    pub total: f64,
    /// Weight table version that produced this breakdown
    pub version: String,
}

/// Scores candidates against one weight table.
#[derive(Debug, Clone, Default)]
pub struct RelevancyScorer {
    weights: ScoringWeights,
}

impl RelevancyScorer {
    /// Create a scorer, rejecting invalid weights.
    pub fn new(weights: ScoringWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one candidate as of `as_of`.
    pub fn score(&self, candidate: &Candidate, as_of: DateTime<Utc>) -> ScoreBreakdown {
        let w = &self.weights;

        let base = candidate
            .connection_types
            .iter()
            .map(|t| w.base.get(*t))
            .fold(0.0, f64::max);

        let relationship_multiplier = candidate
            .paths
            .iter()
            .flat_map(|p| p.edge_types())
            .map(|e| w.multipliers.get(e))
            .reduce(f64::max)
            .unwrap_or(1.0);

        let mut account_quality =
            w.followers_weight * (1.0 + candidate.person.followers_count as f64).log10();
        if candidate.person.verified {
            account_quality += w.verified_bonus;
        }

        let extra_types = candidate.connection_types.len().saturating_sub(1);
        let bonuses = w.multi_path_bonus * extra_types as f64;

        let freshness_decay = self.freshness(candidate, as_of);

        let total =
            (base * relationship_multiplier + account_quality + bonuses) * freshness_decay;

        ScoreBreakdown {
            base,
            relationship_multiplier,
            account_quality,
            bonuses,
            freshness_decay,
            total,
            version: w.version.clone(),
        }
    }

    /// Half-life decay on the stalest timestamp among the nodes the
    /// candidate's paths rest on, clamped to `[min_freshness, 1]`.
    pub fn freshness(&self, candidate: &Candidate, as_of: DateTime<Utc>) -> f64 {
        let w = &self.weights;

        let stalest = std::iter::once(&candidate.person)
            .chain(candidate.paths.iter().flat_map(|p| p.supporting_nodes()))
            .filter_map(|n| n.last_updated)
            .min();

        let Some(stalest) = stalest else {
            return w.unknown_freshness;
        };

        // future timestamps count as fresh
        let age_days = ((as_of - stalest).num_seconds() as f64 / SECONDS_PER_DAY).max(0.0);
        0.5_f64
            .powf(age_days / w.half_life_days)
            .clamp(w.min_freshness, 1.0)
    }

    /// Score a candidate in place.
    pub fn apply(&self, candidate: &mut Candidate, as_of: DateTime<Utc>) {
        let breakdown = self.score(candidate, as_of);
        candidate.relevancy_score = breakdown.total;
        candidate.score_breakdown = breakdown;
    }

    /// Score every candidate of a request. The request is validated first.
    pub fn score_candidates(
        &self,
        request: &PathRequest,
        candidates: &mut [Candidate],
        as_of: DateTime<Utc>,
    ) -> Result<()> {
        request.validate()?;
        for candidate in candidates.iter_mut() {
            self.apply(candidate, as_of);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::path::{MatchSource, PathKind, PathRecord, PathStep};
    use chrono::{Duration, TimeZone};
    use pathfinder_graph::{Direction, PersonNode};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn request() -> PathRequest {
        PathRequest::new("s", "t").unwrap()
    }

    fn direct(candidate: PersonNode) -> PathRecord {
        PathRecord::new(
            candidate.clone(),
            vec![
                PathStep::start(PersonNode::individual("s", "s")),
                PathStep::via(candidate, EdgeType::Follows, Direction::Outgoing),
            ],
            PathKind::Direct,
        )
    }

    fn org_direct(candidate: PersonNode, org: PersonNode) -> PathRecord {
        PathRecord::new(
            candidate.clone(),
            vec![
                PathStep::start(PersonNode::individual("s", "s")),
                PathStep::via(candidate, EdgeType::Follows, Direction::Outgoing),
                PathStep::via(org.clone(), EdgeType::WorksAt, Direction::Outgoing),
                PathStep::via(
                    PersonNode::individual("t", "t"),
                    EdgeType::WorksAt,
                    Direction::Incoming,
                ),
            ],
            PathKind::OrgDirect {
                shared_org: org,
                match_source: MatchSource::ProspectDirect,
            },
        )
    }

    fn candidate(paths: Vec<PathRecord>) -> Candidate {
        aggregate(&request(), paths).unwrap().remove(0)
    }

    #[test]
    fn test_single_direct_path() {
        let c = candidate(vec![direct(
            PersonNode::individual("c", "c")
                .with_followers(999)
                .with_last_updated(now()),
        )]);
        let score = RelevancyScorer::default().score(&c, now());

        assert_eq!(score.base, 10.0);
        assert_eq!(score.relationship_multiplier, 1.0);
        assert!((score.account_quality - 6.0).abs() < 1e-9);
        assert_eq!(score.bonuses, 0.0);
        assert_eq!(score.freshness_decay, 1.0);
        assert!((score.total - 16.0).abs() < 1e-9);
        assert_eq!(score.version, "v1");
    }

    #[test]
    fn test_multi_path_takes_best_terms() {
        let person = PersonNode::individual("c", "c").with_verified(true);
        let c = candidate(vec![
            direct(person.clone()),
            org_direct(person, PersonNode::organization("x", "x")),
        ]);
        let score = RelevancyScorer::default().score(&c, now());

        assert_eq!(score.base, 30.0);
        assert_eq!(score.relationship_multiplier, 1.5);
        assert_eq!(score.account_quality, 5.0);
        assert_eq!(score.bonuses, 10.0);
        assert_eq!(score.freshness_decay, 0.75);
        let expected = (30.0 * 1.5 + 5.0 + 10.0) * 0.75;
        assert!((score.total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_uses_stalest_node() {
        let person = PersonNode::individual("c", "c").with_last_updated(now());
        let org = PersonNode::organization("x", "x").with_last_updated(now() - Duration::days(180));
        let c = candidate(vec![org_direct(person, org)]);

        let decay = RelevancyScorer::default().freshness(&c, now());
        assert!((decay - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_bounds() {
        let scorer = RelevancyScorer::default();

        let ancient = candidate(vec![direct(
            PersonNode::individual("c", "c").with_last_updated(now() - Duration::days(10_000)),
        )]);
        assert_eq!(scorer.freshness(&ancient, now()), 0.1);

        let future = candidate(vec![direct(
            PersonNode::individual("c", "c").with_last_updated(now() + Duration::days(30)),
        )]);
        assert_eq!(scorer.freshness(&future, now()), 1.0);
    }

    #[test]
    fn test_score_is_pure() {
        let c = candidate(vec![direct(
            PersonNode::individual("c", "c").with_last_updated(now() - Duration::days(40)),
        )]);
        let scorer = RelevancyScorer::default();
        assert_eq!(scorer.score(&c, now()), scorer.score(&c, now()));
    }

    #[test]
    fn test_score_candidates_rejects_self_request() {
        let mut list = vec![candidate(vec![direct(PersonNode::individual("c", "c"))])];
        let bad = PathRequest {
            source_user_id: "s".into(),
            target_user_id: "s".into(),
        };
        let err = RelevancyScorer::default()
            .score_candidates(&bad, &mut list, now())
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(list[0].relevancy_score, 0.0);

        RelevancyScorer::default()
            .score_candidates(&request(), &mut list, now())
            .unwrap();
        assert_eq!(list[0].relevancy_score, list[0].score_breakdown.total);
        assert!(list[0].relevancy_score > 0.0);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let weights = ScoringWeights {
            min_freshness: 0.0,
            ..Default::default()
        };
        assert!(RelevancyScorer::new(weights).is_err());

        let mut weights = ScoringWeights::default();
        weights.base.direct = -1.0;
        assert!(weights.validate().is_err());
    }
}
