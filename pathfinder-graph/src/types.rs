//! Core types for the relationship graph.
//!
//! People and organizations share one node type; organizations are people
//! with `vibe = organization`. Edges are typed and directed but carry no
//! identity of their own.
//!
//! With the `typescript` feature enabled, these types can be exported to
//! TypeScript using ts-rs for the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Whether a node represents an individual or an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Vibe {
    Individual,
    Organization,
}

impl Default for Vibe {
    fn default() -> Self {
        Self::Individual
    }
}

/// A person (or organization) node in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PersonNode {
    /// Stable identity
    pub user_id: String,
    /// Handle, unique ignoring case
    pub screen_name: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    /// Bio text
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vibe: Vibe,
    /// When enrichment last touched this node
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Organization classification (organizations only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub org_subtype: Vec<String>,
    /// Ecosystems/chains an organization operates on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<String>,
}

impl PersonNode {
    /// Create an individual with the given id and handle.
    pub fn individual(user_id: impl Into<String>, screen_name: impl Into<String>) -> Self {
        let screen_name = screen_name.into();
        Self {
            user_id: user_id.into(),
            name: screen_name.clone(),
            screen_name,
            followers_count: 0,
            following_count: 0,
            verified: false,
            profile_image_url: None,
            description: None,
            vibe: Vibe::Individual,
            last_updated: None,
            org_type: None,
            org_subtype: Vec::new(),
            chains: Vec::new(),
        }
    }

    /// Create an organization with the given id and handle.
    pub fn organization(user_id: impl Into<String>, screen_name: impl Into<String>) -> Self {
        Self {
            vibe: Vibe::Organization,
            ..Self::individual(user_id, screen_name)
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the bio.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set follower counts.
    pub fn with_followers(mut self, followers: u64) -> Self {
        self.followers_count = followers;
        self
    }

    /// Mark as verified.
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    /// Set the last-updated timestamp.
    pub fn with_last_updated(mut self, at: DateTime<Utc>) -> Self {
        self.last_updated = Some(at);
        self
    }

    /// Set the organization type.
    pub fn with_org_type(mut self, org_type: impl Into<String>) -> Self {
        self.org_type = Some(org_type.into());
        self
    }

    /// Set the chains this organization operates on.
    pub fn with_chains<I, S>(mut self, chains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chains = chains.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_organization(&self) -> bool {
        self.vibe == Vibe::Organization
    }

    /// Case-insensitive handle comparison.
    pub fn has_screen_name(&self, handle: &str) -> bool {
        self.screen_name.eq_ignore_ascii_case(handle.trim_start_matches('@'))
    }
}

/// Relationship type, a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Follows,
    WorksAt,
    WorkedAt,
    InvestedIn,
    Audits,
    AffiliatedWith,
    PartnersWith,
    MemberOf,
}

impl EdgeType {
    /// Edges linking a person to an organization they belong to.
    pub const ORGANIZATIONAL: [EdgeType; 4] = [
        EdgeType::WorksAt,
        EdgeType::WorkedAt,
        EdgeType::MemberOf,
        EdgeType::AffiliatedWith,
    ];

    /// Edges linking two organizations through an investor, auditor or partner.
    pub const THIRD_PARTY: [EdgeType; 3] = [
        EdgeType::InvestedIn,
        EdgeType::Audits,
        EdgeType::PartnersWith,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follows => "FOLLOWS",
            Self::WorksAt => "WORKS_AT",
            Self::WorkedAt => "WORKED_AT",
            Self::InvestedIn => "INVESTED_IN",
            Self::Audits => "AUDITS",
            Self::AffiliatedWith => "AFFILIATED_WITH",
            Self::PartnersWith => "PARTNERS_WITH",
            Self::MemberOf => "MEMBER_OF",
        }
    }

    pub fn is_organizational(&self) -> bool {
        Self::ORGANIZATIONAL.contains(self)
    }

    pub fn is_third_party(&self) -> bool {
        Self::THIRD_PARTY.contains(self)
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way to follow edges relative to the queried node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Edges starting at the queried node
    Outgoing,
    /// Edges ending at the queried node
    Incoming,
    Both,
}

impl Direction {
    pub fn reverse(&self) -> Self {
        match self {
            Self::Outgoing => Self::Incoming,
            Self::Incoming => Self::Outgoing,
            Self::Both => Self::Both,
        }
    }
}

/// A stored edge, as it appears in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub edge_type: EdgeType,
}

impl EdgeRecord {
    pub fn new(from: impl Into<String>, edge_type: EdgeType, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type,
        }
    }
}

/// One-hop answer from a neighbor query.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjacency {
    /// The queried node this adjacency starts from
    pub from_id: String,
    /// The node on the other end of the edge
    pub node: PersonNode,
    pub edge_type: EdgeType,
    /// `Outgoing` when the stored edge points from `from_id` to `node`
    pub direction: Direction,
}
