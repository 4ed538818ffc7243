//! Path records produced by the discoverers.
//!
//! A path is a walk from the source to its destination (a candidate, or the
//! target when the source itself is the connector). Each path type carries
//! only the auxiliary data it needs; `PathKind` is the tagged union.

use serde::{Deserialize, Serialize};

use pathfinder_graph::{Direction, EdgeType, PersonNode, Vibe};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Structural category of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum PathType {
    Direct,
    OrgDirect,
    OrgIndirect,
    SharedThirdParty,
    ChainAffinity,
}

impl PathType {
    /// Every path type, in discovery order.
    pub const ALL: [PathType; 5] = [
        PathType::Direct,
        PathType::OrgDirect,
        PathType::OrgIndirect,
        PathType::SharedThirdParty,
        PathType::ChainAffinity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::OrgDirect => "org_direct",
            Self::OrgIndirect => "org_indirect",
            Self::SharedThirdParty => "shared_third_party",
            Self::ChainAffinity => "chain_affinity",
        }
    }
}

impl std::fmt::Display for PathType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the shared organization reaches the prospect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// The edge on the prospect's side points at the prospect
    ProspectDirect,
    /// The prospect follows its way to the organization
    ProspectFollowing,
}

/// Edge connecting a step to its predecessor, in walking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub edge_type: EdgeType,
    /// `Outgoing` when the stored edge points from the previous step to this one
    pub direction: Direction,
}

/// One node on a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PathStep {
    pub node: PersonNode,
    /// None on the first step and on the affinity jump between organizations
    pub link: Option<Link>,
}

impl PathStep {
    pub fn start(node: PersonNode) -> Self {
        Self { node, link: None }
    }

    pub fn via(node: PersonNode, edge_type: EdgeType, direction: Direction) -> Self {
        Self {
            node,
            link: Some(Link {
                edge_type,
                direction,
            }),
        }
    }

    /// A step reached by category match rather than an edge.
    pub fn jump(node: PersonNode) -> Self {
        Self { node, link: None }
    }
}

/// Type-specific data for a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "pathType", rename_all = "snake_case")]
pub enum PathKind {
    /// Mutual follow connection
    Direct,
    /// Connector and prospect share an organization
    #[serde(rename_all = "camelCase")]
    OrgDirect {
        shared_org: PersonNode,
        match_source: MatchSource,
    },
    /// Shared organization reaches the prospect through an intermediary
    #[serde(rename_all = "camelCase")]
    OrgIndirect {
        shared_org: PersonNode,
        intermediary: PersonNode,
        match_source: MatchSource,
    },
    /// The two sides' organizations relate through an investor/auditor/partner
    #[serde(rename_all = "camelCase")]
    SharedThirdParty {
        source_org: PersonNode,
        third_party: PersonNode,
        target_org: PersonNode,
        relation: EdgeType,
    },
    /// The two sides' organizations operate on the same chains
    #[serde(rename_all = "camelCase")]
    ChainAffinity {
        source_org: PersonNode,
        target_org: PersonNode,
        shared_chains: Vec<String>,
    },
}

impl PathKind {
    pub fn path_type(&self) -> PathType {
        match self {
            Self::Direct => PathType::Direct,
            Self::OrgDirect { .. } => PathType::OrgDirect,
            Self::OrgIndirect { .. } => PathType::OrgIndirect,
            Self::SharedThirdParty { .. } => PathType::SharedThirdParty,
            Self::ChainAffinity { .. } => PathType::ChainAffinity,
        }
    }
}

/// Which side of the connection an organization sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    /// Both sides belong to it
    Shared,
    SourceSide,
    TargetSide,
    ThirdParty,
}

/// An organization appearing on a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct OrgConnection {
    pub org: PersonNode,
    pub role: OrgRole,
    /// Edge type tying the organization into the path
    pub relation: Option<EdgeType>,
}

/// A discovered path from the source to a destination person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    /// Destination the path is attributed to
    pub candidate: PersonNode,
    /// Walk from the source, source first
    pub steps: Vec<PathStep>,
    pub kind: PathKind,
}

impl PathRecord {
    pub fn new(candidate: PersonNode, steps: Vec<PathStep>, kind: PathKind) -> Self {
        Self {
            candidate,
            steps,
            kind,
        }
    }

    pub fn path_type(&self) -> PathType {
        self.kind.path_type()
    }

    /// Number of hops (steps after the source).
    pub fn hops(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    /// Identity of the path: its type plus the node ids walked.
    pub fn signature(&self) -> (PathType, Vec<&str>) {
        (
            self.path_type(),
            self.steps.iter().map(|s| s.node.user_id.as_str()).collect(),
        )
    }

    /// Edge types traversed, in walking order.
    pub fn edge_types(&self) -> impl Iterator<Item = EdgeType> + '_ {
        self.steps.iter().filter_map(|s| s.link.map(|l| l.edge_type))
    }

    pub fn shared_org(&self) -> Option<&PersonNode> {
        match &self.kind {
            PathKind::OrgDirect { shared_org, .. } | PathKind::OrgIndirect { shared_org, .. } => {
                Some(shared_org)
            }
            _ => None,
        }
    }

    pub fn intermediary(&self) -> Option<&PersonNode> {
        match &self.kind {
            PathKind::OrgIndirect { intermediary, .. } => Some(intermediary),
            _ => None,
        }
    }

    pub fn third_party(&self) -> Option<&PersonNode> {
        match &self.kind {
            PathKind::SharedThirdParty { third_party, .. } => Some(third_party),
            _ => None,
        }
    }

    pub fn shared_chains(&self) -> &[String] {
        match &self.kind {
            PathKind::ChainAffinity { shared_chains, .. } => shared_chains,
            _ => &[],
        }
    }

    pub fn match_source(&self) -> Option<MatchSource> {
        match &self.kind {
            PathKind::OrgDirect { match_source, .. } | PathKind::OrgIndirect { match_source, .. } => {
                Some(*match_source)
            }
            _ => None,
        }
    }

    /// Organizations on this path and the side each sits on.
    pub fn org_connections(&self) -> Vec<OrgConnection> {
        let mut orgs: Vec<(&PersonNode, OrgRole)> = Vec::new();
        match &self.kind {
            PathKind::Direct => {}
            PathKind::OrgDirect { shared_org, .. } | PathKind::OrgIndirect { shared_org, .. } => {
                orgs.push((shared_org, OrgRole::Shared));
            }
            PathKind::SharedThirdParty {
                source_org,
                third_party,
                target_org,
                ..
            } => {
                orgs.push((source_org, OrgRole::SourceSide));
                if third_party.is_organization() {
                    orgs.push((third_party, OrgRole::ThirdParty));
                }
                orgs.push((target_org, OrgRole::TargetSide));
            }
            PathKind::ChainAffinity {
                source_org,
                target_org,
                ..
            } => {
                orgs.push((source_org, OrgRole::SourceSide));
                orgs.push((target_org, OrgRole::TargetSide));
            }
        }

        orgs.into_iter()
            .map(|(org, role)| OrgConnection {
                org: org.clone(),
                role,
                relation: self.relation_of(&org.user_id),
            })
            .collect()
    }

    /// Nodes whose data this path's confidence rests on.
    pub fn supporting_nodes(&self) -> Vec<&PersonNode> {
        let mut nodes = vec![&self.candidate];
        match &self.kind {
            PathKind::Direct => {}
            PathKind::OrgDirect { shared_org, .. } => nodes.push(shared_org),
            PathKind::OrgIndirect {
                shared_org,
                intermediary,
                ..
            } => {
                nodes.push(shared_org);
                nodes.push(intermediary);
            }
            PathKind::SharedThirdParty {
                source_org,
                third_party,
                target_org,
                ..
            } => {
                nodes.push(source_org);
                nodes.push(third_party);
                nodes.push(target_org);
            }
            PathKind::ChainAffinity {
                source_org,
                target_org,
                ..
            } => {
                nodes.push(source_org);
                nodes.push(target_org);
            }
        }
        nodes
    }

    /// Structured, presentation-neutral description of the walk.
    pub fn describe(&self) -> PathDescription {
        let last = self.steps.len().saturating_sub(1);
        let segments = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| PathSegment {
                user_id: step.node.user_id.clone(),
                screen_name: step.node.screen_name.clone(),
                name: step.node.name.clone(),
                vibe: step.node.vibe,
                role: self.role_of(i, last, &step.node),
                link: step.link,
            })
            .collect();

        PathDescription {
            path_type: self.path_type(),
            hops: self.hops(),
            match_source: self.match_source(),
            shared_chains: self.shared_chains().to_vec(),
            segments,
        }
    }

    fn role_of(&self, index: usize, last: usize, node: &PersonNode) -> StepRole {
        if index == 0 {
            return StepRole::Source;
        }
        if index == last {
            return match self.kind {
                PathKind::Direct => StepRole::Candidate,
                _ => StepRole::Target,
            };
        }
        if node.user_id == self.candidate.user_id {
            return StepRole::Candidate;
        }
        if self.intermediary().is_some_and(|p| p.user_id == node.user_id) {
            return StepRole::Intermediary;
        }
        if self.third_party().is_some_and(|p| p.user_id == node.user_id) {
            return StepRole::ThirdParty;
        }
        if node.vibe == Vibe::Organization {
            StepRole::Organization
        } else {
            StepRole::Candidate
        }
    }

    /// Edge type tying a node into the path: its own link, or the next
    /// step's link when it was reached by an affinity jump.
    fn relation_of(&self, user_id: &str) -> Option<EdgeType> {
        let index = self.steps.iter().position(|s| s.node.user_id == user_id)?;
        self.steps[index]
            .link
            .or_else(|| self.steps.get(index + 1).and_then(|s| s.link))
            .map(|l| l.edge_type)
    }
}

/// Role a node plays on a described path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum StepRole {
    Source,
    Candidate,
    Organization,
    Intermediary,
    ThirdParty,
    Target,
}

/// One rendered node of a path chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PathSegment {
    pub user_id: String,
    pub screen_name: String,
    pub name: String,
    pub vibe: Vibe,
    pub role: StepRole,
    pub link: Option<Link>,
}

/// Presentation-neutral form of a path chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PathDescription {
    pub path_type: PathType,
    pub hops: usize,
    pub match_source: Option<MatchSource>,
    pub shared_chains: Vec<String>,
    pub segments: Vec<PathSegment>,
}
