//! Candidate aggregation.
//!
//! Folds the path records of every discoverer into one row per destination
//! person. Row order and the order of every list on a row follow discovery
//! order, so output is deterministic for a given discoverer order.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use pathfinder_graph::PersonNode;

use crate::error::Result;
use crate::path::{OrgConnection, PathDescription, PathRecord, PathType};
use crate::request::PathRequest;
use crate::scoring::ScoreBreakdown;

/// A person reachable from the source, with every path found to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(flatten)]
    pub person: PersonNode,

    /// Type of the first path found
    pub connection_type: PathType,
    /// Every path type, in discovery order, each once
    pub connection_types: Vec<PathType>,
    /// Organizations on the first path
    pub org_connections: Vec<OrgConnection>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_org: Option<PersonNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intermediary: Option<PersonNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub third_party: Option<PersonNode>,
    #[serde(default)]
    pub shared_chains: Vec<String>,

    #[serde(default)]
    pub all_org_connections: Vec<OrgConnection>,
    #[serde(default)]
    pub all_shared_orgs: Vec<PersonNode>,
    #[serde(default)]
    pub all_intermediaries: Vec<PersonNode>,
    #[serde(default)]
    pub all_third_parties: Vec<PersonNode>,
    #[serde(default)]
    pub all_shared_chains: Vec<String>,

    /// Copy of `score_breakdown.total`
    #[serde(default)]
    pub relevancy_score: f64,
    #[serde(default)]
    pub score_breakdown: ScoreBreakdown,

    pub paths: Vec<PathRecord>,
    /// Presentation-neutral form of `paths`, index for index
    #[serde(default)]
    pub descriptions: Vec<PathDescription>,
}

impl Candidate {
    /// Start a row from its first path.
    pub fn from_path(path: PathRecord) -> Self {
        let mut candidate = Self {
            person: path.candidate.clone(),
            connection_type: path.path_type(),
            connection_types: Vec::new(),
            org_connections: path.org_connections(),
            shared_org: None,
            intermediary: None,
            third_party: None,
            shared_chains: Vec::new(),
            all_org_connections: Vec::new(),
            all_shared_orgs: Vec::new(),
            all_intermediaries: Vec::new(),
            all_third_parties: Vec::new(),
            all_shared_chains: Vec::new(),
            relevancy_score: 0.0,
            score_breakdown: ScoreBreakdown::default(),
            paths: Vec::new(),
            descriptions: Vec::new(),
        };
        candidate.absorb(path);
        candidate
    }

    pub fn user_id(&self) -> &str {
        &self.person.user_id
    }

    /// Reached by more than one path type.
    pub fn is_multi_path(&self) -> bool {
        self.connection_types.len() > 1
    }

    /// Merge another path to the same person. Returns false when an
    /// identical path is already present.
    pub fn absorb(&mut self, path: PathRecord) -> bool {
        let signature = path.signature();
        if self.paths.iter().any(|p| p.signature() == signature) {
            return false;
        }

        let path_type = path.path_type();
        if !self.connection_types.contains(&path_type) {
            self.connection_types.push(path_type);
        }

        for connection in path.org_connections() {
            if !self
                .all_org_connections
                .iter()
                .any(|c| c.org.user_id == connection.org.user_id)
            {
                self.all_org_connections.push(connection);
            }
        }

        if let Some(org) = path.shared_org() {
            self.shared_org.get_or_insert_with(|| org.clone());
            push_unique(&mut self.all_shared_orgs, org);
        }
        if let Some(person) = path.intermediary() {
            self.intermediary.get_or_insert_with(|| person.clone());
            push_unique(&mut self.all_intermediaries, person);
        }
        if let Some(party) = path.third_party() {
            self.third_party.get_or_insert_with(|| party.clone());
            push_unique(&mut self.all_third_parties, party);
        }

        let chains = path.shared_chains();
        if self.shared_chains.is_empty() && !chains.is_empty() {
            self.shared_chains = chains.to_vec();
        }
        for chain in chains {
            if !self
                .all_shared_chains
                .iter()
                .any(|c| c.eq_ignore_ascii_case(chain))
            {
                self.all_shared_chains.push(chain.clone());
            }
        }

        self.descriptions.push(path.describe());
        self.paths.push(path);
        true
    }

    /// Every organization, intermediary and third party named on this row.
    pub fn related_nodes(&self) -> impl Iterator<Item = &PersonNode> {
        self.all_org_connections
            .iter()
            .map(|c| &c.org)
            .chain(self.all_shared_orgs.iter())
            .chain(self.all_intermediaries.iter())
            .chain(self.all_third_parties.iter())
    }
}

fn push_unique(list: &mut Vec<PersonNode>, node: &PersonNode) {
    if !list.iter().any(|n| n.user_id == node.user_id) {
        list.push(node.clone());
    }
}

/// Group path records into candidates, in first-seen order.
///
/// Records whose destination is the source are dropped. The request is
/// validated before anything else.
pub fn aggregate(request: &PathRequest, paths: Vec<PathRecord>) -> Result<Vec<Candidate>> {
    request.validate()?;

    let mut candidates: Vec<Candidate> = Vec::new();
    for path in paths {
        if path.candidate.user_id == request.source_user_id {
            continue;
        }
        match candidates
            .iter_mut()
            .find(|c| c.person.user_id == path.candidate.user_id)
        {
            Some(existing) => {
                existing.absorb(path);
            }
            None => candidates.push(Candidate::from_path(path)),
        }
    }
    Ok(candidates)
}
