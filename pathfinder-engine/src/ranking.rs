//! Sorting, search and pagination over scored candidates.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use pathfinder_graph::PersonNode;

use crate::aggregate::Candidate;
use crate::config::RankingConfig;
use crate::path::PathType;

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Highest score first, then most followers
    #[default]
    Relevancy,
    /// Most followers first
    Followers,
    /// Display name, A to Z, ignoring case
    Name,
}

/// What page of which slice of the candidates to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase", default)]
pub struct RankQuery {
    pub sort: SortKey,
    /// Case-insensitive substring; blank means no filter
    pub search: Option<String>,
    /// Only candidates reached by one of these types; empty means all
    pub path_types: Vec<PathType>,
    /// 1-based; 0 is read as 1
    pub page: usize,
    /// Falls back to the configured default
    pub page_size: Option<usize>,
}

impl RankQuery {
    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn only(mut self, path_type: PathType) -> Self {
        self.path_types.push(path_type);
        self
    }

    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = Some(page_size);
        self
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Items matching the filter, across all pages
    pub total_items: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Number of candidates reached by a path type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub path_type: PathType,
    pub count: usize,
}

/// Filter, sort and page candidates.
pub fn rank(
    candidates: &[Candidate],
    query: &RankQuery,
    config: &RankingConfig,
) -> PagedResult<Candidate> {
    let term = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);

    let mut matched: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| {
            query.path_types.is_empty()
                || c.connection_types.iter().any(|t| query.path_types.contains(t))
        })
        .filter(|c| term.as_deref().map_or(true, |t| matches_search(c, t)))
        .collect();

    matched.sort_by(|a, b| compare(a, b, query.sort));

    let page_size = query
        .page_size
        .unwrap_or(config.default_page_size)
        .clamp(1, config.max_page_size.max(1));
    let page = query.page.max(1);
    let total_items = matched.len();
    let total_pages = total_items.div_ceil(page_size);

    let items = matched
        .into_iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .cloned()
        .collect();

    PagedResult {
        items,
        total_items,
        page,
        page_size,
        total_pages,
    }
}

/// Candidates per path type, in path type order.
pub fn facets(candidates: &[Candidate]) -> Vec<Facet> {
    PathType::ALL
        .iter()
        .map(|path_type| Facet {
            path_type: *path_type,
            count: candidates
                .iter()
                .filter(|c| c.connection_types.contains(path_type))
                .count(),
        })
        .collect()
}

/// Total order for a sort key; ties end on `userId`.
pub fn compare(a: &Candidate, b: &Candidate, sort: SortKey) -> Ordering {
    let primary = match sort {
        SortKey::Relevancy => b
            .relevancy_score
            .total_cmp(&a.relevancy_score)
            .then_with(|| b.person.followers_count.cmp(&a.person.followers_count)),
        SortKey::Followers => b.person.followers_count.cmp(&a.person.followers_count),
        SortKey::Name => a
            .person
            .name
            .to_lowercase()
            .cmp(&b.person.name.to_lowercase()),
    };
    primary.then_with(|| a.person.user_id.cmp(&b.person.user_id))
}

fn matches_search(candidate: &Candidate, term: &str) -> bool {
    node_matches(&candidate.person, term, true)
        || candidate
            .related_nodes()
            .any(|node| node_matches(node, term, false))
}

fn node_matches(node: &PersonNode, term: &str, with_bio: bool) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(term);
    contains(&node.name)
        || contains(&node.screen_name)
        || (with_bio && node.description.as_deref().is_some_and(contains))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::path::{MatchSource, PathKind, PathRecord, PathStep};
    use crate::request::PathRequest;
    use pathfinder_graph::{Direction, EdgeType};

    fn direct(person: PersonNode, score: f64) -> Candidate {
        let path = PathRecord::new(
            person.clone(),
            vec![
                PathStep::start(PersonNode::individual("s", "s")),
                PathStep::via(person, EdgeType::Follows, Direction::Outgoing),
            ],
            PathKind::Direct,
        );
        let request = PathRequest::new("s", "t").unwrap();
        let mut c = aggregate(&request, vec![path]).unwrap().remove(0);
        c.relevancy_score = score;
        c
    }

    fn via_org(person: PersonNode, org: PersonNode) -> Candidate {
        let path = PathRecord::new(
            person.clone(),
            vec![
                PathStep::start(PersonNode::individual("s", "s")),
                PathStep::via(person, EdgeType::Follows, Direction::Outgoing),
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
        );
        let request = PathRequest::new("s", "t").unwrap();
        aggregate(&request, vec![path]).unwrap().remove(0)
    }

    fn ids(page: &PagedResult<Candidate>) -> Vec<&str> {
        page.items.iter().map(|c| c.user_id()).collect()
    }

    fn sample() -> Vec<Candidate> {
        vec![
            direct(PersonNode::individual("b", "bob").with_followers(10), 5.0),
            direct(PersonNode::individual("a", "alice").with_followers(50), 5.0),
            direct(PersonNode::individual("c", "Carol").with_followers(500), 9.0),
            direct(PersonNode::individual("d", "dave").with_followers(10), 5.0),
        ]
    }

    #[test]
    fn test_relevancy_order_with_ties() {
        let page = rank(&sample(), &RankQuery::default(), &RankingConfig::default());
        assert_eq!(ids(&page), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_followers_and_name_order() {
        let config = RankingConfig::default();
        let by_followers = rank(
            &sample(),
            &RankQuery::default().sorted_by(SortKey::Followers),
            &config,
        );
        assert_eq!(ids(&by_followers), vec!["c", "a", "b", "d"]);

        let by_name = rank(&sample(), &RankQuery::default().sorted_by(SortKey::Name), &config);
        assert_eq!(ids(&by_name), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_sort_is_repeatable() {
        let config = RankingConfig::default();
        let mut reversed = sample();
        reversed.reverse();
        let query = RankQuery::default();
        assert_eq!(
            ids(&rank(&sample(), &query, &config)),
            ids(&rank(&reversed, &query, &config))
        );
    }

    #[test]
    fn test_search_covers_related_orgs() {
        let mut list = sample();
        list.push(via_org(
            PersonNode::individual("e", "erin"),
            PersonNode::organization("x", "acme_labs").with_name("Acme Labs"),
        ));
        let config = RankingConfig::default();

        let page = rank(&list, &RankQuery::default().search("ACME"), &config);
        assert_eq!(ids(&page), vec!["e"]);

        let blank = rank(&list, &RankQuery::default().search("   "), &config);
        assert_eq!(blank.total_items, 5);
    }

    #[test]
    fn test_pagination() {
        let config = RankingConfig::default();
        let first = rank(&sample(), &RankQuery::default().page(0, 3), &config);
        assert_eq!(first.page, 1);
        assert_eq!(first.items.len(), 3);
        assert_eq!(first.total_pages, 2);

        let second = rank(&sample(), &RankQuery::default().page(2, 3), &config);
        assert_eq!(ids(&second), vec!["d"]);

        let past_end = rank(&sample(), &RankQuery::default().page(9, 3), &config);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_items, 4);

        let clamped = rank(&sample(), &RankQuery::default().page(1, 0), &config);
        assert_eq!(clamped.page_size, 1);
        let capped = rank(&sample(), &RankQuery::default().page(1, 10_000), &config);
        assert_eq!(capped.page_size, config.max_page_size);
    }

    #[test]
    fn test_path_type_filter_and_facets() {
        let mut list = sample();
        list.push(via_org(
            PersonNode::individual("e", "erin"),
            PersonNode::organization("x", "x"),
        ));

        let page = rank(
            &list,
            &RankQuery::default().only(PathType::OrgDirect),
            &RankingConfig::default(),
        );
        assert_eq!(ids(&page), vec!["e"]);

        let counts = facets(&list);
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[0], Facet { path_type: PathType::Direct, count: 4 });
        assert_eq!(counts[1], Facet { path_type: PathType::OrgDirect, count: 1 });
        assert_eq!(counts[4].count, 0);
    }
}
