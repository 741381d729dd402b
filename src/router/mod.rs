//! Keyword routing for free-text queries
//!
//! A [`QueryRouter`] holds an ordered list of [`RoutingRule`]s. Each rule is an
//! AND across keyword groups and an OR within a group; a keyword matches when
//! it is a substring of the lower-cased query. The first matching rule wins.
//!
//! Pure CPU logic, no I/O. A router is immutable once built and can be shared
//! across any number of concurrent callers.

pub mod rules;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while building a routing table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("rule for '{target}' has no keyword groups and would match every query")]
    NoGroups { target: String },

    #[error("rule for '{target}' has an empty keyword group at position {group}")]
    EmptyGroup { target: String, group: usize },

    #[error("rule for '{target}' has an empty keyword in group {group}")]
    EmptyKeyword { target: String, group: usize },

    #[error("rule has an empty target id")]
    EmptyTarget,
}

/// A set of alternative keywords; satisfied when any one appears in the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordGroup(Vec<String>);

impl KeywordGroup {
    /// Keywords in this group (always lower-case)
    pub fn keywords(&self) -> &[String] {
        &self.0
    }

    /// `query_lower` must already be lower-cased
    fn is_satisfied_by(&self, query_lower: &str) -> bool {
        self.0.iter().any(|keyword| query_lower.contains(keyword.as_str()))
    }
}

/// One routing rule: every group must be satisfied for the rule to match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingRule {
    required_keyword_groups: Vec<KeywordGroup>,
    target_response_id: String,
}

impl RoutingRule {
    /// Build a rule from keyword groups
    ///
    /// Keywords are lower-cased here so matching only has to normalise the
    /// query.
    ///
    /// # Errors
    /// Rejects rules with no groups, empty groups, empty keywords or an empty
    /// target. An empty keyword is a substring of every string and would turn
    /// its group into a wildcard.
    pub fn new(target: impl Into<String>, groups: &[&[&str]]) -> Result<Self, RuleError> {
        let target = target.into();
        if target.trim().is_empty() {
            return Err(RuleError::EmptyTarget);
        }
        if groups.is_empty() {
            return Err(RuleError::NoGroups { target });
        }

        let mut required_keyword_groups = Vec::with_capacity(groups.len());
        for (index, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(RuleError::EmptyGroup {
                    target,
                    group: index,
                });
            }
            if group.iter().any(|keyword| keyword.is_empty()) {
                return Err(RuleError::EmptyKeyword {
                    target,
                    group: index,
                });
            }
            required_keyword_groups.push(KeywordGroup(
                group.iter().map(|keyword| keyword.to_lowercase()).collect(),
            ));
        }

        Ok(Self {
            required_keyword_groups,
            target_response_id: target,
        })
    }

    /// Catalog id returned when this rule matches
    pub fn target_response_id(&self) -> &str {
        &self.target_response_id
    }

    /// Keyword groups in declaration order
    pub fn required_keyword_groups(&self) -> &[KeywordGroup] {
        &self.required_keyword_groups
    }

    /// `query_lower` must already be lower-cased
    pub fn matches(&self, query_lower: &str) -> bool {
        self.required_keyword_groups
            .iter()
            .all(|group| group.is_satisfied_by(query_lower))
    }
}

/// Static routing table: `(target id, keyword groups)` in priority order
pub type RuleTable = [(&'static str, &'static [&'static [&'static str]])];

/// Ordered first-match-wins router over [`RoutingRule`]s
#[derive(Debug, Clone, Default)]
pub struct QueryRouter {
    rules: Vec<RoutingRule>,
}

impl QueryRouter {
    /// Create a router from rules already in priority order
    pub fn new(rules: Vec<RoutingRule>) -> Self {
        Self { rules }
    }

    /// Build a router from a static table
    pub fn from_table(table: &RuleTable) -> Result<Self, RuleError> {
        let rules = table
            .iter()
            .map(|(target, groups)| RoutingRule::new(*target, groups))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    /// Router for canned groundwater answers
    pub fn groundwater() -> Result<Self, RuleError> {
        Self::from_table(rules::GROUNDWATER_RULES)
    }

    /// Router recognising requests to analyse an uploaded map
    pub fn map_analysis() -> Result<Self, RuleError> {
        Self::from_table(rules::MAP_ANALYSIS_RULES)
    }

    /// Route a query to the target id of the first matching rule
    ///
    /// Returns `None` when no rule matches, including for the empty query.
    /// Absence of a match is a normal outcome; callers fall back to another
    /// answer source.
    pub fn route(&self, query: &str) -> Option<&str> {
        self.matching_rule(query)
            .map(|rule| rule.target_response_id())
    }

    /// Like [`route`](Self::route) but returns the rule and its position
    pub fn matching_rule(&self, query: &str) -> Option<&RoutingRule> {
        if query.is_empty() {
            return None;
        }
        let query_lower = query.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&query_lower))
    }

    /// Rules in priority order
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    /// Distinct target ids referenced by this router, in first-use order
    pub fn target_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !ids.contains(&rule.target_response_id()) {
                ids.push(rule.target_response_id());
            }
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critical_zone_rule() -> RoutingRule {
        RoutingRule::new(
            "blockAssessment",
            &[&["critical", "over-exploited"], &["block", "area", "zone"]],
        )
        .expect("valid rule")
    }

    #[test]
    fn test_rule_requires_every_group() {
        let router = QueryRouter::new(vec![critical_zone_rule()]);

        assert_eq!(
            router.route("show me the critical zone"),
            Some("blockAssessment")
        );
        assert_eq!(router.route("show me the critical report"), None);
        assert_eq!(router.route("show me the block"), None);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let router = QueryRouter::new(vec![
            RoutingRule::new("first", &[&["punjab"]]).unwrap(),
            RoutingRule::new("second", &[&["punjab"], &["rajasthan"]]).unwrap(),
        ]);

        assert_eq!(router.route("punjab and rajasthan"), Some("first"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let router = QueryRouter::new(vec![
            RoutingRule::new("cmp", &[&["Punjab"], &["RAJASTHAN"]]).unwrap(),
        ]);

        assert_eq!(router.route("PUNJAB RAJASTHAN"), Some("cmp"));
        assert_eq!(router.route("punjab rajasthan"), Some("cmp"));
        assert_eq!(router.route("Punjab's thirst vs Rajasthan"), Some("cmp"));
    }

    #[test]
    fn test_keywords_match_as_substrings() {
        let router = QueryRouter::new(vec![
            RoutingRule::new("trend", &[&["trend"], &["water"]]).unwrap(),
        ]);

        // "trends" contains "trend", "groundwater" contains "water"
        assert_eq!(router.route("groundwater trends"), Some("trend"));
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let router = QueryRouter::groundwater().unwrap();
        assert_eq!(router.route(""), None);
    }

    #[test]
    fn test_empty_router_matches_nothing() {
        let router = QueryRouter::default();
        assert!(router.is_empty());
        assert_eq!(router.route("punjab rajasthan"), None);
    }

    #[test]
    fn test_rule_without_groups_rejected() {
        let err = RoutingRule::new("all", &[]).unwrap_err();
        assert_eq!(
            err,
            RuleError::NoGroups {
                target: "all".to_string()
            }
        );
    }

    #[test]
    fn test_empty_group_rejected() {
        let err = RoutingRule::new("x", &[&["water"], &[]]).unwrap_err();
        assert_eq!(
            err,
            RuleError::EmptyGroup {
                target: "x".to_string(),
                group: 1
            }
        );
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let err = RoutingRule::new("x", &[&["water", ""]]).unwrap_err();
        assert_eq!(
            err,
            RuleError::EmptyKeyword {
                target: "x".to_string(),
                group: 0
            }
        );
    }

    #[test]
    fn test_empty_target_rejected() {
        assert_eq!(
            RoutingRule::new("  ", &[&["water"]]).unwrap_err(),
            RuleError::EmptyTarget
        );
    }

    #[test]
    fn test_keywords_stored_lowercase() {
        let rule = RoutingRule::new("x", &[&["Over-Exploited"]]).unwrap();
        assert_eq!(
            rule.required_keyword_groups()[0].keywords(),
            &["over-exploited".to_string()]
        );
    }

    #[test]
    fn test_target_ids_are_distinct_and_ordered() {
        let router = QueryRouter::new(vec![
            RoutingRule::new("a", &[&["x"]]).unwrap(),
            RoutingRule::new("b", &[&["y"]]).unwrap(),
            RoutingRule::new("a", &[&["z"]]).unwrap(),
        ]);
        assert_eq!(router.target_ids(), vec!["a", "b"]);
    }
}
