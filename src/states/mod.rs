//! State groundwater profiles and block reports
//!
//! Static reference data shipped with the crate: a deep-dive profile per
//! detectable state (recharge sources, sector usage, stress drivers, risk
//! factors) and assessment reports for individual blocks. Both tables are
//! loaded once and read-only afterwards.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::detection::{StateName, detect_state};

const BUILTIN_PROFILES: &str = include_str!("../../data/states.json");
const BUILTIN_BLOCKS: &str = include_str!("../../data/blocks.json");

/// "deep dive punjab", "state deep dive rajasthan", "deepdive delhi"
static DEEP_DIVE_COMMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:state\s+)?deep\s*dive\s+([a-z ]{3,40})$")
        .expect("deep dive pattern is a valid regex")
});

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("failed to parse {table}: {source}")]
    Parse {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate {table} key '{key}'")]
    DuplicateKey { table: &'static str, key: String },

    #[error("{0} entry has an empty key")]
    EmptyKey(&'static str),

    #[error("detectable state '{0}' has no profile")]
    MissingProfile(String),
}

/// CGWB assessment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AssessmentCategory {
    #[serde(rename = "Over-Exploited")]
    OverExploited,
    Critical,
    #[serde(rename = "Semi-Critical")]
    SemiCritical,
    Safe,
}

/// Named percentage share (recharge source or usage sector)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Share {
    pub name: String,
    pub value: f64,
}

/// Stress driver scored 0-100
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Driver {
    pub name: String,
    pub impact: f64,
}

/// Yearly balance in billion cubic metres
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct YearBalance {
    pub year: u16,
    pub extraction: f64,
    pub recharge: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RiskFactor {
    pub factor: String,
    pub score: f64,
    pub weight: u8,
}

/// Deep-dive profile of one state
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StateGroundwaterProfile {
    key: String,
    name: String,
    category: AssessmentCategory,
    /// Extraction as a percentage of annual extractable resource
    extraction_stage: f64,
    annual_decline_m: f64,
    recharge_components: Vec<Share>,
    sectors: Vec<Share>,
    drivers: Vec<Driver>,
    time_series: Vec<YearBalance>,
    risk_factors: Vec<RiskFactor>,
    recommendations: Vec<String>,
    #[serde(default)]
    notes: String,
}

impl StateGroundwaterProfile {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> AssessmentCategory {
        self.category
    }

    pub fn extraction_stage(&self) -> f64 {
        self.extraction_stage
    }

    pub fn recharge_components(&self) -> &[Share] {
        &self.recharge_components
    }

    pub fn sectors(&self) -> &[Share] {
        &self.sectors
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn time_series(&self) -> &[YearBalance] {
        &self.time_series
    }

    /// Weighted mean of the risk factor scores, 0 when there are none
    pub fn weighted_risk(&self) -> f64 {
        let total_weight: u32 = self.risk_factors.iter().map(|r| u32::from(r.weight)).sum();
        if total_weight == 0 {
            return 0.0;
        }
        self.risk_factors
            .iter()
            .map(|r| r.score * f64::from(r.weight))
            .sum::<f64>()
            / f64::from(total_weight)
    }
}

/// Recharge in hectare metres
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlockRecharge {
    pub total: f64,
    pub rainfall: f64,
    pub canal: f64,
}

/// Extraction in hectare metres
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlockExtraction {
    pub total: f64,
    pub irrigation: f64,
    pub domestic: f64,
    pub industry: f64,
}

/// Assessment report for one block
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlockReport {
    key: String,
    block: String,
    district: String,
    state: String,
    category: AssessmentCategory,
    recharge: BlockRecharge,
    extraction: BlockExtraction,
    stage: String,
    /// Stage of extraction over recent assessments, oldest first
    trend: Vec<f64>,
}

impl BlockReport {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn block(&self) -> &str {
        &self.block
    }

    pub fn district(&self) -> &str {
        &self.district
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn category(&self) -> AssessmentCategory {
        self.category
    }

    pub fn extraction(&self) -> &BlockExtraction {
        &self.extraction
    }
}

/// Immutable tables of state profiles and block reports
#[derive(Debug, Clone)]
pub struct StateAtlas {
    profiles: Vec<StateGroundwaterProfile>,
    /// Lower-cased key and name, both pointing at the same profile
    profile_index: HashMap<String, usize>,
    blocks: Vec<BlockReport>,
    block_index: HashMap<String, usize>,
}

impl StateAtlas {
    pub fn new(
        profiles: Vec<StateGroundwaterProfile>,
        blocks: Vec<BlockReport>,
    ) -> Result<Self, AtlasError> {
        let mut profile_index = HashMap::new();
        for (position, profile) in profiles.iter().enumerate() {
            let key = profile.key.trim().to_lowercase();
            if key.is_empty() {
                return Err(AtlasError::EmptyKey("state profile"));
            }
            if profile_index.insert(key.clone(), position).is_some() {
                return Err(AtlasError::DuplicateKey {
                    table: "state profile",
                    key,
                });
            }
            profile_index
                .entry(profile.name.to_lowercase())
                .or_insert(position);
        }

        let mut block_index = HashMap::new();
        for (position, block) in blocks.iter().enumerate() {
            let key = block.key.trim().to_lowercase();
            if key.is_empty() {
                return Err(AtlasError::EmptyKey("block report"));
            }
            if block_index.insert(key.clone(), position).is_some() {
                return Err(AtlasError::DuplicateKey {
                    table: "block report",
                    key,
                });
            }
        }

        Ok(Self {
            profiles,
            profile_index,
            blocks,
            block_index,
        })
    }

    pub fn from_json_strs(profiles: &str, blocks: &str) -> Result<Self, AtlasError> {
        let profiles = serde_json::from_str(profiles).map_err(|source| AtlasError::Parse {
            table: "state profiles",
            source,
        })?;
        let blocks = serde_json::from_str(blocks).map_err(|source| AtlasError::Parse {
            table: "block reports",
            source,
        })?;
        Self::new(profiles, blocks)
    }

    /// The tables shipped with the crate
    pub fn builtin() -> Result<Self, AtlasError> {
        Self::from_json_strs(BUILTIN_PROFILES, BUILTIN_BLOCKS)
    }

    /// Profile by key or by state name, case-insensitive
    pub fn profile(&self, key_or_name: &str) -> Option<&StateGroundwaterProfile> {
        self.profile_index
            .get(&key_or_name.trim().to_lowercase())
            .map(|&position| &self.profiles[position])
    }

    pub fn profiles(&self) -> &[StateGroundwaterProfile] {
        &self.profiles
    }

    /// Profile of the state `text` mentions, tolerating misspellings
    pub fn profile_for_text(&self, text: &str) -> Option<&StateGroundwaterProfile> {
        detect_state(text).key.and_then(|key| self.profile(key))
    }

    /// Resolve a "deep dive <state>" command
    ///
    /// `None` when the message is not the command or names no known state.
    pub fn deep_dive(&self, message: &str) -> Option<&StateGroundwaterProfile> {
        let candidate = parse_deep_dive(message)?;
        self.profile_for_text(&candidate)
            .or_else(|| self.profile(&candidate))
    }

    pub fn block(&self, key: &str) -> Option<&BlockReport> {
        self.block_index
            .get(&key.trim().to_lowercase())
            .map(|&position| &self.blocks[position])
    }

    pub fn blocks(&self) -> &[BlockReport] {
        &self.blocks
    }

    /// First block, in table order, whose key appears in `query`
    pub fn find_block(&self, query: &str) -> Option<&BlockReport> {
        let lower = query.to_lowercase();
        self.blocks
            .iter()
            .find(|block| lower.contains(&block.key.to_lowercase()))
    }

    /// Check that every detectable state resolves to a profile
    pub fn ensure_profiles_for(&self, states: &[StateName]) -> Result<(), AtlasError> {
        match states.iter().find(|state| self.profile(state.key).is_none()) {
            Some(missing) => Err(AtlasError::MissingProfile(missing.key.to_string())),
            None => Ok(()),
        }
    }
}

/// State text of a "deep dive" command, trimmed and lower-cased
pub fn parse_deep_dive(message: &str) -> Option<String> {
    let lower = message.trim().to_lowercase();
    DEEP_DIVE_COMMAND
        .captures(&lower)
        .and_then(|captures| captures.get(1))
        .map(|state| state.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DETECTABLE_STATES;

    fn atlas() -> StateAtlas {
        StateAtlas::builtin().expect("built-in atlas should load")
    }

    #[test]
    fn test_builtin_atlas_loads() {
        let atlas = atlas();
        assert_eq!(atlas.profiles().len(), 3);
        assert_eq!(atlas.blocks().len(), 2);
        atlas.ensure_profiles_for(DETECTABLE_STATES).unwrap();
    }

    #[test]
    fn test_profile_lookup_by_key_or_name() {
        let atlas = atlas();
        let punjab = atlas.profile("punjab").unwrap();
        assert_eq!(punjab.name(), "Punjab");
        assert_eq!(punjab.category(), AssessmentCategory::OverExploited);
        assert_eq!(punjab.extraction_stage(), 168.0);
        assert_eq!(punjab.drivers()[0].name, "Free Power");
        assert_eq!(punjab.time_series().len(), 9);

        assert_eq!(atlas.profile("Rajasthan").unwrap().key(), "rajasthan");
        assert!(atlas.profile("kerala").is_none());
    }

    #[test]
    fn test_profile_shares_sum_to_hundred() {
        for profile in atlas().profiles() {
            let total: f64 = profile.sectors().iter().map(|s| s.value).sum();
            assert_eq!(total, 100.0, "{} sectors", profile.key());
        }
    }

    #[test]
    fn test_weighted_risk() {
        let punjab = atlas().profile("punjab").cloned().unwrap();
        // (92*5 + 63*3 + 74*4 + 81*4 + 55*2) / 18
        let expected = (460.0 + 189.0 + 296.0 + 324.0 + 110.0) / 18.0;
        assert!((punjab.weighted_risk() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_parse_deep_dive_variants() {
        assert_eq!(parse_deep_dive("deep dive punjab").as_deref(), Some("punjab"));
        assert_eq!(
            parse_deep_dive("State Deep Dive Rajasthan").as_deref(),
            Some("rajasthan")
        );
        assert_eq!(parse_deep_dive("deepdive delhi ").as_deref(), Some("delhi"));
        assert_eq!(
            parse_deep_dive("deep dive madhya pradesh").as_deref(),
            Some("madhya pradesh")
        );
    }

    #[test]
    fn test_parse_deep_dive_rejects_other_text() {
        assert_eq!(parse_deep_dive("tell me about a deep dive into punjab"), None);
        assert_eq!(parse_deep_dive("deep dive"), None);
        // State text must be 3+ letters or spaces
        assert_eq!(parse_deep_dive("deep dive up"), None);
        assert_eq!(parse_deep_dive("deep dive punjab 2023"), None);
    }

    #[test]
    fn test_deep_dive_resolves_misspelled_state() {
        let atlas = atlas();
        assert_eq!(atlas.deep_dive("deep dive rajastan").unwrap().key(), "rajasthan");
        assert_eq!(atlas.deep_dive("state deep dive Delhi").unwrap().key(), "delhi");
        assert!(atlas.deep_dive("deep dive kerala").is_none());
        assert!(atlas.deep_dive("punjab groundwater").is_none());
    }

    #[test]
    fn test_find_block_in_query() {
        let atlas = atlas();
        let chaksu = atlas.find_block("Show the report for Chaksu block").unwrap();
        assert_eq!(chaksu.district(), "Jaipur");
        assert_eq!(chaksu.state(), "Rajasthan");
        assert_eq!(chaksu.category(), AssessmentCategory::Critical);
        assert_eq!(chaksu.extraction().total, 94.1);

        assert_eq!(atlas.find_block("delhi status").unwrap().key(), "delhi");
        assert!(atlas.find_block("ludhiana extraction").is_none());
        assert_eq!(atlas.block("CHAKSU").unwrap().block(), "Chaksu");
    }

    #[test]
    fn test_duplicate_profile_key_rejected() {
        let profiles = format!("[{0}, {0}]", minimal_profile("punjab", "Punjab"));
        let err = StateAtlas::from_json_strs(&profiles, "[]").unwrap_err();
        assert!(matches!(err, AtlasError::DuplicateKey { ref key, .. } if key == "punjab"));
    }

    #[test]
    fn test_missing_profile_for_detectable_state() {
        let profiles = format!("[{}]", minimal_profile("punjab", "Punjab"));
        let atlas = StateAtlas::from_json_strs(&profiles, "[]").unwrap();
        let err = atlas.ensure_profiles_for(DETECTABLE_STATES).unwrap_err();
        assert!(matches!(err, AtlasError::MissingProfile(ref key) if key == "delhi"));
    }

    #[test]
    fn test_malformed_table_reports_which() {
        let err = StateAtlas::from_json_strs("[]", "{").unwrap_err();
        assert!(err.to_string().contains("block reports"));
    }

    fn minimal_profile(key: &str, name: &str) -> String {
        serde_json::json!({
            "key": key,
            "name": name,
            "category": "Critical",
            "extraction_stage": 100.0,
            "annual_decline_m": 0.5,
            "recharge_components": [],
            "sectors": [],
            "drivers": [],
            "time_series": [],
            "risk_factors": [],
            "recommendations": []
        })
        .to_string()
    }
}
