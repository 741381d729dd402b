//! Built-in routing tables
//!
//! Order matters: specific intents sit above broad ones so they are not
//! shadowed. Every target in [`GROUNDWATER_RULES`] must exist in the response
//! catalog; this is checked when application state is built.

use super::RuleTable;

/// Canned-answer routing for groundwater questions
pub const GROUNDWATER_RULES: &RuleTable = &[
    ("punjabRajasthanComparison", &[&["punjab"], &["rajasthan"]]),
    (
        "groundwaterComparison",
        &[&["comparison", "compare"], &["groundwater", "water", "level"]],
    ),
    (
        "groundwaterComparison",
        &[&["trend"], &["groundwater", "water", "level"]],
    ),
    (
        "blockAssessment",
        &[&["block", "assessment"], &["status", "show", "display"]],
    ),
    (
        "blockAssessment",
        &[
            &["critical", "over-exploited", "overexploited"],
            &["block", "area", "zone"],
        ],
    ),
    (
        "rechargeStrategy",
        &[
            &["strategy", "solution", "recommendation"],
            &["recharge", "conservation", "management"],
        ],
    ),
    (
        "rechargeStrategy",
        &[
            &["forecast", "predict", "future"],
            &["water", "groundwater", "availability"],
        ],
    ),
    (
        "cropRecommendations",
        &[
            &["crop", "agriculture", "farming"],
            &[
                "recommend",
                "grow",
                "plant",
                "suggestion",
                "water-scarce",
                "drought",
            ],
        ],
    ),
    (
        "conservationMeasures",
        &[
            &["conservation", "save", "saving", "efficient", "efficiency"],
            &["water", "measure", "method"],
        ],
    ),
    (
        "alertsRajasthan",
        &[
            &["alert", "critical", "emergency", "warning"],
            &["rajasthan", "groundwater", "depletion"],
        ],
    ),
    (
        "alertsRajasthan",
        &[
            &["list", "show", "display"],
            &["depletion", "critical", "severe", "warning"],
        ],
    ),
    (
        "punjabExtractionIncrease",
        &[
            &["why", "reason"],
            &["extraction"],
            &["increasing"],
            &["ludhiana", "amritsar"],
        ],
    ),
    (
        "rainfallImpactGroundwater",
        &[&["rainfall"], &["impact"], &["groundwater"]],
    ),
    (
        "punjabRainfall",
        &[
            &["rainfall"],
            &["pattern"],
            &["punjab"],
            &["groundwater", "extraction"],
        ],
    ),
    (
        "punjabRajasthanComparison",
        &[&["punjab"], &["situation"], &["compare"]],
    ),
    (
        "policyRechargeImprovements",
        &[
            &["policy"],
            &["change", "reform", "improve"],
            &["recharge", "groundwater"],
        ],
    ),
];

/// Target id produced by [`MAP_ANALYSIS_RULES`]
pub const MAP_ANALYSIS_TARGET: &str = "mapAnalysis";

/// Queries asking for a full analysis of an uploaded portal map
pub const MAP_ANALYSIS_RULES: &RuleTable = &[
    (MAP_ANALYSIS_TARGET, &[&["analyzing uploaded ingres map"]]),
    (MAP_ANALYSIS_TARGET, &[&["analyze map", "analyse map"]]),
    (
        MAP_ANALYSIS_TARGET,
        &[&["comprehensive groundwater analysis"]],
    ),
    (MAP_ANALYSIS_TARGET, &[&["ingres"], &["map"], &["analysis"]]),
    (
        MAP_ANALYSIS_TARGET,
        &[&["groundwater"], &["map"], &["analysis"]],
    ),
];
