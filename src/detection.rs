//! State detection from free text
//!
//! Tags answers with the Indian state a text most likely refers to. An exact
//! (case-insensitive) name match wins immediately; otherwise each alphabetic
//! token of three or more letters is compared against state names by
//! normalised edit distance, so small misspellings like "rajastan" still
//! resolve.

use serde::Serialize;

/// Confidence reported for an exact name match
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.98;

/// Minimum similarity for a fuzzy token match
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.78;

const MIN_TOKEN_LEN: usize = 3;

/// A state that has a groundwater profile, as detection sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateName {
    pub key: &'static str,
    pub name: &'static str,
}

/// Profiled states in detection priority order
pub const DETECTABLE_STATES: &[StateName] = &[
    StateName {
        key: "punjab",
        name: "Punjab",
    },
    StateName {
        key: "delhi",
        name: "Delhi",
    },
    StateName {
        key: "rajasthan",
        name: "Rajasthan",
    },
];

/// Outcome of [`detect_state`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedState {
    /// Profile key, `None` when nothing cleared the threshold
    pub key: Option<&'static str>,
    /// 0.0 to 1.0
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

impl DetectedState {
    fn none() -> Self {
        Self {
            key: None,
            confidence: 0.0,
            matched_text: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.key.is_some()
    }
}

/// Detect which profiled state `text` refers to
pub fn detect_state(text: &str) -> DetectedState {
    detect_state_in(text, DETECTABLE_STATES)
}

/// [`detect_state`] against an explicit state list
pub fn detect_state_in(text: &str, states: &[StateName]) -> DetectedState {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_lowercase())
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .collect();

    let mut best = DetectedState::none();

    for state in states {
        let name = state.name.to_lowercase();

        if lower.contains(&name) {
            return DetectedState {
                key: Some(state.key),
                confidence: EXACT_MATCH_CONFIDENCE,
                matched_text: Some(name),
            };
        }

        for token in &tokens {
            let score = similarity(token, &name);
            if score > best.confidence && score > FUZZY_MATCH_THRESHOLD {
                best = DetectedState {
                    key: Some(state.key),
                    confidence: score,
                    matched_text: Some((*token).to_string()),
                };
            }
        }
    }

    best
}

/// `1 - distance / max_len`, in 0.0..=1.0
fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
