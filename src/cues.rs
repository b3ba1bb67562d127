use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CHOICES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(opt\s?-?out|preferences|your choices|controls?)\b").unwrap()
});
static RETENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(retention|retain)\b").unwrap());
static THIRD_PARTY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(third\s?-?party|sharing|share)\b").unwrap());

/// Presence flags for the three privacy-policy cues. All keys are always set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSet {
    pub choices_controls: bool,
    pub retention: bool,
    pub third_party: bool,
}

impl CueSet {
    pub fn any(&self) -> bool {
        self.choices_controls || self.retention || self.third_party
    }
}

pub fn detect_cues(text: &str) -> CueSet {
    CueSet {
        choices_controls: CHOICES_RE.is_match(text),
        retention: RETENTION_RE.is_match(text),
        third_party: THIRD_PARTY_RE.is_match(text),
    }
}

// ── Tests ──
