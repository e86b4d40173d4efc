pub mod fallback;
pub mod normalize;
pub mod source;

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code alphabet the learner types in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Pinyin.
    Phonetic,
    /// Wubi 86.
    Structural,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

pub const ALL_DIFFICULTIES: [Difficulty; 3] = [
    Difficulty::Beginner,
    Difficulty::Intermediate,
    Difficulty::Advanced,
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseLabelError {
    kind: &'static str,
    value: String,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Phonetic => "phonetic",
            Scheme::Structural => "structural",
        }
    }
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phonetic" | "pinyin" => Ok(Scheme::Phonetic),
            "structural" | "wubi" => Ok(Scheme::Structural),
            other => Err(ParseLabelError {
                kind: "scheme",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(ParseLabelError {
                kind: "difficulty",
                value: other.to_string(),
            }),
        }
    }
}

/// One character the learner has to produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUnit {
    #[serde(rename = "char")]
    pub glyph: char,
    #[serde(rename = "pinyin", default)]
    pub phonetic: String,
    #[serde(rename = "wubi", default)]
    pub structural: String,
    #[serde(rename = "explanation", default, skip_serializing_if = "Option::is_none")]
    pub gloss: Option<String>,
}

impl TargetUnit {
    pub fn new(glyph: char, phonetic: &str, structural: &str) -> Self {
        Self {
            glyph,
            phonetic: phonetic.to_string(),
            structural: structural.to_string(),
            gloss: None,
        }
    }

    pub fn with_gloss(mut self, gloss: &str) -> Self {
        self.gloss = Some(gloss.to_string());
        self
    }

    /// Raw code for the given scheme, before normalization.
    pub fn code(&self, scheme: Scheme) -> &str {
        match scheme {
            Scheme::Phonetic => &self.phonetic,
            Scheme::Structural => &self.structural,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSet {
    pub id: String,
    pub text: String,
    #[serde(rename = "characters")]
    pub units: Vec<TargetUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

impl PracticeSet {
    /// Build a set with a freshly generated id; the glyph text is derived
    /// from the units.
    pub fn new(units: Vec<TargetUnit>, translation: Option<String>) -> Self {
        let salt: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
        let id = format!("{}-{salt:06x}", Utc::now().timestamp_millis());
        Self::with_id(id, units, translation)
    }

    pub fn with_id(id: impl Into<String>, units: Vec<TargetUnit>, translation: Option<String>) -> Self {
        let text = units.iter().map(|u| u.glyph).collect();
        Self {
            id: id.into(),
            text,
            units,
            translation,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn is_builtin(&self) -> bool {
        self.id.starts_with(fallback::FALLBACK_ID_PREFIX)
    }

    /// Dedup identity: two sets are "the same content" when their glyph
    /// text matches, regardless of id.
    pub fn same_content(&self, other: &PracticeSet) -> bool {
        self.text == other.text
    }
}
