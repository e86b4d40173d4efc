use serde::Deserialize;
use thiserror::Error;

use crate::content::{Difficulty, PracticeSet, Scheme, TargetUnit};

pub const DEFAULT_MODEL_HINT: &str = "gemini-flash-lite-latest";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("no content endpoint configured")]
    NoEndpoint,
    #[error("network support is disabled in this build")]
    Disabled,
    #[error("request failed: {0}")]
    Request(String),
    #[error("malformed content: {0}")]
    Malformed(String),
    #[error("content contained no characters")]
    Empty,
}

/// A remote producer of practice sets. Implementations may block; the
/// session controller runs them off the input path.
pub trait ContentSource: Send + Sync {
    fn fetch(
        &self,
        scheme: Scheme,
        difficulty: Difficulty,
        model_hint: &str,
    ) -> Result<PracticeSet, ContentError>;
}

// Generated wubi codes are often from the 98 edition or mixed up between
// similar glyphs; these are the 86 codes.
const STRUCTURAL_OVERRIDES: &[(char, &str)] = &[
    ('老', "ftx"), ('师', "jgm"), ('考', "ftn"), ('者', "ftj"), ('教', "ftb"),
    ('电', "jnv"), ('脑', "ebh"), ('机', "sm"), ('器', "kkk"), ('学', "ipb"),
    ('习', "nud"), ('进', "fjp"), ('步', "hgr"), ('成', "dnn"), ('功', "et"),
    ('快', "nwk"), ('乐', "qii"), ('汉', "icy"), ('字', "pb"), ('语', "yg"),
    ('言', "y"), ('文', "yy"), ('打', "rsh"), ('练', "xrg"), ('简', "tuj"),
    ('单', "ujf"), ('的', "rqy"), ('一', "g"), ('是', "jgh"), ('不', "i"),
    ('了', "b"), ('人', "w"), ('有', "e"), ('我', "q"), ('他', "w"),
    ('这', "p"), ('个', "wh"), ('们', "w"), ('中', "k"), ('来', "go"),
    ('上', "h"), ('大', "d"), ('国', "l"), ('好', "vb"), ('实', "pb"),
    ('践', "kh"), ('真', "fh"), ('理', "gj"), ('唯', "kw"), ('准', "uw"),
    ('只', "kw"), ('精', "om"), ('髓', "me"), ('提', "rsh"), ('高', "ym"),
    ('效', "uy"), ('率', "yx"),
];

pub fn structural_override(glyph: char) -> Option<&'static str> {
    STRUCTURAL_OVERRIDES
        .iter()
        .find(|(g, _)| *g == glyph)
        .map(|(_, code)| *code)
}

/// Wire shape of a generated set: each row is
/// `[glyph, pinyin, wubi, gloss]`, trailing fields optional.
#[derive(Debug, Deserialize)]
struct GeneratedPayload {
    #[serde(default)]
    translation: Option<String>,
    data: Vec<Vec<String>>,
}

/// Parse a generated payload into a practice set with a fresh id.
pub fn parse_generated(json: &str) -> Result<PracticeSet, ContentError> {
    let payload: GeneratedPayload =
        serde_json::from_str(json).map_err(|e| ContentError::Malformed(e.to_string()))?;

    let mut units = Vec::with_capacity(payload.data.len());
    for row in &payload.data {
        let mut fields = row.iter().map(|s| s.trim());
        let glyph_field = fields.next().unwrap_or_default();
        let mut glyph_chars = glyph_field.chars();
        let glyph = match (glyph_chars.next(), glyph_chars.next()) {
            (Some(g), None) => g,
            _ => {
                return Err(ContentError::Malformed(format!(
                    "expected a single glyph, got '{glyph_field}'"
                )));
            }
        };
        let phonetic = fields.next().unwrap_or_default();
        let structural = match structural_override(glyph) {
            Some(code) => code.to_string(),
            None => fields.next().unwrap_or_default().to_lowercase(),
        };
        let mut unit = TargetUnit::new(glyph, phonetic, &structural);
        if let Some(gloss) = row.get(3).map(|s| s.trim()).filter(|s| !s.is_empty()) {
            unit = unit.with_gloss(gloss);
        }
        units.push(unit);
    }

    if units.is_empty() {
        return Err(ContentError::Empty);
    }
    Ok(PracticeSet::new(units, payload.translation))
}

/// Fetches generated sets from an HTTP endpoint that speaks the
/// [`parse_generated`] payload.
pub struct HttpContentSource {
    endpoint: Option<String>,
}

impl HttpContentSource {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { endpoint }
    }
}

impl ContentSource for HttpContentSource {
    fn fetch(
        &self,
        scheme: Scheme,
        difficulty: Difficulty,
        model_hint: &str,
    ) -> Result<PracticeSet, ContentError> {
        let endpoint = self.endpoint.as_deref().ok_or(ContentError::NoEndpoint)?;
        let body = fetch_url(endpoint, scheme, difficulty, model_hint)?;
        parse_generated(&body)
    }
}

#[cfg(feature = "network")]
fn fetch_url(
    endpoint: &str,
    scheme: Scheme,
    difficulty: Difficulty,
    model_hint: &str,
) -> Result<String, ContentError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| ContentError::Request(e.to_string()))?;
    let response = client
        .get(endpoint)
        .query(&[
            ("scheme", scheme.as_str()),
            ("difficulty", difficulty.as_str()),
            ("model", model_hint),
        ])
        .send()
        .map_err(|e| ContentError::Request(e.to_string()))?;
    if !response.status().is_success() {
        return Err(ContentError::Request(format!("HTTP {}", response.status())));
    }
    response
        .text()
        .map_err(|e| ContentError::Request(e.to_string()))
}

#[cfg(not(feature = "network"))]
fn fetch_url(
    _endpoint: &str,
    _scheme: Scheme,
    _difficulty: Difficulty,
    _model_hint: &str,
) -> Result<String, ContentError> {
    Err(ContentError::Disabled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generated_rows() {
        let json = r#"{
            "text": "汉字",
            "translation": "Chinese characters",
            "data": [["汉", "hàn", "ICY", "水+又"], ["字", "zì", "pb"]]
        }"#;
        let set = parse_generated(json).unwrap();
        assert_eq!(set.text, "汉字");
        assert_eq!(set.units[0].structural, "icy");
        assert_eq!(set.units[0].gloss.as_deref(), Some("水+又"));
        assert_eq!(set.units[1].gloss, None);
        assert_eq!(set.translation.as_deref(), Some("Chinese characters"));
        assert!(!set.is_builtin());
    }

    #[test]
    fn overrides_replace_generated_structural_code() {
        let json = r#"{"data": [["老", "lǎo", "ftj"], ["水", "shuǐ", "ii"]]}"#;
        let set = parse_generated(json).unwrap();
        assert_eq!(set.units[0].structural, "ftx");
        assert_eq!(set.units[1].structural, "ii");
    }

    #[test]
    fn rejects_multi_glyph_rows() {
        let json = r#"{"data": [["今天", "jīntiān", "wyn"]]}"#;
        assert!(matches!(parse_generated(json), Err(ContentError::Malformed(_))));
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(matches!(parse_generated(r#"{"data": []}"#), Err(ContentError::Empty)));
        assert!(matches!(parse_generated("not json"), Err(ContentError::Malformed(_))));
    }

    #[test]
    fn http_source_without_endpoint_fails_fast() {
        let source = HttpContentSource::new(None);
        let err = source
            .fetch(Scheme::Phonetic, Difficulty::Beginner, DEFAULT_MODEL_HINT)
            .unwrap_err();
        assert!(matches!(err, ContentError::NoEndpoint));
    }
}
