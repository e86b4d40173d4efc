use rust_embed::Embed;
use tracing::error;

use crate::content::{Difficulty, PracticeSet, TargetUnit};

pub const FALLBACK_ID_PREFIX: &str = "fallback";

#[derive(Embed)]
#[folder = "assets/fallback/"]
struct FallbackAssets;

/// Built-in set for a difficulty. Always available, so a session can start
/// without any stored or fetched content.
pub fn builtin_set(difficulty: Difficulty) -> PracticeSet {
    let filename = format!("{}.json", difficulty.as_str());
    if let Some(file) = FallbackAssets::get(&filename) {
        match serde_json::from_slice::<PracticeSet>(file.data.as_ref()) {
            Ok(set) if !set.is_empty() => return set,
            Ok(_) => error!(%filename, "bundled practice set is empty"),
            Err(e) => error!(%filename, error = %e, "bundled practice set is malformed"),
        }
    } else {
        error!(%filename, "bundled practice set is missing");
    }
    minimal_set()
}

fn minimal_set() -> PracticeSet {
    PracticeSet::with_id(
        format!("{FALLBACK_ID_PREFIX}-minimal"),
        vec![
            TargetUnit::new('中', "zhōng", "k").with_gloss("Middle"),
            TargetUnit::new('文', "wén", "yy").with_gloss("Writing"),
            TargetUnit::new('学', "xué", "ipb").with_gloss("Study"),
            TargetUnit::new('习', "xí", "nud").with_gloss("Practice"),
        ],
        Some("Study Chinese".to_string()),
    )
}
