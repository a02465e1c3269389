//! Tag normalization: raw analyzer fragments to a canonical tag set.
//!
//! Fixed stage order: split comma-joined fragments into trimmed tokens,
//! apply the exclusion stages in order (short-circuiting per token),
//! translate survivors through the dictionary, deduplicate.
//!
//! Exclusion runs on the *untranslated* token. A consequence worth knowing:
//! a tag whose translated form matches an exclusion rule survives the pass
//! that produced it, and is only dropped on a later pass when the translated
//! form is re-normalized. This is long-standing behavior of the tag tables
//! this tool serves and is kept as-is; normalization remains idempotent for
//! any set already fully normalized (translating a translated tag is a
//! no-op, CJK output never translates again).

pub mod dictionary;
pub mod filters;

pub use dictionary::{contains_cjk, Dictionary};
pub use filters::{build_stages, FilterStage};

use std::collections::BTreeSet;

/// Normalize raw tag fragments into a canonical, deduplicated tag set
pub fn normalize(
    fragments: &[String],
    stages: &[FilterStage],
    dict: &Dictionary,
) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for fragment in fragments {
        for token in fragment.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if stages.iter().any(|stage| stage.excludes(token)) {
                continue;
            }
            tags.insert(dict.translate(token));
        }
    }
    tags
}
