//! HTML entity decoding for stored note text.
//!
//! Note text passes through several web layers before it is persisted, and each layer may
//! escape it again, so the same value can arrive as `&amp;`, `&amp;amp;` or worse. Decoding
//! repeats a fixed substitution table until the text stops changing.

use crate::constants::DEFAULT_MAX_DECODE_PASSES;

/// Entity substitutions applied, in order, on every pass.
///
/// `&amp;` comes first so that one layer of escaping around any other entity is removed within
/// the same pass.
const ENTITY_TABLE: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&#x27;", "'"),
    ("&#x2F;", "/"),
    ("&#x2f;", "/"),
    ("&#47;", "/"),
    ("&sol;", "/"),
];

/// Decode nested HTML entities with the default pass cap.
///
/// Input nested more deeply than the cap comes back partly decoded, so decoding it again
/// changes it further.
pub fn decode_entities(text: &str) -> String {
    decode_entities_with_limit(text, DEFAULT_MAX_DECODE_PASSES)
}

/// Decode nested HTML entities, stopping after at most `max_passes` passes.
///
/// Every substitution shortens the text, so the loop always terminates; the cap only bounds the
/// work spent on adversarially nested input.
pub fn decode_entities_with_limit(text: &str, max_passes: usize) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut current = text.to_string();
    for _ in 0..max_passes {
        let next = decode_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }

    if decode_pass(&current) != current {
        tracing::warn!(
            max_passes,
            "entity decoding stopped before reaching a fixed point"
        );
    }
    current
}

fn decode_pass(text: &str) -> String {
    ENTITY_TABLE
        .iter()
        .fold(text.to_string(), |acc, (entity, replacement)| {
            if acc.contains(entity) {
                acc.replace(entity, replacement)
            } else {
                acc
            }
        })
}
