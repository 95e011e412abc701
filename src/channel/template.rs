//! Path-template matching for channel strings.
//!
//! A channel family is addressed by a template of `/`-separated segments
//! where `{name}` segments capture the concrete value at that position
//! (e.g. `session/{session_id}/metadata` matches
//! `session/abc-123/metadata` with `session_id = "abc-123"`).

use std::collections::HashMap;

/// Parameters captured from a concrete channel string, keyed by the
/// placeholder names of the matching template.
pub type PathParams = HashMap<String, String>;

/// Matches a concrete channel string against a path template.
///
/// Returns the captured parameters on a match, `None` otherwise:
/// - Segment counts must be equal.
/// - A literal template segment must equal the concrete segment exactly.
/// - A `{name}` segment captures any concrete value, including the empty
///   string; captures are untyped — UUID or numeric validation is the
///   caller's responsibility.
#[must_use]
pub fn match_template(template: &str, concrete: &str) -> Option<PathParams> {
    let template_segments: Vec<&str> = template.split('/').collect();
    let concrete_segments: Vec<&str> = concrete.split('/').collect();

    if template_segments.len() != concrete_segments.len() {
        return None;
    }

    let mut params = PathParams::new();
    for (pattern, value) in template_segments.iter().zip(concrete_segments.iter()) {
        match placeholder_name(pattern) {
            Some(name) => {
                params.insert(name.to_string(), (*value).to_string());
            }
            None if pattern == value => {}
            None => return None,
        }
    }
    Some(params)
}

/// Returns `true` if two templates can both match some literal channel
/// string. Used by the registry's startup ambiguity check.
#[must_use]
pub fn templates_overlap(a: &str, b: &str) -> bool {
    let a_segments: Vec<&str> = a.split('/').collect();
    let b_segments: Vec<&str> = b.split('/').collect();

    if a_segments.len() != b_segments.len() {
        return false;
    }

    // A position conflicts only when both sides are literals that differ;
    // a placeholder on either side matches anything.
    a_segments
        .iter()
        .zip(b_segments.iter())
        .all(|(sa, sb)| {
            placeholder_name(sa).is_some() || placeholder_name(sb).is_some() || sa == sb
        })
}

/// Returns the placeholder name if the segment has the `{name}` form.
fn placeholder_name(segment: &str) -> Option<&str> {
    segment.strip_prefix('{')?.strip_suffix('}')
}
