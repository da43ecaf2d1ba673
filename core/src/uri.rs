//! Request URI composition.
//!
//! # Design
//! Path fragments are concatenated exactly as given: no separator is
//! inserted and no normalization happens. This is deliberate: the calling
//! layer owns delimiter placement, and the composer stays a pure string
//! operation. Query pairs are form-encoded (UTF-8, space becomes `+`,
//! reserved characters percent-escaped) and the `?` prefix appears only
//! when at least one pair exists.

use crate::descriptor::Param;

/// Join path fragments and encode query parameters into a final URI string.
pub fn compose(paths: &[String], query: &[Param]) -> String {
    let mut uri = paths.concat();
    let qs = query_string(query);
    if !qs.is_empty() {
        uri.push('?');
        uri.push_str(&qs);
    }
    uri
}

fn query_string(query: &[Param]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for p in query {
        serializer.append_pair(&p.key, &p.value);
    }
    serializer.finish()
}
