//! Outbound text, rendered verbatim by the transport.

use crate::random::{choose, RandomSource};
use crate::store::TermRecord;

const NOT_FOUND: &[&str] = &["Wat.", "I didn't say nothin'"];

pub fn learned(record: &TermRecord) -> String {
    format!("Reacting to {} with {}", record.term, record.response)
}

pub fn too_trivial(term: &str) -> String {
    format!("\"{term}\" is too trivial.")
}

pub fn ignored(record: &TermRecord) -> String {
    format!("No longer reacting to {} with {}", record.term, record.response)
}

pub fn what_was_that(record: &TermRecord) -> String {
    format!(
        "That was \"{}\", triggered by something like \"{}\"",
        record.response, record.term
    )
}

pub fn not_found(random: &dyn RandomSource) -> String {
    choose(random, NOT_FOUND)
        .copied()
        .unwrap_or(NOT_FOUND[0])
        .to_string()
}
