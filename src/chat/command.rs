use std::sync::LazyLock;

use regex::Regex;

static TRAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)^\s*react\s+(?:"([^"]*)"|(\S+))\s+(.+?)\s*$"#)
        .expect("TRAIN regex should compile")
});
static WHAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*what was that\b").expect("WHAT regex should compile"));
static IGNORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*ignore that\b").expect("IGNORE regex should compile"));
static HELP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*help\s*$").expect("HELP regex should compile"));

/// An authoring command addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `react <term> <response>` or `react "<multi word term>" <response>`
    Train { term: String, response: String },
    /// `what was that`
    WhatWasThat,
    /// `ignore that`
    IgnoreThat,
    Help,
}

impl Command {
    /// Parse the text of an addressed message; `None` if it is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(caps) = TRAIN.captures(text) {
            let term = caps.get(1).or_else(|| caps.get(2))?.as_str().to_string();
            let response = caps.get(3)?.as_str().to_string();
            return Some(Command::Train { term, response });
        }
        if WHAT.is_match(text) {
            return Some(Command::WhatWasThat);
        }
        if IGNORE.is_match(text) {
            return Some(Command::IgnoreThat);
        }
        if HELP.is_match(text) {
            return Some(Command::Help);
        }
        None
    }
}

/// One line per command, `(usage, description)`.
pub fn help_lines() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "react `term` `response`",
            "react with `response` when `term` is heard (single word)",
        ),
        (
            "react \"`term`\" `response`",
            "react with `response` when `term` is heard (multiple words)",
        ),
        ("what was that", "explain the last reaction"),
        ("ignore that", "forget the term/response pair behind the last reaction"),
    ]
}
