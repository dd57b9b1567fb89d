// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS reply sentences and attribute rows

use std::collections::HashMap;

/// Attribute name to value mapping for one reply sentence
pub type Row = HashMap<String, String>;

/// Classification of a reply sentence by its first word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Done,
    Re,
    Trap,
    Fatal,
    /// `!empty`, sent by RouterOS 7.18+ before `!done` when nothing matched
    Empty,
    Other,
}

/// One complete sentence: ordered words, terminator excluded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    pub words: Vec<String>,
}

impl Sentence {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn kind(&self) -> ReplyKind {
        match self.words.first().map(String::as_str) {
            Some("!done") => ReplyKind::Done,
            Some("!re") => ReplyKind::Re,
            Some("!trap") => ReplyKind::Trap,
            Some("!fatal") => ReplyKind::Fatal,
            Some("!empty") => ReplyKind::Empty,
            _ => ReplyKind::Other,
        }
    }

    /// `.tag=` value if the command was tagged
    pub fn tag(&self) -> Option<&str> {
        self.words.iter().find_map(|w| w.strip_prefix(".tag="))
    }

    /// Attribute words as a row, leading `=` stripped.
    ///
    /// The name ends at the second `=`, so values may contain `=`.
    pub fn attributes(&self) -> Row {
        let mut row = Row::new();
        for word in &self.words {
            if let Some(stripped) = word.strip_prefix('=') {
                match stripped.split_once('=') {
                    Some((k, v)) => row.insert(k.to_string(), v.to_string()),
                    None => row.insert(stripped.to_string(), String::new()),
                };
            }
        }
        row
    }

    /// Message of a `!trap`/`!fatal`; `!fatal` carries it as a bare word
    pub fn message(&self) -> Option<String> {
        if let Some(msg) = self.attributes().remove("message") {
            return Some(msg);
        }
        if self.kind() == ReplyKind::Fatal {
            let rest: Vec<&str> = self.words[1..].iter().map(String::as_str).collect();
            if !rest.is_empty() {
                return Some(rest.join(" "));
            }
        }
        None
    }
}

/// Converts raw sentences into rows: every `!re`, plus a `!done`
/// that carries attributes (such as the login challenge `ret`)
pub fn parse_sentences(sentences: &[Sentence]) -> Vec<Row> {
    sentences
        .iter()
        .filter_map(|s| match s.kind() {
            ReplyKind::Re => Some(s.attributes()),
            ReplyKind::Done => {
                let row = s.attributes();
                (!row.is_empty()).then_some(row)
            }
            _ => None,
        })
        .collect()
}
