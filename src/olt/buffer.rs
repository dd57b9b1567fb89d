// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Output buffer with prompt search limited to the tail

use regex::bytes::Regex;

/// Bytes from the end of the buffer searched for prompts
pub const DEFAULT_SEARCH_DEPTH: usize = 1000;

const ESC: u8 = 0x1B;
const BEL: u8 = 0x07;

/// Longest unterminated escape sequence held back between chunks
const MAX_HELD_ESCAPE: usize = 64;

/// Accumulates CLI output for one step.
///
/// ANSI escape sequences are stripped on the way in. A sequence cut off at
/// the end of a chunk is kept aside and stripped together with the next
/// chunk, so a colored prompt split across packets still matches. Prompt
/// searches only look at the last `search_depth` bytes.
#[derive(Debug)]
pub struct PatternBuffer {
    text: Vec<u8>,
    held: Vec<u8>,
    search_depth: usize,
}

impl PatternBuffer {
    pub fn new(search_depth: usize) -> Self {
        Self {
            text: Vec::with_capacity(4096),
            held: Vec::new(),
            search_depth,
        }
    }

    pub fn extend(&mut self, data: &[u8]) {
        let mut raw = std::mem::take(&mut self.held);
        raw.extend_from_slice(data);

        let split = unterminated_escape(&raw)
            .filter(|start| raw.len() - start <= MAX_HELD_ESCAPE)
            .unwrap_or(raw.len());
        self.held = raw.split_off(split);
        self.text.extend(strip_ansi_escapes::strip(&raw));
    }

    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        let start = self.text.len().saturating_sub(self.search_depth);
        pattern.is_match(&self.text[start..])
    }

    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }

    /// Takes the contents as text and resets the buffer
    pub fn take_string(&mut self) -> String {
        let held = std::mem::take(&mut self.held);
        self.text.extend(strip_ansi_escapes::strip(&held));
        let bytes = std::mem::take(&mut self.text);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// True when nothing printable has arrived
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.held.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEPTH)
    }
}

/// Start of a trailing escape sequence whose final byte has not arrived
fn unterminated_escape(raw: &[u8]) -> Option<usize> {
    let start = raw.iter().rposition(|&b| b == ESC)?;
    let rest = &raw[start + 1..];
    match rest.first() {
        None => Some(start),
        // CSI: parameter and intermediate bytes until a final byte in 0x40..=0x7E
        Some(b'[') => rest[1..]
            .iter()
            .all(|b| (0x20..=0x3F).contains(b))
            .then_some(start),
        // OSC: runs until BEL (an `ESC \` terminator would be the last ESC)
        Some(b']') => (!rest.contains(&BEL)).then_some(start),
        Some(_) => None,
    }
}
