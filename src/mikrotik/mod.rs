// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! `MikroTik` `RouterOS` API client module
//!
//! Connects to `MikroTik` routers via the `RouterOS` API, authenticates,
//! and manages PPP secrets, PPP profiles and IP pools.

mod client;
mod connection;
mod types;

// Re-export public types and functions
pub use client::{Change, MikroTikClient};
pub use connection::{
    MAX_WORD_LEN, ReplyKind, RouterOsConnection, Row, Sentence, challenge_response,
    decode_length, decode_word, encode_length, encode_word, parse_sentences,
};
pub use types::{
    IpPool, PppProfile, PppSecret, RateLimit, RouterInfo, RouterboardInfo, SystemResource,
};
