// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! GPON OLT automation over an interactive SSH shell.
//!
//! The OLT exposes no machine API, so every operation drives its CLI the
//! way an operator would: send a line, wait for the expected prompt in
//! the tail of the output, scrape the table that came back.

mod automation;
mod buffer;
mod grammar;
mod parse;
mod session;
mod transport;

pub use automation::{DeprovisionOutcome, OltAutomation};
pub use buffer::{DEFAULT_SEARCH_DEPTH, PatternBuffer};
pub use grammar::{Expect, OltCommandStep, OltDialect};
pub use parse::{
    LocatedOnt, OltSystemInfo, OntInfo, ParsedOntRecord, locate_ont, parse_confirmed_onu,
    parse_ont_info, parse_optical_info, parse_system_info,
};
pub use session::{OltSession, SessionState};
pub use transport::{CliTransport, HostKeyPolicy, SshShell};
