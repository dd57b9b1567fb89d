// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for convenient use.
//! Users of the library can import everything they need with:
//!
//! ```rust
//! use isp_provisioner::prelude::*;
//! ```

// Core types
pub use crate::config::{Config, DialectSettings, OltConfig};
pub use crate::endpoint::{DeviceEndpoint, Timeouts};
pub use crate::error::{Error, Result};

// RouterOS client
pub use crate::mikrotik::{
    Change, IpPool, MikroTikClient, PppProfile, PppSecret, RateLimit, RouterInfo,
    RouterboardInfo, SystemResource,
};

// OLT automation
pub use crate::olt::{
    CliTransport, DeprovisionOutcome, HostKeyPolicy, OltAutomation, OltDialect, OltSession,
    OltSystemInfo, ParsedOntRecord, SessionState,
};
