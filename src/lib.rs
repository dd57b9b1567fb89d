// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! # ISP Provisioner
//!
//! Subscriber provisioning for small ISPs.
//!
//! This library manages PPPoE subscribers on MikroTik routers through the
//! RouterOS binary API and authorizes GPON ONTs on an OLT by driving its
//! SSH command line.
//!
//! ## Main modules
//! - `config`: configuration management
//! - `endpoint`: device addresses, credentials and timeouts
//! - `error`: error types
//! - `mikrotik`: RouterOS API client
//! - `olt`: OLT CLI automation
//! - `prelude`: commonly used types and traits

pub mod config;
pub mod endpoint;
mod error;
pub mod mikrotik;
pub mod olt;
pub mod prelude;

// Re-export commonly used types
/// Application configuration
pub use config::{Config, OltConfig};

/// Device endpoint and reachability probe
pub use endpoint::{DeviceEndpoint, Timeouts, probe};

/// Application error and result type
pub use error::{Error, Result};

/// RouterOS client
pub use mikrotik::{Change, MikroTikClient};

/// OLT automation engine
pub use olt::{OltAutomation, OltSession};

/// RouterOS wire protocol length encoding (public for tests)
pub use mikrotik::{decode_length, encode_length};
