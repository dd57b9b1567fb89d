// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration module for the provisioning tools
//!
//! Device endpoints and OLT dialect settings are loaded from environment
//! variables (optionally via `.env`) or from JSON blobs.

use std::time::Duration;

use serde::Deserialize;

use crate::endpoint::{DeviceEndpoint, ROUTEROS_PORT, SSH_PORT, Timeouts};
use crate::error::{Error, Result};
use crate::olt::{HostKeyPolicy, OltDialect};


/// Default configuration values
pub mod defaults {
    pub const ROUTEROS_USERNAME: &str = "admin";
    pub const PON_PREFIX: &str = "1/0";
    pub const PON_RANGE: &str = "1/0/1-8";
    pub const SERIAL_PREFIX: &str = "TPLG-";
    pub const LINE_PROFILE_ID: u32 = 1;
    pub const SERVICE_PROFILE_ID: u32 = 2;
    pub const SETTLE_SECONDS: u64 = 5;
    pub const OLT_READ_TIMEOUT_SECONDS: u64 = 5;
}

/// Environment variable names used by the application
pub mod env_vars {
    pub const ROUTEROS_CONFIG: &str = "ROUTEROS_CONFIG";
    pub const ROUTEROS_HOST: &str = "ROUTEROS_HOST";
    pub const ROUTEROS_PORT: &str = "ROUTEROS_PORT";
    pub const ROUTEROS_USERNAME: &str = "ROUTEROS_USERNAME";
    pub const ROUTEROS_PASSWORD: &str = "ROUTEROS_PASSWORD";

    pub const OLT_CONFIG: &str = "OLT_CONFIG";
    pub const OLT_HOST: &str = "OLT_HOST";
    pub const OLT_PORT: &str = "OLT_PORT";
    pub const OLT_USERNAME: &str = "OLT_USERNAME";
    pub const OLT_PASSWORD: &str = "OLT_PASSWORD";
    pub const OLT_PON_PREFIX: &str = "OLT_PON_PREFIX";
    pub const OLT_PON_RANGE: &str = "OLT_PON_RANGE";
    pub const OLT_SERIAL_PREFIX: &str = "OLT_SERIAL_PREFIX";
    pub const OLT_LINE_PROFILE_ID: &str = "OLT_LINE_PROFILE_ID";
    pub const OLT_SERVICE_PROFILE_ID: &str = "OLT_SERVICE_PROFILE_ID";
    pub const OLT_SETTLE_SECONDS: &str = "OLT_SETTLE_SECONDS";
    pub const OLT_READ_TIMEOUT_SECONDS: &str = "OLT_READ_TIMEOUT_SECONDS";
    pub const OLT_HOST_KEY_POLICY: &str = "OLT_HOST_KEY_POLICY";
}

/// OLT endpoint plus the knobs of its CLI dialect
#[derive(Debug, Clone)]
pub struct OltConfig {
    pub endpoint: DeviceEndpoint,
    pub dialect: OltDialect,
    pub settle: Duration,
    pub timeouts: Timeouts,
    pub host_key_policy: HostKeyPolicy,
}

/// Dialect overrides accepted from the environment
#[derive(Debug, Clone, Deserialize)]
pub struct DialectSettings {
    pub pon_prefix: String,
    pub pon_range: String,
    pub serial_prefix: String,
    pub line_profile_id: u32,
    pub service_profile_id: u32,
}

impl Default for DialectSettings {
    fn default() -> Self {
        Self {
            pon_prefix: defaults::PON_PREFIX.to_string(),
            pon_range: defaults::PON_RANGE.to_string(),
            serial_prefix: defaults::SERIAL_PREFIX.to_string(),
            line_profile_id: defaults::LINE_PROFILE_ID,
            service_profile_id: defaults::SERVICE_PROFILE_ID,
        }
    }
}

/// Application-wide configuration. Either device may be absent.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub router: Option<DeviceEndpoint>,
    pub olt: Option<OltConfig>,
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let router = endpoint_from(
            &lookup,
            env_vars::ROUTEROS_CONFIG,
            env_vars::ROUTEROS_HOST,
            env_vars::ROUTEROS_PORT,
            env_vars::ROUTEROS_USERNAME,
            env_vars::ROUTEROS_PASSWORD,
            ROUTEROS_PORT,
        )?;

        let olt = match endpoint_from(
            &lookup,
            env_vars::OLT_CONFIG,
            env_vars::OLT_HOST,
            env_vars::OLT_PORT,
            env_vars::OLT_USERNAME,
            env_vars::OLT_PASSWORD,
            SSH_PORT,
        )? {
            Some(endpoint) => Some(olt_config(&lookup, endpoint)?),
            None => None,
        };

        if router.is_none() && olt.is_none() {
            tracing::warn!("No router or OLT configuration found in the environment");
        }

        Ok(Config { router, olt })
    }

    /// Router endpoint or a configuration error naming the missing variable
    pub fn require_router(&self) -> Result<&DeviceEndpoint> {
        self.router.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "router is not configured: set {} or {}",
                env_vars::ROUTEROS_HOST,
                env_vars::ROUTEROS_CONFIG
            ))
        })
    }

    /// OLT configuration or a configuration error naming the missing variable
    pub fn require_olt(&self) -> Result<&OltConfig> {
        self.olt.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "OLT is not configured: set {} or {}",
                env_vars::OLT_HOST,
                env_vars::OLT_CONFIG
            ))
        })
    }
}

fn endpoint_from<F>(
    lookup: &F,
    json_var: &str,
    host_var: &str,
    port_var: &str,
    user_var: &str,
    password_var: &str,
    default_port: u16,
) -> Result<Option<DeviceEndpoint>>
where
    F: Fn(&str) -> Option<String>,
{
    let endpoint = if let Some(json) = lookup(json_var) {
        serde_json::from_str::<DeviceEndpoint>(&json)
            .map_err(|e| Error::Config(format!("failed to parse {json_var}: {e}")))?
    } else if let Some(host) = lookup(host_var) {
        let port = match lookup(port_var) {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("invalid {port_var} '{v}': {e}")))?,
            None => default_port,
        };
        let username = lookup(user_var).unwrap_or_else(|| defaults::ROUTEROS_USERNAME.to_string());
        let password = lookup(password_var).unwrap_or_default();
        DeviceEndpoint::new(host, port, username, password)
    } else {
        return Ok(None);
    };

    endpoint.validate()?;
    Ok(Some(endpoint))
}

fn olt_config<F>(lookup: &F, endpoint: DeviceEndpoint) -> Result<OltConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let base = DialectSettings::default();
    let settings = DialectSettings {
        pon_prefix: lookup(env_vars::OLT_PON_PREFIX).unwrap_or(base.pon_prefix),
        pon_range: lookup(env_vars::OLT_PON_RANGE).unwrap_or(base.pon_range),
        serial_prefix: lookup(env_vars::OLT_SERIAL_PREFIX).unwrap_or(base.serial_prefix),
        line_profile_id: parse_var(lookup, env_vars::OLT_LINE_PROFILE_ID, base.line_profile_id)?,
        service_profile_id: parse_var(
            lookup,
            env_vars::OLT_SERVICE_PROFILE_ID,
            base.service_profile_id,
        )?,
    };

    let settle = Duration::from_secs(parse_var(
        lookup,
        env_vars::OLT_SETTLE_SECONDS,
        defaults::SETTLE_SECONDS,
    )?);
    let read = Duration::from_secs(parse_var(
        lookup,
        env_vars::OLT_READ_TIMEOUT_SECONDS,
        defaults::OLT_READ_TIMEOUT_SECONDS,
    )?);

    let host_key_policy = match lookup(env_vars::OLT_HOST_KEY_POLICY) {
        Some(v) => v.parse::<HostKeyPolicy>()?,
        None => HostKeyPolicy::default(),
    };

    Ok(OltConfig {
        endpoint,
        dialect: OltDialect::new(settings)?,
        settle,
        timeouts: Timeouts {
            read,
            ..Timeouts::olt()
        },
        host_key_policy,
    })
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("invalid {name} '{v}': {e}"))),
        None => Ok(default),
    }
}
