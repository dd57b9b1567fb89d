// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Type definitions for `RouterOS` records

use std::fmt;

use serde::Serialize;

/// System resource information from a `MikroTik` router
#[derive(Debug, Clone, Serialize)]
pub struct SystemResource {
    pub uptime: String,
    pub cpu_load: u64,
    pub free_memory: u64,
    pub total_memory: u64,
    pub version: String,
    pub board_name: String,
    pub architecture_name: String,
    pub cpu: String,
}

/// `/system/routerboard/print` output
#[derive(Debug, Clone, Serialize)]
pub struct RouterboardInfo {
    pub model: String,
    pub serial_number: Option<String>,
    pub current_firmware: String,
    pub upgrade_firmware: Option<String>,
}

/// Inventory summary combining resource and routerboard data
#[derive(Debug, Clone, Serialize)]
pub struct RouterInfo {
    pub model: String,
    pub board_name: String,
    pub architecture_name: String,
    pub cpu: String,
    pub firmware_version: String,
    pub version: String,
    pub uptime: String,
}

impl RouterInfo {
    #[must_use]
    pub fn from_parts(resource: &SystemResource, board: &RouterboardInfo) -> Self {
        Self {
            model: resource.board_name.clone(),
            board_name: board.model.clone(),
            architecture_name: resource.architecture_name.clone(),
            cpu: resource.cpu.clone(),
            firmware_version: board.current_firmware.clone(),
            version: resource.version.clone(),
            uptime: resource.uptime.clone(),
        }
    }
}

/// PPP rate limit in megabits per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub upload_mbps: u32,
    pub download_mbps: u32,
}

impl RateLimit {
    #[must_use]
    pub fn new(upload_mbps: u32, download_mbps: u32) -> Self {
        Self {
            upload_mbps,
            download_mbps,
        }
    }

    /// Parses the `"{up}M/{down}M"` form; other units are not recognized
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (up, down) = value.split_once('/')?;
        let up = up.trim().strip_suffix('M')?.parse().ok()?;
        let down = down.trim().strip_suffix('M')?.parse().ok()?;
        Some(Self::new(up, down))
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}M/{}M", self.upload_mbps, self.download_mbps)
    }
}

/// PPP secret (subscriber login)
#[derive(Debug, Clone, Serialize)]
pub struct PppSecret {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Never serialized; `print` does not return it anyway
    #[serde(skip)]
    pub password: String,
    pub service: String,
    pub profile: String,
    pub comment: Option<String>,
    pub disabled: bool,
}

impl PppSecret {
    /// A PPPoE secret bound to `profile`
    #[must_use]
    pub fn pppoe(name: &str, password: &str, profile: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            password: password.to_string(),
            service: "pppoe".to_string(),
            profile: profile.to_string(),
            comment: None,
            disabled: false,
        }
    }

    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// PPP profile (service plan)
#[derive(Debug, Clone, Serialize)]
pub struct PppProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub rate_limit: Option<RateLimit>,
    pub local_address: Option<String>,
    pub remote_address: Option<String>,
    pub comment: Option<String>,
}

impl PppProfile {
    #[must_use]
    pub fn new(name: &str, rate_limit: RateLimit) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            rate_limit: Some(rate_limit),
            local_address: None,
            remote_address: None,
            comment: None,
        }
    }

    /// `=key=value` words for add/set, in the order the router echoes them
    pub(crate) fn words(&self) -> Vec<String> {
        let mut words = vec![format!("=name={}", self.name)];
        if let Some(rate) = self.rate_limit {
            words.push(format!("=rate-limit={rate}"));
        }
        if let Some(local) = &self.local_address {
            words.push(format!("=local-address={local}"));
        }
        if let Some(remote) = &self.remote_address {
            words.push(format!("=remote-address={remote}"));
        }
        if let Some(comment) = &self.comment {
            words.push(format!("=comment={comment}"));
        }
        words
    }
}

/// IP address pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpPool {
    pub id: String,
    pub name: String,
    pub ranges: String,
    pub next_pool: Option<String>,
}
