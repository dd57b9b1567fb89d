// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Shared connection parameters and reachability probe

use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{Error, Result};

/// Default RouterOS API port
pub const ROUTEROS_PORT: u16 = 8728;

/// Default SSH port
pub const SSH_PORT: u16 = 22;

/// Address and credentials of one device, supplied per call
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    #[serde(alias = "password")]
    pub secret: SecretString,
}

impl DeviceEndpoint {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    /// `host:port` form accepted by `TcpStream::connect`
    #[must_use]
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            // bare IPv6 literal
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Validates endpoint fields
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("device host cannot be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config(format!(
                "invalid port 0 for device '{}'",
                self.host
            )));
        }
        if self.username.trim().is_empty() {
            return Err(Error::Config(format!(
                "username cannot be empty for device '{}'",
                self.host
            )));
        }
        Ok(())
    }
}

/// Bounds applied to connect and read operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Timeouts {
    /// RouterOS defaults: 5s connect, 30s per reply
    #[must_use]
    pub const fn routeros() -> Self {
        Self {
            connect: Duration::from_secs(5),
            read: Duration::from_secs(30),
        }
    }

    /// OLT defaults: 10s for the SSH handshake, 5s per prompt
    #[must_use]
    pub const fn olt() -> Self {
        Self {
            connect: Duration::from_secs(10),
            read: Duration::from_secs(5),
        }
    }
}

/// Bounded TCP connect used as a liveness check. Never fails.
pub async fn probe(host: &str, port: u16, limit: Duration) -> bool {
    let addr = DeviceEndpoint::new(host, port, "probe", "").socket_addr();
    match timeout(limit, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => {
            tracing::debug!("Probe to {} succeeded", addr);
            true
        }
        Ok(Err(e)) => {
            tracing::debug!("Probe to {} failed: {}", addr, e);
            false
        }
        Err(_) => {
            tracing::debug!("Probe to {} timed out after {:?}", addr, limit);
            false
        }
    }
}
