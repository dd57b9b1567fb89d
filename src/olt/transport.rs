// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Byte transport under the OLT session: an interactive SSH shell in
//! production, scripted transcripts in tests

use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg, Disconnect};
use secrecy::ExposeSecret;

use crate::endpoint::{DeviceEndpoint, Timeouts};
use crate::error::{Error, Result};

const TERMINAL_WIDTH: u32 = 511;
const TERMINAL_HEIGHT: u32 = 24;
const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);

/// Line-oriented terminal the session drives
pub trait CliTransport: Send {
    /// Writes `line` followed by a carriage return
    fn send(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Next chunk of output; `None` once the remote side has closed
    fn recv(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Releases the connection. Must be safe to call more than once.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// How the OLT's SSH host key is checked against `~/.ssh/known_hosts`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Trust and record unknown hosts, reject changed keys
    #[default]
    AcceptNew,
    /// Only hosts already in known_hosts
    Strict,
    Disabled,
}

impl FromStr for HostKeyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept-new" => Ok(Self::AcceptNew),
            "strict" => Ok(Self::Strict),
            "disabled" | "off" => Ok(Self::Disabled),
            other => Err(Error::Config(format!(
                "unknown host key policy '{other}', expected accept-new, strict or disabled"
            ))),
        }
    }
}

/// Interactive SSH shell on a PTY
pub struct SshShell {
    session: Handle<ShellHandler>,
    channel: Channel<Msg>,
    closed: bool,
}

impl SshShell {
    /// Connects, authenticates with the endpoint password and opens a shell
    pub async fn connect(
        endpoint: &DeviceEndpoint,
        timeouts: Timeouts,
        policy: HostKeyPolicy,
    ) -> Result<Self> {
        let config = Arc::new(client::Config {
            inactivity_timeout: Some(INACTIVITY_TIMEOUT),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
        let handler = ShellHandler {
            host: endpoint.host.clone(),
            port: endpoint.port,
            policy,
            host_key_error: host_key_error.clone(),
        };

        tracing::debug!("Opening SSH session to {}", endpoint.socket_addr());
        let connect = async {
            client::connect(config, (endpoint.host.as_str(), endpoint.port), handler)
                .await
                .map_err(|e| {
                    // prefer the detailed host key failure over russh's generic one
                    host_key_error
                        .lock()
                        .ok()
                        .and_then(|mut slot| slot.take())
                        .unwrap_or_else(|| e.into())
                })
        };
        let what = format!("SSH connect to {}", endpoint.socket_addr());
        let mut session = within(timeouts.connect, &what, connect).await?;

        let login = async {
            let auth = session
                .authenticate_password(
                    endpoint.username.as_str(),
                    endpoint.secret.expose_secret(),
                )
                .await?;
            if !auth.success() {
                return Err(Error::Authentication {
                    user: endpoint.username.clone(),
                    reason: "password rejected by SSH server".to_string(),
                });
            }

            let channel = session.channel_open_session().await?;
            channel
                .request_pty(true, "xterm", TERMINAL_WIDTH, TERMINAL_HEIGHT, 0, 0, &[])
                .await?;
            channel.request_shell(true).await?;
            Ok::<_, Error>(channel)
        };
        let what = format!("SSH login and shell on {}", endpoint.socket_addr());
        let channel = within(timeouts.connect, &what, login).await?;
        tracing::debug!("SSH shell ready on {}", endpoint.socket_addr());

        Ok(Self {
            session,
            channel,
            closed: false,
        })
    }
}

impl CliTransport for SshShell {
    async fn send(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\r');
        self.channel.data(&data[..]).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::ExtendedData { data, .. }) => return Ok(Some(data.to_vec())),
                Some(ChannelMsg::Eof | ChannelMsg::Close) | None => return Ok(None),
                Some(other) => tracing::trace!("Ignoring channel message: {:?}", other),
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.channel.close().await {
            tracing::trace!("Ignoring error on channel close: {}", e);
        }
        if let Err(e) = self
            .session
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::warn!("SSH disconnect failed: {}", e);
        }
    }
}

/// Runs one connection setup phase under `limit`
async fn within<T>(
    limit: Duration,
    what: &str,
    phase: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, phase)
        .await
        .map_err(|_| Error::Connection(format!("{what} timed out after {limit:?}")))?
}

struct ShellHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    host_key_error: Arc<Mutex<Option<Error>>>,
}

impl ShellHandler {
    fn reject(&self, error: Error) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }

    fn known(&self, key: &PublicKey) -> std::result::Result<bool, Error> {
        match russh::keys::check_known_hosts(&self.host, self.port, key) {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(Error::Connection(format!(
                "host key for {}:{} changed (known_hosts line {line})",
                self.host, self.port
            ))),
            Err(e) => Err(Error::Connection(format!("known_hosts: {e}"))),
        }
    }
}

impl client::Handler for ShellHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if self.policy == HostKeyPolicy::Disabled {
            return Ok(true);
        }

        match self.known(server_public_key) {
            Ok(true) => Ok(true),
            Ok(false) if self.policy == HostKeyPolicy::AcceptNew => {
                if let Err(e) = russh::keys::known_hosts::learn_known_hosts(
                    &self.host,
                    self.port,
                    server_public_key,
                ) {
                    tracing::warn!("Failed to save host key: {}", e);
                }
                Ok(true)
            }
            Ok(false) => Ok(self.reject(Error::Connection(format!(
                "host {}:{} is not in known_hosts",
                self.host, self.port
            )))),
            Err(e) => Ok(self.reject(e)),
        }
    }
}
