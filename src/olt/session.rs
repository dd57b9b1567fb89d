// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! OLT CLI session as an explicit state machine

use std::fmt;
use std::time::Duration;

use regex::bytes::Regex;
use tokio::time::{Instant, sleep, timeout_at};

use super::buffer::PatternBuffer;
use super::grammar::{Expect, OltCommandStep, OltDialect};
use super::parse::{
    LocatedOnt, OltSystemInfo, OntInfo, ParsedOntRecord, locate_ont, parse_ont_info,
    parse_optical_info, parse_system_info,
};
use super::transport::CliTransport;
use crate::error::{Error, Result, snippet};

/// Where the terminal currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport attached, banner not yet seen
    Disconnected,
    Authenticated,
    Enabled,
    Configuring,
    InterfaceSelected { pon_id: u32 },
    CommandIssued { pon_id: u32 },
    ResultParsed,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Enabled => write!(f, "enabled"),
            Self::Configuring => write!(f, "configuring"),
            Self::InterfaceSelected { pon_id } => write!(f, "on interface pon {pon_id}"),
            Self::CommandIssued { pon_id } => write!(f, "after a command on pon {pon_id}"),
            Self::ResultParsed => write!(f, "result parsed"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// One interactive session: a transport plus the state it is in.
///
/// Every command waits for its expected marker before the next one is
/// sent. Methods called from the wrong state fail with
/// `InvalidTransition` without touching the device.
pub struct OltSession<T: CliTransport> {
    transport: T,
    dialect: OltDialect,
    read_timeout: Duration,
    buffer: PatternBuffer,
    state: SessionState,
}

impl<T: CliTransport> OltSession<T> {
    pub fn new(transport: T, dialect: OltDialect, read_timeout: Duration) -> Self {
        Self {
            transport,
            dialect,
            read_timeout,
            buffer: PatternBuffer::default(),
            state: SessionState::Disconnected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dialect(&self) -> &OltDialect {
        &self.dialect
    }

    fn transition_error(&self, step: &str) -> Error {
        Error::InvalidTransition {
            step: step.to_string(),
            state: self.state.to_string(),
        }
    }

    /// Waits for the login banner to end in the base prompt
    pub async fn authenticate(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(self.transition_error("authenticate"));
        }
        let prompt = self.dialect.base_prompt().clone();
        match self.read_until("banner", &prompt).await {
            Ok(banner) => {
                tracing::trace!("OLT banner: {:?}", banner);
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(Error::UnexpectedDeviceResponse { step, output }) => {
                Err(Error::UnrecognizedPrompt { step, output })
            }
            Err(e) => Err(e),
        }
    }

    pub async fn enable(&mut self) -> Result<()> {
        if self.state != SessionState::Authenticated {
            return Err(self.transition_error("enable"));
        }
        let step = self.dialect.enable();
        self.exchange(&step).await?;
        self.state = SessionState::Enabled;
        Ok(())
    }

    pub async fn configure(&mut self) -> Result<()> {
        if self.state != SessionState::Enabled {
            return Err(self.transition_error("configure"));
        }
        let step = self.dialect.configure();
        self.exchange(&step).await?;
        self.state = SessionState::Configuring;
        Ok(())
    }

    /// Searches the autofind table for an ONT awaiting authorization
    pub async fn locate(&mut self, serial: &str) -> Result<LocatedOnt> {
        if self.state != SessionState::Configuring {
            return Err(self.transition_error("locate"));
        }
        let step = self.dialect.autofind(serial);
        let output = self.exchange(&step).await?;
        let located = locate_ont(&output, serial, self.dialect.pon_range())?;
        tracing::debug!("Located {} on pon {}", serial, located.pon_id);
        Ok(located)
    }

    /// Searches the registered ONT table
    pub async fn find_registered(&mut self, serial: &str) -> Result<OntInfo> {
        if self.state != SessionState::Configuring {
            return Err(self.transition_error("find registered ONT"));
        }
        let step = self.dialect.ont_info(serial);
        let output = self.exchange(&step).await?;
        let info = parse_ont_info(&output, serial, self.dialect.pon_range())?;
        tracing::debug!(
            "Found {} at pon {} onu {} ({}/{})",
            serial,
            info.pon_id,
            info.onu_id,
            info.online_status,
            info.active_status
        );
        Ok(info)
    }

    pub async fn select_interface(&mut self, pon_id: u32) -> Result<()> {
        if self.state != SessionState::Configuring {
            return Err(self.transition_error("select interface"));
        }
        let step = self.dialect.select_interface(pon_id);
        self.exchange(&step).await?;
        self.state = SessionState::InterfaceSelected { pon_id };
        Ok(())
    }

    /// Runs a mutating interface command and returns its raw output
    pub async fn issue(&mut self, step: &OltCommandStep) -> Result<String> {
        let pon_id = match self.state {
            SessionState::InterfaceSelected { pon_id } | SessionState::CommandIssued { pon_id } => {
                pon_id
            }
            _ => return Err(self.transition_error(step.name)),
        };
        let output = self.exchange(step).await?;
        self.state = SessionState::CommandIssued { pon_id };
        Ok(output)
    }

    /// Reads the optical row of `onu_id` on the selected port
    pub async fn optical(&mut self, onu_id: u32, serial: &str) -> Result<ParsedOntRecord> {
        let pon_id = match self.state {
            SessionState::InterfaceSelected { pon_id } | SessionState::CommandIssued { pon_id } => {
                pon_id
            }
            _ => return Err(self.transition_error("read optical info")),
        };
        let step = self.dialect.optical_info(pon_id, onu_id);
        let output = self.exchange(&step).await?;
        let record = parse_optical_info(&output, pon_id, onu_id, serial)?;
        self.state = SessionState::ResultParsed;
        Ok(record)
    }

    pub async fn system_info(&mut self) -> Result<OltSystemInfo> {
        if self.state != SessionState::Configuring {
            return Err(self.transition_error("read system info"));
        }
        let step = self.dialect.system_info();
        let output = self.exchange(&step).await?;
        Ok(parse_system_info(&output))
    }

    /// Closes the transport. Safe from any state, more than once.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.transport.close().await;
        self.buffer.clear();
        tracing::debug!("OLT session closed from state {}", self.state);
        self.state = SessionState::Closed;
    }

    async fn exchange(&mut self, step: &OltCommandStep) -> Result<String> {
        tracing::debug!("OLT step '{}': {}", step.name, step.command);
        self.buffer.clear();
        self.transport.send(&step.command).await?;

        let output = match &step.expect {
            Expect::Prompt(prompt) => self.read_until(step.name, prompt).await?,
            Expect::AnyOutput => {
                let prompt = self.dialect.interface_prompt().clone();
                self.read_until(step.name, &prompt)
                    .await
                    .or_else(|e| self.accept_any_output(&step.command, e))?
            }
        };

        if let Some(settle) = step.settle {
            tracing::debug!("Waiting {:?} after '{}'", settle, step.name);
            sleep(settle).await;
        }
        Ok(output)
    }

    /// For steps without a fixed marker a timeout is fine once the device
    /// printed something past the echo of `command`
    fn accept_any_output(&mut self, command: &str, error: Error) -> Result<String> {
        match error {
            Error::UnexpectedDeviceResponse { step, output } => {
                let text = self.buffer.take_string();
                let reply = text
                    .find(command)
                    .map_or(text.as_str(), |at| &text[at + command.len()..]);
                if reply.trim().is_empty() {
                    return Err(Error::UnexpectedDeviceResponse { step, output });
                }
                Ok(text)
            }
            other => Err(other),
        }
    }

    async fn read_until(&mut self, step: &str, prompt: &Regex) -> Result<String> {
        let deadline = Instant::now() + self.read_timeout;
        loop {
            if self.buffer.tail_contains(prompt) {
                return Ok(self.buffer.take_string());
            }
            match timeout_at(deadline, self.transport.recv()).await {
                Ok(Ok(Some(chunk))) => {
                    tracing::trace!("OLT <- {:?}", String::from_utf8_lossy(&chunk));
                    self.buffer.extend(&chunk);
                }
                Ok(Ok(None)) => {
                    return Err(Error::Connection(format!(
                        "OLT closed the session during '{step}': {}",
                        snippet(&self.buffer.as_str_lossy())
                    )));
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    tracing::debug!("Timed out after {:?} waiting on '{}'", self.read_timeout, step);
                    return Err(Error::unexpected(step, &self.buffer.as_str_lossy()));
                }
            }
        }
    }
}
