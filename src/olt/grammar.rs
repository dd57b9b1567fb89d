// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Command grammar and prompt table of the OLT CLI dialect

use std::time::Duration;

use regex::bytes::Regex;

use crate::config::DialectSettings;
use crate::error::{Error, Result};

const BASE_PROMPT: &str = r"OLT\d*>";
const PRIVILEGED_PROMPT: &str = r"#";
const CONFIG_PROMPT: &str = r"\(config\)#";
const INTERFACE_PROMPT: &str = r"\(config-if-gpon\)#";

/// Serial characters kept after the vendor prefix
const SERIAL_SUFFIX_LEN: usize = 8;

/// What must show up in the output before a step counts as answered
#[derive(Debug, Clone)]
pub enum Expect {
    /// Prompt regex searched in the tail of the output
    Prompt(Regex),
    /// Whatever the device prints; the command result is verified later
    AnyOutput,
}

/// One command of an automation script
#[derive(Debug, Clone)]
pub struct OltCommandStep {
    /// Short name used in logs and errors
    pub name: &'static str,
    /// Command text, without the line terminator
    pub command: String,
    pub expect: Expect,
    /// Grace period after the reply, before the next step
    pub settle: Option<Duration>,
}

impl OltCommandStep {
    fn new(name: &'static str, command: String, expect: Expect) -> Self {
        Self {
            name,
            command,
            expect,
            settle: None,
        }
    }

    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = (!settle.is_zero()).then_some(settle);
        self
    }
}

/// Prompt patterns and command parameters of one OLT CLI dialect
#[derive(Debug, Clone)]
pub struct OltDialect {
    base_prompt: Regex,
    privileged_prompt: Regex,
    config_prompt: Regex,
    interface_prompt: Regex,
    pon_prefix: String,
    pon_range: String,
    serial_prefix: String,
    line_profile_id: u32,
    service_profile_id: u32,
}

impl OltDialect {
    pub fn new(settings: DialectSettings) -> Result<Self> {
        let pon_prefix = settings.pon_prefix.trim().trim_end_matches('/').to_string();
        if pon_prefix.is_empty() {
            return Err(Error::Config("PON prefix must not be empty".to_string()));
        }
        let pon_range = settings.pon_range.trim().to_string();
        if pon_range.is_empty() || pon_range.contains(char::is_whitespace) {
            return Err(Error::Config(format!(
                "invalid PON range '{}'",
                settings.pon_range
            )));
        }

        Ok(Self {
            base_prompt: compile(BASE_PROMPT)?,
            privileged_prompt: compile(PRIVILEGED_PROMPT)?,
            config_prompt: compile(CONFIG_PROMPT)?,
            interface_prompt: compile(INTERFACE_PROMPT)?,
            pon_prefix,
            pon_range,
            serial_prefix: settings.serial_prefix.trim().to_uppercase(),
            line_profile_id: settings.line_profile_id,
            service_profile_id: settings.service_profile_id,
        })
    }

    pub fn base_prompt(&self) -> &Regex {
        &self.base_prompt
    }

    pub fn config_prompt(&self) -> &Regex {
        &self.config_prompt
    }

    pub fn interface_prompt(&self) -> &Regex {
        &self.interface_prompt
    }

    pub fn pon_range(&self) -> &str {
        &self.pon_range
    }

    /// Full port path for a PON index, e.g. `1/0/8`
    pub fn pon_path(&self, pon_id: u32) -> String {
        format!("{}/{pon_id}", self.pon_prefix)
    }

    /// Serial prefix plus the last eight characters, upper-cased
    pub fn normalize_serial(&self, raw: &str) -> String {
        let cleaned: Vec<char> = raw.trim().to_uppercase().chars().collect();
        let start = cleaned.len().saturating_sub(SERIAL_SUFFIX_LEN);
        let suffix: String = cleaned[start..].iter().collect();
        format!("{}{suffix}", self.serial_prefix)
    }

    pub fn enable(&self) -> OltCommandStep {
        OltCommandStep::new(
            "enable",
            "enable".to_string(),
            Expect::Prompt(self.privileged_prompt.clone()),
        )
    }

    pub fn configure(&self) -> OltCommandStep {
        OltCommandStep::new(
            "configure",
            "configure".to_string(),
            Expect::Prompt(self.config_prompt.clone()),
        )
    }

    /// Search among ONTs waiting for authorization
    pub fn autofind(&self, serial: &str) -> OltCommandStep {
        OltCommandStep::new(
            "autofind",
            format!("show ont autofind by-sn {serial} {}", self.pon_range),
            Expect::Prompt(self.config_prompt.clone()),
        )
    }

    /// Search among registered ONTs
    pub fn ont_info(&self, serial: &str) -> OltCommandStep {
        OltCommandStep::new(
            "ont-info",
            format!("show ont info by-sn {serial} {}", self.pon_range),
            Expect::Prompt(self.config_prompt.clone()),
        )
    }

    pub fn select_interface(&self, pon_id: u32) -> OltCommandStep {
        OltCommandStep::new(
            "interface",
            format!("interface gpon {}", self.pon_path(pon_id)),
            Expect::Prompt(self.interface_prompt.clone()),
        )
    }

    /// Authorizes an ONT by serial. Whitespace in `label` becomes `_`
    /// since the CLI splits arguments on it.
    pub fn confirm(&self, serial: &str, label: &str) -> OltCommandStep {
        let label = label.split_whitespace().collect::<Vec<_>>().join("_");
        let desc = if label.is_empty() {
            String::new()
        } else {
            format!(" desc {label}")
        };
        OltCommandStep::new(
            "confirm",
            format!(
                "ont confirm sn-auth {serial}{desc} ont-lineprofile-id {} ont-srvprofile-id {}",
                self.line_profile_id, self.service_profile_id
            ),
            Expect::AnyOutput,
        )
    }

    pub fn deactivate(&self, onu_id: u32) -> OltCommandStep {
        OltCommandStep::new(
            "deactivate",
            format!("ont deactivate {onu_id}"),
            Expect::AnyOutput,
        )
    }

    pub fn delete(&self, onu_id: u32) -> OltCommandStep {
        OltCommandStep::new("delete", format!("ont delete {onu_id}"), Expect::AnyOutput)
    }

    pub fn optical_info(&self, pon_id: u32, onu_id: u32) -> OltCommandStep {
        OltCommandStep::new(
            "optical-info",
            format!(
                "show ont optical-info gpon {} {onu_id}",
                self.pon_path(pon_id)
            ),
            Expect::Prompt(self.interface_prompt.clone()),
        )
    }

    pub fn system_info(&self) -> OltCommandStep {
        OltCommandStep::new(
            "system-info",
            "show system-info".to_string(),
            Expect::Prompt(self.config_prompt.clone()),
        )
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("invalid prompt pattern {pattern}: {e}")))
}
