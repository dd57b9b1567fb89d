// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Provisioning scripts run against the OLT.
//!
//! Each public operation opens its own SSH session, runs one script and
//! closes the session on every exit path. The `*_over` variants take an
//! already opened transport.

use std::time::Duration;

use serde::Serialize;

use super::grammar::OltDialect;
use super::parse::{OltSystemInfo, ParsedOntRecord, parse_confirmed_onu};
use super::session::OltSession;
use super::transport::{CliTransport, HostKeyPolicy, SshShell};
use crate::config::OltConfig;
use crate::endpoint::{DeviceEndpoint, Timeouts};
use crate::error::Result;

/// ONU index assumed when neither the autofind row nor the confirm
/// acknowledgement names one
const FIRST_ONU_ID: u32 = 0;

/// What a deprovisioning run removed
#[derive(Debug, Clone, Serialize)]
pub struct DeprovisionOutcome {
    pub pon_id: u32,
    pub onu_id: u32,
    pub gpon_serial: String,
    pub deactivate_output: String,
    pub delete_output: String,
}

/// Automation engine bound to one OLT
#[derive(Debug, Clone)]
pub struct OltAutomation {
    pub endpoint: DeviceEndpoint,
    pub dialect: OltDialect,
    /// Wait after confirming an ONT before its optical row is read
    pub settle: Duration,
    pub timeouts: Timeouts,
    pub host_key_policy: HostKeyPolicy,
}

impl From<OltConfig> for OltAutomation {
    fn from(config: OltConfig) -> Self {
        Self {
            endpoint: config.endpoint,
            dialect: config.dialect,
            settle: config.settle,
            timeouts: config.timeouts,
            host_key_policy: config.host_key_policy,
        }
    }
}

impl OltAutomation {
    async fn open(&self) -> Result<SshShell> {
        SshShell::connect(&self.endpoint, self.timeouts, self.host_key_policy).await
    }

    fn session<T: CliTransport>(&self, transport: T) -> OltSession<T> {
        OltSession::new(transport, self.dialect.clone(), self.timeouts.read)
    }

    /// Authorizes the ONT with `serial` and returns its optical status
    pub async fn provision(&self, serial: &str, label: &str) -> Result<ParsedOntRecord> {
        let transport = self.open().await?;
        self.provision_over(transport, serial, label).await
    }

    pub async fn provision_over<T: CliTransport>(
        &self,
        transport: T,
        serial: &str,
        label: &str,
    ) -> Result<ParsedOntRecord> {
        let serial = self.dialect.normalize_serial(serial);
        let mut session = self.session(transport);
        let result = async {
            session.authenticate().await?;
            session.enable().await?;
            session.configure().await?;
            let located = session.locate(&serial).await?;
            session.select_interface(located.pon_id).await?;
            let confirm = self.dialect.confirm(&serial, label).with_settle(self.settle);
            let acknowledgement = session.issue(&confirm).await?;
            let onu_id = parse_confirmed_onu(&acknowledgement)
                .or(located.onu_id)
                .unwrap_or(FIRST_ONU_ID);
            session.optical(onu_id, &serial).await
        }
        .await;
        session.close().await;

        match &result {
            Ok(record) => tracing::info!(
                "Provisioned {} on pon {} onu {} (rx {} dBm, tx {} dBm)",
                serial,
                record.pon_id,
                record.onu_id,
                record.rx_dbm,
                record.tx_dbm
            ),
            Err(e) => tracing::error!("Provisioning {} failed: {}", serial, e),
        }
        result
    }

    /// Deactivates and deletes the registered ONT with `serial`
    pub async fn deprovision(&self, serial: &str) -> Result<DeprovisionOutcome> {
        let transport = self.open().await?;
        self.deprovision_over(transport, serial).await
    }

    pub async fn deprovision_over<T: CliTransport>(
        &self,
        transport: T,
        serial: &str,
    ) -> Result<DeprovisionOutcome> {
        let serial = self.dialect.normalize_serial(serial);
        let mut session = self.session(transport);
        let result = async {
            session.authenticate().await?;
            session.enable().await?;
            session.configure().await?;
            let info = session.find_registered(&serial).await?;
            session.select_interface(info.pon_id).await?;
            let deactivate_output = session.issue(&self.dialect.deactivate(info.onu_id)).await?;
            let delete_output = session.issue(&self.dialect.delete(info.onu_id)).await?;
            Ok(DeprovisionOutcome {
                pon_id: info.pon_id,
                onu_id: info.onu_id,
                gpon_serial: info.gpon_serial,
                deactivate_output,
                delete_output,
            })
        }
        .await;
        session.close().await;

        match &result {
            Ok(outcome) => tracing::info!(
                "Deprovisioned {} from pon {} onu {}",
                serial,
                outcome.pon_id,
                outcome.onu_id
            ),
            Err(e) => tracing::error!("Deprovisioning {} failed: {}", serial, e),
        }
        result
    }

    /// Reads the optical status of a registered ONT without changing it
    pub async fn query(&self, serial: &str) -> Result<ParsedOntRecord> {
        let transport = self.open().await?;
        self.query_over(transport, serial).await
    }

    pub async fn query_over<T: CliTransport>(
        &self,
        transport: T,
        serial: &str,
    ) -> Result<ParsedOntRecord> {
        let serial = self.dialect.normalize_serial(serial);
        let mut session = self.session(transport);
        let result = async {
            session.authenticate().await?;
            session.enable().await?;
            session.configure().await?;
            let info = session.find_registered(&serial).await?;
            session.select_interface(info.pon_id).await?;
            session.optical(info.onu_id, &serial).await
        }
        .await;
        session.close().await;

        if let Err(e) = &result {
            tracing::error!("Querying {} failed: {}", serial, e);
        }
        result
    }

    pub async fn system_info(&self) -> Result<OltSystemInfo> {
        let transport = self.open().await?;
        self.system_info_over(transport).await
    }

    pub async fn system_info_over<T: CliTransport>(&self, transport: T) -> Result<OltSystemInfo> {
        let mut session = self.session(transport);
        let result = async {
            session.authenticate().await?;
            session.enable().await?;
            session.configure().await?;
            session.system_info().await
        }
        .await;
        session.close().await;
        result
    }
}
