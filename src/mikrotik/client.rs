// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! High-level MikroTik client

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::endpoint::{DeviceEndpoint, Timeouts};
use crate::error::{Error, Result};

use super::connection::{
    RouterOsConnection, parse_pools, parse_profiles, parse_routerboard, parse_secrets,
    parse_system,
};
use super::types::{IpPool, PppProfile, PppSecret, RouterInfo, RouterboardInfo, SystemResource};

/// What a find-then-write operation ended up doing on the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    Created,
    Updated,
    Unchanged,
}

/// `MikroTik` `RouterOS` API client
///
/// Every operation opens its own connection, logs in, runs and
/// disconnects, whatever the outcome.
#[derive(Debug, Clone)]
pub struct MikroTikClient {
    endpoint: DeviceEndpoint,
    timeouts: Timeouts,
}

impl MikroTikClient {
    #[must_use]
    pub fn new(endpoint: DeviceEndpoint) -> Self {
        Self {
            endpoint,
            timeouts: Timeouts::routeros(),
        }
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    async fn open(&self) -> Result<RouterOsConnection> {
        RouterOsConnection::connect(&self.endpoint, self.timeouts).await
    }

    // PPP secrets

    /// Creates a PPP secret
    ///
    /// # Errors
    ///
    /// Returns `DeviceRejectedCommand` if the router refuses it, e.g. when a
    /// secret with that name already exists.
    pub async fn add_secret(&self, secret: &PppSecret) -> Result<()> {
        let mut conn = self.open().await?;
        let result = add_secret_on(&mut conn, secret).await;
        conn.disconnect().await;
        if result.is_ok() {
            tracing::info!("PPP secret '{}' added on {}", secret.name, self.endpoint.host);
        }
        result
    }

    pub async fn find_secret(&self, name: &str) -> Result<Option<PppSecret>> {
        let mut conn = self.open().await?;
        let result = find_secret_on(&mut conn, name).await;
        conn.disconnect().await;
        result
    }

    /// Creates the secret unless one with the same name exists.
    ///
    /// An existing secret is left as it is, password included.
    pub async fn ensure_secret(&self, secret: &PppSecret) -> Result<Change> {
        let mut conn = self.open().await?;
        let result = ensure_secret_on(&mut conn, secret).await;
        conn.disconnect().await;
        if let Ok(change) = &result {
            tracing::info!("PPP secret '{}' {:?} on {}", secret.name, change, self.endpoint.host);
        }
        result
    }

    /// Removes a PPP secret by name
    pub async fn remove_secret(&self, name: &str) -> Result<()> {
        let mut conn = self.open().await?;
        let result = conn
            .command("/ppp/secret/remove", [format!("=numbers={name}")])
            .await
            .map(|_| ());
        conn.disconnect().await;
        if result.is_ok() {
            tracing::info!("PPP secret '{}' removed on {}", name, self.endpoint.host);
        }
        result
    }

    // PPP profiles

    pub async fn add_profile(&self, profile: &PppProfile) -> Result<()> {
        let mut conn = self.open().await?;
        let result = conn
            .command("/ppp/profile/add", profile.words())
            .await
            .map(|_| ());
        conn.disconnect().await;
        result
    }

    pub async fn find_profile(&self, name: &str) -> Result<Option<PppProfile>> {
        let mut conn = self.open().await?;
        let result = find_profile_on(&mut conn, name).await;
        conn.disconnect().await;
        result
    }

    /// Overwrites the profile with RouterOS id `id`
    pub async fn set_profile(&self, id: &str, profile: &PppProfile) -> Result<()> {
        let mut conn = self.open().await?;
        let result = set_profile_on(&mut conn, id, profile).await;
        conn.disconnect().await;
        result
    }

    /// Removes a profile by name. Returns `false` when none existed.
    pub async fn remove_profile(&self, name: &str) -> Result<bool> {
        let mut conn = self.open().await?;
        let result = remove_profile_on(&mut conn, name).await;
        conn.disconnect().await;
        result
    }

    /// Updates the profile with the same name, or adds it
    pub async fn upsert_profile(&self, profile: &PppProfile) -> Result<Change> {
        let mut conn = self.open().await?;
        let result = upsert_profile_on(&mut conn, profile).await;
        conn.disconnect().await;
        if let Ok(change) = &result {
            tracing::info!("PPP profile '{}' {:?}", profile.name, change);
        }
        result
    }

    // IP pools

    pub async fn add_pool(&self, name: &str, ranges: &str) -> Result<()> {
        let mut conn = self.open().await?;
        let result = add_pool_on(&mut conn, name, ranges).await;
        conn.disconnect().await;
        result
    }

    pub async fn find_pool(&self, name: &str) -> Result<Option<IpPool>> {
        let mut conn = self.open().await?;
        let result = find_pool_on(&mut conn, name).await;
        conn.disconnect().await;
        result
    }

    pub async fn list_pools(&self) -> Result<Vec<IpPool>> {
        let mut conn = self.open().await?;
        let result = conn
            .command("/ip/pool/print", std::iter::empty::<&str>())
            .await
            .map(|rows| parse_pools(&rows));
        conn.disconnect().await;
        result
    }

    /// Renames the pool with RouterOS id `id` and replaces its ranges
    pub async fn set_pool(&self, id: &str, name: &str, ranges: &str) -> Result<()> {
        let mut conn = self.open().await?;
        let result = conn
            .command(
                "/ip/pool/set",
                [
                    format!("=.id={id}"),
                    format!("=name={name}"),
                    format!("=ranges={ranges}"),
                ],
            )
            .await
            .map(|_| ());
        conn.disconnect().await;
        result
    }

    /// Removes a pool by name. Returns `false` when none existed.
    pub async fn remove_pool(&self, name: &str) -> Result<bool> {
        let mut conn = self.open().await?;
        let result = remove_pool_on(&mut conn, name).await;
        conn.disconnect().await;
        result
    }

    /// Re-creates the pool when it is missing on the router
    pub async fn ensure_pool(&self, name: &str, ranges: &str) -> Result<Change> {
        let mut conn = self.open().await?;
        let result = ensure_pool_on(&mut conn, name, ranges).await;
        conn.disconnect().await;
        if let Ok(change) = &result {
            tracing::info!("IP pool '{}' {:?}", name, change);
        }
        result
    }

    // System

    pub async fn system_resource(&self) -> Result<SystemResource> {
        let mut conn = self.open().await?;
        let result = system_resource_on(&mut conn).await;
        conn.disconnect().await;
        result
    }

    pub async fn routerboard(&self) -> Result<RouterboardInfo> {
        let mut conn = self.open().await?;
        let result = routerboard_on(&mut conn).await;
        conn.disconnect().await;
        result
    }

    /// Resource and routerboard data fetched over one connection
    pub async fn router_info(&self) -> Result<RouterInfo> {
        let mut conn = self.open().await?;
        let result = async {
            let resource = system_resource_on(&mut conn).await?;
            let board = routerboard_on(&mut conn).await?;
            Ok::<_, Error>(RouterInfo::from_parts(&resource, &board))
        }
        .await;
        conn.disconnect().await;
        result
    }
}

async fn add_secret_on<S>(conn: &mut RouterOsConnection<S>, secret: &PppSecret) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut words = vec![
        format!("=name={}", secret.name),
        format!("=password={}", secret.password),
        format!("=service={}", secret.service),
        format!("=profile={}", secret.profile),
    ];
    if let Some(comment) = &secret.comment {
        words.push(format!("=comment={comment}"));
    }
    if secret.disabled {
        words.push("=disabled=yes".to_string());
    }
    conn.command("/ppp/secret/add", words).await.map(|_| ())
}

async fn find_secret_on<S>(conn: &mut RouterOsConnection<S>, name: &str) -> Result<Option<PppSecret>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let rows = conn
        .command("/ppp/secret/print", [format!("?name={name}")])
        .await?;
    Ok(parse_secrets(&rows).into_iter().next())
}

async fn ensure_secret_on<S>(conn: &mut RouterOsConnection<S>, secret: &PppSecret) -> Result<Change>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if find_secret_on(conn, &secret.name).await?.is_some() {
        return Ok(Change::Unchanged);
    }
    add_secret_on(conn, secret).await?;
    Ok(Change::Created)
}

async fn find_profile_on<S>(
    conn: &mut RouterOsConnection<S>,
    name: &str,
) -> Result<Option<PppProfile>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let rows = conn
        .command("/ppp/profile/print", [format!("?name={name}")])
        .await?;
    Ok(parse_profiles(&rows).into_iter().next())
}

async fn set_profile_on<S>(
    conn: &mut RouterOsConnection<S>,
    id: &str,
    profile: &PppProfile,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut words = vec![format!("=.id={id}")];
    words.extend(profile.words());
    conn.command("/ppp/profile/set", words).await.map(|_| ())
}

async fn remove_profile_on<S>(conn: &mut RouterOsConnection<S>, name: &str) -> Result<bool>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(id) = find_profile_on(conn, name).await?.and_then(|p| p.id) else {
        return Ok(false);
    };
    conn.command("/ppp/profile/remove", [format!("=.id={id}")])
        .await?;
    Ok(true)
}

async fn upsert_profile_on<S>(conn: &mut RouterOsConnection<S>, profile: &PppProfile) -> Result<Change>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match find_profile_on(conn, &profile.name).await?.and_then(|p| p.id) {
        Some(id) => {
            set_profile_on(conn, &id, profile).await?;
            Ok(Change::Updated)
        }
        None => {
            conn.command("/ppp/profile/add", profile.words()).await?;
            Ok(Change::Created)
        }
    }
}

async fn add_pool_on<S>(conn: &mut RouterOsConnection<S>, name: &str, ranges: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn.command(
        "/ip/pool/add",
        [format!("=name={name}"), format!("=ranges={ranges}")],
    )
    .await
    .map(|_| ())
}

async fn find_pool_on<S>(conn: &mut RouterOsConnection<S>, name: &str) -> Result<Option<IpPool>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let rows = conn
        .command("/ip/pool/print", [format!("?name={name}")])
        .await?;
    Ok(parse_pools(&rows).into_iter().next())
}

async fn remove_pool_on<S>(conn: &mut RouterOsConnection<S>, name: &str) -> Result<bool>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let Some(pool) = find_pool_on(conn, name).await? else {
        return Ok(false);
    };
    conn.command("/ip/pool/remove", [format!("=.id={}", pool.id)])
        .await?;
    Ok(true)
}

async fn ensure_pool_on<S>(conn: &mut RouterOsConnection<S>, name: &str, ranges: &str) -> Result<Change>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if find_pool_on(conn, name).await?.is_some() {
        return Ok(Change::Unchanged);
    }
    add_pool_on(conn, name, ranges).await?;
    Ok(Change::Created)
}

async fn system_resource_on<S>(conn: &mut RouterOsConnection<S>) -> Result<SystemResource>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let rows = conn
        .command("/system/resource/print", std::iter::empty::<&str>())
        .await?;
    Ok(parse_system(&rows))
}

async fn routerboard_on<S>(conn: &mut RouterOsConnection<S>) -> Result<RouterboardInfo>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let rows = conn
        .command("/system/routerboard/print", std::iter::empty::<&str>())
        .await?;
    Ok(parse_routerboard(&rows))
}
