// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! RouterOS authentication

use md5::compute as md5_compute;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncRead, AsyncWrite};

use super::RouterOsConnection;
use super::reply::parse_sentences;
use crate::error::{Error, Result};

/// Legacy login response: `00` followed by the hex MD5 of
/// `0x00 ++ password ++ challenge`, the challenge given as hex
pub fn challenge_response(password: &str, challenge_hex: &str) -> Result<String> {
    let challenge = hex::decode(challenge_hex).map_err(|e| {
        Error::ProtocolDecode(format!("invalid login challenge '{challenge_hex}': {e}"))
    })?;

    let mut data = Vec::with_capacity(1 + password.len() + challenge.len());
    data.push(0u8);
    data.extend_from_slice(password.as_bytes());
    data.extend_from_slice(&challenge);
    let digest = md5_compute(&data);

    let mut response = String::from("00");
    response.push_str(&hex::encode(digest.0));
    Ok(response)
}

impl<S> RouterOsConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Logs in with plain credentials; answers the MD5 challenge when the
    /// device replies with one (pre-6.43 firmware)
    pub async fn login(&mut self, username: &str, password: &SecretString) -> Result<()> {
        tracing::trace!("Attempting login for user: {}", username);
        let name = format!("=name={username}");

        self.send(
            "/login",
            [
                name.clone(),
                format!("=password={}", password.expose_secret()),
            ],
        )
        .await?;
        let sentences = self
            .read_raw()
            .await
            .map_err(|e| auth_failure(username, e))?;

        let challenge = parse_sentences(&sentences)
            .into_iter()
            .find_map(|row| row.get("ret").cloned());

        let Some(challenge) = challenge else {
            tracing::debug!("Login successful (plain method)");
            return Ok(());
        };

        tracing::trace!("Challenge received, length: {}", challenge.len());
        let response = challenge_response(password.expose_secret(), &challenge)?;
        self.send("/login", [name, format!("=response={response}")])
            .await?;
        self.read_raw()
            .await
            .map_err(|e| auth_failure(username, e))?;

        tracing::debug!("Login successful (challenge-response method)");
        Ok(())
    }
}

fn auth_failure(username: &str, error: Error) -> Error {
    match error {
        Error::DeviceRejectedCommand { message, .. } => Error::Authentication {
            user: username.to_string(),
            reason: message,
        },
        other => other,
    }
}
