// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ispctl")]
#[command(about = "Provision PPPoE subscribers and GPON ONTs.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query the MikroTik router
    #[command(subcommand)]
    Router(RouterCommand),
    /// Manage PPP secrets
    #[command(subcommand)]
    Secret(SecretCommand),
    /// Manage PPP profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Manage IP pools
    #[command(subcommand)]
    Pool(PoolCommand),
    /// Authorize, remove or inspect ONTs on the OLT
    #[command(subcommand)]
    Ont(OntCommand),
    /// Query the OLT
    #[command(subcommand)]
    Olt(OltCommand),
}

#[derive(Subcommand)]
pub enum RouterCommand {
    /// Model, firmware and uptime
    Info,
    /// Check that the API port accepts connections
    Probe,
}

#[derive(Args)]
pub struct SecretArgs {
    pub name: String,
    #[arg(long)]
    pub password: String,
    #[arg(long)]
    pub profile: String,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Subcommand)]
pub enum SecretCommand {
    /// Create a PPPoE secret
    Add(SecretArgs),
    /// Create the secret unless one with this name exists
    Ensure(SecretArgs),
    Find {
        name: String,
    },
    Remove {
        name: String,
    },
}

#[derive(Args)]
pub struct ProfileArgs {
    pub name: String,
    /// Upload limit in Mbit/s
    #[arg(long)]
    pub upload: u32,
    /// Download limit in Mbit/s
    #[arg(long)]
    pub download: u32,
    #[arg(long)]
    pub local_address: Option<String>,
    #[arg(long)]
    pub remote_address: Option<String>,
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Create the profile or update it in place
    Upsert(ProfileArgs),
    Find { name: String },
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum PoolCommand {
    /// Create the pool unless one with this name exists
    Ensure { name: String, ranges: String },
    Find { name: String },
    List,
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum OntCommand {
    /// Authorize an ONT waiting in autofind
    Provision {
        serial: String,
        /// Description stored on the OLT
        #[arg(long, default_value = "")]
        label: String,
    },
    /// Deactivate and delete a registered ONT
    Deprovision { serial: String },
    /// Optical status of a registered ONT
    Query { serial: String },
}

#[derive(Subcommand)]
pub enum OltCommand {
    Info,
    /// Check that the SSH port accepts connections
    Probe,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
