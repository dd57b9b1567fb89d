// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

mod cli;

use std::process::ExitCode;

use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{
    CommandLine, Commands, OltCommand, OntCommand, PoolCommand, ProfileArgs, ProfileCommand,
    RouterCommand, SecretArgs, SecretCommand,
};
use isp_provisioner::mikrotik::{PppProfile, PppSecret, RateLimit};
use isp_provisioner::{Config, MikroTikClient, OltAutomation, Result, Timeouts, probe};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CommandLine::parse_args();

    setup_tracing();

    match run(args.command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn setup_tracing() {
    // RUST_LOG wins; "info" otherwise. Logs go to stderr so stdout stays JSON.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| isp_provisioner::Error::Config(format!("failed to render output: {e}")))
}

async fn run(command: Commands) -> Result<String> {
    // Loads .env before reading the environment
    let config = Config::from_env()?;

    match command {
        Commands::Router(cmd) => {
            let client = MikroTikClient::new(config.require_router()?.clone());
            match cmd {
                RouterCommand::Info => render(&client.router_info().await?),
                RouterCommand::Probe => {
                    let endpoint = client.endpoint();
                    let reachable =
                        probe(&endpoint.host, endpoint.port, Timeouts::routeros().connect).await;
                    render(&json!({ "host": endpoint.host, "reachable": reachable }))
                }
            }
        }
        Commands::Secret(cmd) => {
            let client = MikroTikClient::new(config.require_router()?.clone());
            match cmd {
                SecretCommand::Add(args) => {
                    let secret = secret_from(args);
                    client.add_secret(&secret).await?;
                    render(&secret)
                }
                SecretCommand::Ensure(args) => {
                    let secret = secret_from(args);
                    let change = client.ensure_secret(&secret).await?;
                    render(&json!({ "secret": secret, "change": change }))
                }
                SecretCommand::Find { name } => render(&client.find_secret(&name).await?),
                SecretCommand::Remove { name } => {
                    client.remove_secret(&name).await?;
                    render(&json!({ "removed": name }))
                }
            }
        }
        Commands::Profile(cmd) => {
            let client = MikroTikClient::new(config.require_router()?.clone());
            match cmd {
                ProfileCommand::Upsert(args) => {
                    let profile = profile_from(args);
                    let change = client.upsert_profile(&profile).await?;
                    render(&json!({ "profile": profile, "change": change }))
                }
                ProfileCommand::Find { name } => render(&client.find_profile(&name).await?),
                ProfileCommand::Remove { name } => {
                    let removed = client.remove_profile(&name).await?;
                    render(&json!({ "name": name, "removed": removed }))
                }
            }
        }
        Commands::Pool(cmd) => {
            let client = MikroTikClient::new(config.require_router()?.clone());
            match cmd {
                PoolCommand::Ensure { name, ranges } => {
                    let change = client.ensure_pool(&name, &ranges).await?;
                    render(&json!({ "name": name, "ranges": ranges, "change": change }))
                }
                PoolCommand::Find { name } => render(&client.find_pool(&name).await?),
                PoolCommand::List => render(&client.list_pools().await?),
                PoolCommand::Remove { name } => {
                    let removed = client.remove_pool(&name).await?;
                    render(&json!({ "name": name, "removed": removed }))
                }
            }
        }
        Commands::Ont(cmd) => {
            let olt = OltAutomation::from(config.require_olt()?.clone());
            match cmd {
                OntCommand::Provision { serial, label } => {
                    render(&olt.provision(&serial, &label).await?)
                }
                OntCommand::Deprovision { serial } => render(&olt.deprovision(&serial).await?),
                OntCommand::Query { serial } => render(&olt.query(&serial).await?),
            }
        }
        Commands::Olt(cmd) => {
            let olt = config.require_olt()?;
            match cmd {
                OltCommand::Info => render(&OltAutomation::from(olt.clone()).system_info().await?),
                OltCommand::Probe => {
                    let endpoint = &olt.endpoint;
                    let reachable =
                        probe(&endpoint.host, endpoint.port, olt.timeouts.connect).await;
                    render(&json!({ "host": endpoint.host, "reachable": reachable }))
                }
            }
        }
    }
}

fn secret_from(args: SecretArgs) -> PppSecret {
    let secret = PppSecret::pppoe(&args.name, &args.password, &args.profile);
    match args.comment {
        Some(comment) => secret.with_comment(&comment),
        None => secret,
    }
}

fn profile_from(args: ProfileArgs) -> PppProfile {
    let mut profile = PppProfile::new(&args.name, RateLimit::new(args.upload, args.download));
    profile.local_address = args.local_address;
    profile.remote_address = args.remote_address;
    profile.comment = args.comment;
    profile
}
