// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::sync::Arc;

use clap::{Parser, Subcommand};
use lending_bots::app::config::GlobalSettings;
use lending_bots::app::logging::setup_logging;
use lending_bots::domain::error::AppError;
use lending_bots::domain::types::BotRole;
use lending_bots::infrastructure::data::morpho_client::{Deployment, MorphoClient};
use lending_bots::infrastructure::data::wallet_store::WalletRegistry;
use lending_bots::services::bots::Fleet;
use lending_bots::services::executor::{RetryPolicy, TxExecutor};
use lending_bots::services::funding::cooldown::CooldownLedger;
use lending_bots::services::funding::funder::{Funder, fund_wallets};

#[derive(Parser, Debug)]
#[command(author, version, about = "Lending market simulation bots")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long, global = true)]
    config: Option<String>,

    /// Stop each runner after this many cycles (overrides config/env; 0 = forever)
    #[arg(long, global = true)]
    max_cycles: Option<u64>,

    /// Stop a runner on its first failed cycle instead of cooling down
    #[arg(long, global = true, default_value_t = false)]
    stop_on_error: bool,

    /// Do not fund wallets before running
    #[arg(long, global = true, default_value_t = false)]
    skip_funding: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive and persist bot wallets, then fund them
    Setup,
    /// Re-run funding for the persisted wallets
    Fund,
    /// Run bots for one role, a comma-separated list, or "all"
    Run {
        #[arg(default_value = "all")]
        roles: String,
    },
    /// Print the wallet registry
    Wallets,
}

fn parse_roles(raw: &str) -> Result<Vec<BotRole>, AppError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(BotRole::ALL.to_vec());
    }
    let mut roles = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let role: BotRole = part.parse()?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    if roles.is_empty() {
        return Err(AppError::validation("roles", "no role given"));
    }
    Ok(roles)
}

fn load_registry(settings: &GlobalSettings) -> Result<WalletRegistry, AppError> {
    let seed = settings.seed_phrase_value()?;
    WalletRegistry::load_or_create(
        &settings.wallets_path(),
        &seed,
        &settings.bots.role_counts(),
        settings.derivation_offset,
    )
}

async fn build_funder(settings: &GlobalSettings, deployment: &Deployment) -> Result<Arc<Funder>, AppError> {
    let client = MorphoClient::for_key(&settings.rpc_url, deployment, &settings.private_key).await?;
    Ok(Arc::new(Funder::new(client, &settings.bots.funding)?))
}

async fn fund(
    settings: &GlobalSettings,
    deployment: &Deployment,
    registry: &WalletRegistry,
    funder: &Funder,
    ledger: Arc<CooldownLedger>,
) -> Result<(), AppError> {
    let report = fund_wallets(
        funder,
        registry,
        &settings.rpc_url,
        deployment,
        &settings.bots,
        ledger,
    )
    .await;
    if !report.is_clean() {
        for (wallet, error) in &report.failures {
            tracing::warn!(target: "funding", wallet = %wallet, error = %error, "Wallet left underfunded");
        }
    }
    Ok(())
}

fn print_wallets(registry: &WalletRegistry) {
    for wallet in registry.all() {
        println!("{:<14} {:#x}", wallet.label(), wallet.address);
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut settings = GlobalSettings::load_with_path(cli.config.as_deref())?;
    if let Some(max_cycles) = cli.max_cycles {
        settings.bots.runner.max_cycles = max_cycles;
    }
    if cli.stop_on_error {
        settings.bots.runner.stop_on_error = true;
    }
    let log_dir = settings.log_dir();
    let _log_guard = setup_logging(
        settings.log_level(),
        settings.log_json,
        Some(log_dir.as_path()),
        "lending-bots",
    );

    let registry = load_registry(&settings)?;
    if let Command::Wallets = cli.command {
        print_wallets(&registry);
        return Ok(());
    }

    let deployment = Deployment::from_settings(&settings);
    let funder = build_funder(&settings, &deployment).await?;
    let ledger = Arc::new(CooldownLedger::new());
    tracing::info!(
        target: "config",
        rpc = %settings.rpc_url,
        morpho = %deployment.morpho,
        funder = %funder.address(),
        wallets = registry.len(),
        "Harness ready"
    );

    match cli.command {
        Command::Setup | Command::Fund => {
            fund(&settings, &deployment, &registry, &funder, ledger).await
        }
        Command::Run { roles } => {
            let roles = parse_roles(&roles)?;
            if !cli.skip_funding {
                fund(&settings, &deployment, &registry, &funder, ledger.clone()).await?;
            }
            let executor = Arc::new(TxExecutor::new(
                funder.clone(),
                RetryPolicy::from(&settings.bots.retry),
            ));
            let fleet = Fleet {
                rpc_url: settings.rpc_url.clone(),
                deployment,
                bots: settings.bots.clone(),
                executor,
                ledger,
            };
            fleet.run(&registry, &roles).await
        }
        Command::Wallets => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_selects_every_role_in_order() {
        assert_eq!(parse_roles("all").unwrap(), BotRole::ALL.to_vec());
        assert_eq!(parse_roles(" ALL ").unwrap(), BotRole::ALL.to_vec());
    }

    #[test]
    fn role_lists_are_deduplicated() {
        assert_eq!(
            parse_roles("lender,borrower,lender").unwrap(),
            vec![BotRole::Lender, BotRole::Borrower]
        );
        assert!(parse_roles("keeper").is_err());
        assert!(parse_roles(",").is_err());
    }
}
