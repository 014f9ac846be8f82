//! AMM Flash Arbitrage
//!
//! Main entry point. Reads the configured pools, reports their prices
//! (and initialized ticks for concentrated-liquidity pools), then either
//! prints the configured arbitrage plan (default dry run) or runs it once
//! with `--execute`.
//!
//! Created: 2026-10-15

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use amm_flash_arb::arbitrage::{
    ArbitrageOrchestrator, ContractLegs, FlashLoanContract, LegRunner, RouterVenue, WalletArbitrage,
};
use amm_flash_arb::chain::RpcChainReader;
use amm_flash_arb::config::{load_config, ArbConfig, ArbitrageConfig, LoanMode, PoolSource};
use amm_flash_arb::error::{ArbError, ConfigError};
use amm_flash_arb::pool::{discover_pool, refresh_all, PoolStateReader, TokenCache};
use amm_flash_arb::types::PoolKind;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// AMM pool prices, tick scans and flash-loan arbitrage
#[derive(Parser)]
#[command(name = "amm-flash-arb")]
struct Args {
    /// TOML file with tokens, pools and the arbitrage plan
    #[arg(short, long, env = "ARB_CONFIG", default_value = "config/arb.toml")]
    config: PathBuf,

    /// Submit the arbitrage plan instead of printing it
    #[arg(long)]
    execute: bool,

    /// Print results as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let config = load_config()?;
    let arb_config = ArbConfig::load(&args.config)?;
    info!(
        "Configuration loaded from {} ({} pools, {} static tokens)",
        args.config.display(),
        arb_config.pools.len(),
        arb_config.tokens.len()
    );

    let provider = ProviderBuilder::new()
        .connect(&config.rpc_url)
        .await
        .context("Failed to connect to RPC")?;
    let provider = Arc::new(provider);

    let chain_id = provider.get_chain_id().await?;
    if chain_id != config.chain_id {
        warn!("⚠️  RPC reports chain {} but CHAIN_ID is {}", chain_id, config.chain_id);
    }
    info!("Connected to RPC: {} (chain {})", &config.rpc_url[..40.min(config.rpc_url.len())], chain_id);

    let source = Arc::new(RpcChainReader::new(Arc::clone(&provider), config.multicall));
    let tokens = TokenCache::new(Arc::clone(&source)).with_resolver(Arc::new(arb_config.token_list()));

    // Resolve pool addresses
    let mut readers = Vec::with_capacity(arb_config.pools.len());
    for entry in &arb_config.pools {
        let spec = match entry.source()? {
            PoolSource::Direct(spec) => spec,
            PoolSource::Factory {
                factory,
                kind,
                token_a,
                token_b,
                fee,
            } => discover_pool(source.as_ref(), factory, kind, token_a, token_b, fee).await?,
        };
        readers.push(PoolStateReader::new(spec, tokens.clone()));
    }

    // Refresh all pools concurrently
    let results = refresh_all(&mut readers).await;
    for (reader, result) in readers.iter().zip(results) {
        if let Err(e) = result {
            error!("Refresh of {:?} failed: {}", reader.address(), e);
        }
    }

    let reference = &arb_config.general.reference_symbol;
    for reader in readers.iter().filter(|r| r.snapshot().is_some()) {
        let Some(pool) = reader.reference() else { continue };
        match reader.price_of(reference) {
            Ok(Some(price)) => info!(
                "📊 {} {} [{:?}]: 1 {} = {:.6}",
                pool.kind,
                pool.symbol(),
                pool.address,
                reference,
                price
            ),
            Ok(None) => warn!("{} {} [{:?}]: price unavailable (zero liquidity)", pool.kind, pool.symbol(), pool.address),
            Err(ArbError::Configuration(ConfigError::NoReferenceAsset { .. })) => {
                let price = reader.price()?;
                info!(
                    "📊 {} {} [{:?}]: {:?} / {:?}",
                    pool.kind,
                    pool.symbol(),
                    pool.address,
                    price.token0_in_token1,
                    price.token1_in_token0
                );
            }
            Err(e) => return Err(e.into()),
        }

        if arb_config.general.scan_ticks && reader.kind() == PoolKind::ConcentratedLiquidity {
            match reader.scan_ticks(config.tick_batch_size).await {
                Ok(scan) => {
                    info!(
                        "🔎 {}: {} initialized ticks (spacing {}, {} words)",
                        pool.symbol(),
                        scan.ticks.len(),
                        scan.tick_spacing,
                        scan.words_scanned
                    );
                    if args.json {
                        println!(
                            "{}",
                            serde_json::json!({ "pool": pool.address, "tick_spacing": scan.tick_spacing, "ticks": scan.ticks })
                        );
                    }
                }
                Err(e) => error!("Tick scan of {} failed: {}", pool.symbol(), e),
            }
        }
    }

    let Some(arb) = arb_config.arbitrage.as_ref().filter(|a| a.enabled) else {
        info!("Arbitrage disabled, done");
        return Ok(());
    };

    let loan_token = tokens.get(arb.loan_asset).await?;
    let plan = arb.to_plan(loan_token.decimals)?;
    info!("Plan: {} {} via {}", arb.amount, loan_token.symbol, plan.route());

    // Loan asset per unit of every other asset, from the refreshed pools
    let mut rates = Vec::new();
    for asset in plan.assets().into_iter().filter(|a| *a != plan.loan_asset) {
        match readers
            .iter()
            .find_map(|r| r.rate(asset, plan.loan_asset).ok().flatten())
        {
            Some(rate) => rates.push((asset, rate)),
            None => warn!("No pool prices {:?} in {}; its residual will be unpriced", asset, loan_token.symbol),
        }
    }

    if !args.execute {
        info!("🔬 DRY RUN: pass --execute to submit ({} legs, {} byte payload)", plan.legs.len(), plan.encode_payload().len());
        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "plan": &plan,
                    "payload": plan.encode_payload(),
                }))?
            );
        }
        return Ok(());
    }

    warn!("⚠️ LIVE mode - the plan will be executed!");
    let private_key = config
        .private_key
        .as_deref()
        .context("PRIVATE_KEY is required with --execute")?;
    let signer: PrivateKeySigner = private_key.parse().context("Invalid PRIVATE_KEY")?;
    let wallet = signer.address();

    let wallet_provider = ProviderBuilder::new()
        .wallet(signer)
        .connect(&config.rpc_url)
        .await
        .context("Failed to connect signing provider")?;
    let wallet_provider = Arc::new(wallet_provider);

    let holders = holders(wallet, arb);
    info!("Wallet {:?}, tracking {} holders", wallet, holders.len());

    match arb.mode {
        LoanMode::FlashContract => {
            let loan = FlashLoanContract::new(wallet_provider, config.confirmation_timeout);
            let orch = rates.into_iter().fold(
                ArbitrageOrchestrator::new(tokens, loan, ContractLegs, holders, arb.receiver),
                |orch, (asset, rate)| orch.with_rate(asset, rate),
            );

            let result = orch.run(&plan).await?;
            info!("Result: {:?} net {} (tx {:?})", result.verdict, result.net, result.loan.tx_hash);
            for (asset, symbol, delta) in result.delta.by_asset() {
                info!("  {} {:?}: {}", symbol, asset, delta);
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        LoanMode::Wallet => {
            let venue = RouterVenue::new(wallet_provider, wallet, config.confirmation_timeout);
            let runner = rates.into_iter().fold(
                WalletArbitrage::new(tokens, LegRunner::new(venue), holders),
                |runner, (asset, rate)| runner.with_rate(asset, rate),
            );

            let result = runner.run(&plan).await?;
            info!(
                "Result: {:?} net {} ({}/{} legs)",
                result.verdict,
                result.net,
                result.legs_executed,
                plan.legs.len()
            );
            for (asset, symbol, delta) in result.delta.by_asset() {
                info!("  {} {:?}: {}", symbol, asset, delta);
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
            if let Some(failure) = result.failure {
                return Err(failure.into());
            }
        }
    }
    Ok(())
}

/// Wallet, receiver and any extra configured holders, without duplicates
fn holders(wallet: Address, arb: &ArbitrageConfig) -> Vec<Address> {
    let mut holders = vec![wallet];
    for holder in std::iter::once(arb.receiver).chain(arb.holders.iter().copied()) {
        if !holders.contains(&holder) {
            holders.push(holder);
        }
    }
    holders
}
