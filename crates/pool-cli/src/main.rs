use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pool_transport::Config as TransportConfig;
use privacy_pool_sdk::crypto::{decode_hex32, field_to_decimal};
use privacy_pool_sdk::{
    ClientConfig, CoinUnits, DepositNote, HttpProofService, PrivacyPoolClient, SuiRpcChain,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::CliConfig;

type Client = PrivacyPoolClient<SuiRpcChain, HttpProofService>;

#[derive(Parser, Debug)]
#[command(name = "pool-cli")]
#[command(about = "Privacy pool client: create notes, sync the commitment tree and build withdrawal proofs")]
struct Cli {
    /// Full node JSON-RPC URL (overrides POOL_RPC_URL)
    #[arg(long, global = true)]
    rpc: Option<String>,

    /// Pool package id (overrides POOL_PACKAGE_ID)
    #[arg(long, global = true)]
    package: Option<String>,

    /// Pool configuration object id (overrides POOL_CONFIG_ID)
    #[arg(long = "pool-config", global = true)]
    pool_config: Option<String>,

    /// Proof service base URL (overrides PROOF_SERVICE_URL)
    #[arg(long, global = true)]
    prover: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Generate a fresh deposit note
    NewNote {
        /// Amount in whole coins, e.g. 1 or 0.5
        #[arg(short, long)]
        amount: String,
        /// Print the full note as JSON instead of the backup string
        #[arg(long)]
        json: bool,
    },
    /// Check a note backup string and print its public values
    InspectNote { note: String },
    /// Rebuild the local Merkle tree from deposit events
    Sync,
    /// Find a restored note's leaf index
    Locate { note: String },
    /// Pool balance and anonymity set
    Stats,
    /// Check whether a nullifier hash has already been withdrawn
    NullifierUsed { nullifier_hash: String },
    /// Generate a withdrawal proof for a note
    Prove {
        note: String,
        recipient: String,
        #[arg(long, default_value = "0x0")]
        relayer: String,
        #[arg(long, default_value_t = 0)]
        fee: u64,
        /// Write the proof JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Fetch the proof service's verifying key
    VerifyingKey,
}

impl Cli {
    fn apply(&self, config: &mut CliConfig) {
        if let Some(rpc) = &self.rpc {
            config.rpc_url = rpc.clone();
        }
        if let Some(package) = &self.package {
            config.package_id = Some(package.clone());
        }
        if let Some(pool_config) = &self.pool_config {
            config.config_id = Some(pool_config.clone());
        }
        if let Some(prover) = &self.prover {
            config.proof_service_url = prover.clone();
        }
    }
}

fn prover(config: &CliConfig) -> Result<HttpProofService> {
    Ok(HttpProofService::with_config(
        &config.proof_service_url,
        TransportConfig::default().with_timeout(config.proof_timeout_secs),
    )?)
}

fn build_client(config: &CliConfig) -> Result<Client> {
    let (package, pool_config) = config.pool_ids()?;
    let chain = SuiRpcChain::connect(
        &config.rpc_url,
        TransportConfig::default().with_timeout(config.rpc_timeout_secs),
        package,
        pool_config,
    )?;
    let client_config =
        ClientConfig::new(package, pool_config).with_network(&config.network, config.net_id);
    Ok(PrivacyPoolClient::new(client_config, chain, prover(config)?)?)
}

fn format_timestamp(ms: u64) -> String {
    if ms == 0 {
        return "never".to_string();
    }
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn print_note(note: &DepositNote) {
    println!("  Network:        {} (net id {})", note.network, note.net_id);
    println!("  Amount:         {}", note.amount);
    println!("  Commitment:     0x{}", hex::encode(note.commitment));
    println!("  Nullifier hash: {}", note.nullifier_hash_hex());
    match note.leaf_index {
        Some(index) => println!("  Leaf index:     {}", index),
        None => println!("  Leaf index:     {}", "unknown".yellow()),
    }
}

async fn run(cli: Cli, config: CliConfig) -> Result<()> {
    let units = CoinUnits::default();

    match cli.command {
        Command::NewNote { amount, json } => {
            let denomination = units.parse(&amount)?;
            let note = DepositNote::generate(denomination, &config.network, config.net_id, &units)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            } else {
                println!();
                print_note(&note);
                println!();
                println!("{}", "Back up this note, it is the only way to withdraw:".bold());
                println!("{}", note.note_string);
            }
        }
        Command::InspectNote { note } => {
            let note = DepositNote::from_note_string(&note, &units)?;
            println!();
            print_note(&note);
            println!();
            println!("{}", "Note is valid".green());
        }
        Command::Sync => {
            let client = build_client(&config)?;
            let report = client.sync_merkle_tree(true).await?;
            println!();
            println!("  Commitments: {}", report.leaf_count);
            println!("  Root:        {}", field_to_decimal(&report.root));
            println!("  Generation:  {}", report.generation);
        }
        Command::Locate { note } => {
            let client = build_client(&config)?;
            let mut note = DepositNote::from_note_string(&note, &units)?;
            let index = client.locate_note(&mut note).await?;
            println!("{} leaf index {}", "Found note at".green(), index);
        }
        Command::Stats => {
            let client = build_client(&config)?;
            let stats = client.get_stats().await?;
            println!();
            println!("  Pool balance:     {}", stats.formatted_balance);
            println!("  Deposits:         {}", stats.total_deposits);
            println!("  Withdrawals:      {}", stats.total_withdrawals);
            println!("  Anonymity set:    {}", stats.anonymity_set);
            println!("  Average deposit:  {}", stats.formatted_average_deposit);
            println!("  Last deposit:     {}", format_timestamp(stats.last_deposit_at));
            println!("  Last withdrawal:  {}", format_timestamp(stats.last_withdrawal_at));
        }
        Command::NullifierUsed { nullifier_hash } => {
            let client = build_client(&config)?;
            let hash = decode_hex32(&nullifier_hash)?;
            if client.is_nullifier_used(&hash).await? {
                println!("{}", "SPENT: a withdrawal with this nullifier hash exists".red());
            } else {
                println!("{}", "UNSPENT: no withdrawal uses this nullifier hash".green());
            }
        }
        Command::Prove {
            note,
            recipient,
            relayer,
            fee,
            out,
        } => {
            let client = build_client(&config)?;
            let mut note = DepositNote::from_note_string(&note, &units)?;
            if note.leaf_index.is_none() {
                client.locate_note(&mut note).await?;
            }

            info!(leaf_index = ?note.leaf_index, "Generating withdrawal proof");
            let proof = client
                .generate_withdrawal_proof(&note, &recipient, &relayer, fee)
                .await?;
            let output = serde_json::json!({
                "proof": format!("0x{}", hex::encode(&proof.proof)),
                "public_inputs": proof.public_inputs,
                "leaf_index": proof.merkle_proof.leaf_index,
            });
            let rendered = serde_json::to_string_pretty(&output)?;

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("{} {}", "Proof written to".green(), path.display());
                }
                None => println!("{}", rendered),
            }
        }
        Command::VerifyingKey => {
            let key = prover(&config)?.verifying_key().await?;
            println!("{}", serde_json::to_string_pretty(&key)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pool_cli=info,privacy_pool_sdk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = CliConfig::from_env()?;
    cli.apply(&mut config);

    run(cli, config).await
}
