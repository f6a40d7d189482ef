use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value as Json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rapport_patient::{
    export_to_json, to_json_string, ConnectionManager, DateRange, DbConfig, NameMatch,
    OracleBackend, PatientDataFetcher, ReadConsistency, Result, DEFAULT_SEARCH_LIMIT,
};

#[derive(Parser)]
#[command(name = "rapport-fetch")]
#[command(about = "Read RAPPORT patient records from Oracle as JSON")]
struct Cli {
    /// Env file with RAPPORT_DB_USERNAME, RAPPORT_DB_PASSWORD and RAPPORT_DB_DSN
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
    /// Write JSON to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Read all sections of a patient in one read-only transaction
    #[arg(long)]
    snapshot: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Basic info, addresses, insurance and diseases of one patient
    All { patient_id: String },
    /// Basic info of one patient
    Basic { patient_id: String },
    /// Addresses of one patient
    Address { patient_id: String },
    /// Insurance records of one patient
    Insurance { patient_id: String },
    /// Disease names of one patient
    Diseases { patient_id: String },
    /// Search patients by kana full name
    Search {
        name: String,
        /// Match the whole name instead of a substring
        #[arg(long)]
        exact: bool,
        /// Maximum number of rows (1-1000)
        #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// Patients registered between two dates (YYYY-MM-DD, both included)
    Range { start: String, end: String },
    /// All data for several patients, keyed by patient id
    Batch {
        #[arg(required = true)]
        patient_ids: Vec<String>,
    },
}

async fn run_command(
    db: &mut ConnectionManager<OracleBackend>,
    command: Commands,
) -> Result<Json> {
    let mut fetcher = PatientDataFetcher::new(db);
    let json = match command {
        Commands::All { patient_id } => {
            serde_json::to_value(fetcher.get_patient_all_data(&patient_id).await?)?
        }
        Commands::Basic { patient_id } => {
            serde_json::to_value(fetcher.get_patient_basic_info(&patient_id).await?)?
        }
        Commands::Address { patient_id } => {
            serde_json::to_value(fetcher.get_patient_address(&patient_id).await?)?
        }
        Commands::Insurance { patient_id } => {
            serde_json::to_value(fetcher.get_patient_insurance(&patient_id).await?)?
        }
        Commands::Diseases { patient_id } => {
            serde_json::to_value(fetcher.get_patient_diseases(&patient_id).await?)?
        }
        Commands::Search { name, exact, limit } => {
            let mode = if exact {
                NameMatch::Exact
            } else {
                NameMatch::Partial
            };
            serde_json::to_value(
                fetcher
                    .search_patients_by_name_limited(&name, mode, limit)
                    .await?,
            )?
        }
        Commands::Range { start, end } => {
            let range = DateRange::parse(&start, &end)?;
            serde_json::to_value(fetcher.registered_in(&range).await?)?
        }
        Commands::Batch { patient_ids } => {
            let mut all = BTreeMap::new();
            for id in patient_ids {
                let data = fetcher.get_patient_all_data(&id).await?;
                all.insert(id, data);
            }
            serde_json::to_value(all)?
        }
    };
    Ok(json)
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rapport_patient=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = DbConfig::from_env_file(&cli.env_file)?;
    if cli.snapshot {
        config = config.with_read_consistency(ReadConsistency::Snapshot);
    }

    let mut db = ConnectionManager::new(OracleBackend::new(), config);
    let command = cli.command;
    let json = db
        .scope(|db| Box::pin(run_command(db, command)))
        .await
        .inspect_err(|e| tracing::error!(kind = ?e.kind(), "fetch failed: {}", e))?;

    match cli.output {
        Some(path) => {
            export_to_json(&json, &path)?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", to_json_string(&json)?),
    }

    Ok(())
}
