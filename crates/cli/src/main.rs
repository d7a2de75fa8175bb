use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use denials_core::config::{core_config_from_env_values, ENV_PATTERN_FILE, ENV_STORE_FILE};
use denials_core::edi::control_number_for;
use denials_core::models::DateRange;
use denials_core::{DenialService, InMemoryStore, PatternCatalogue};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "denials")]
#[command(about = "Claim denial analysis and correction CLI")]
struct Cli {
    /// JSON store snapshot to read (and write, for `apply`)
    #[arg(long, global = true, env = ENV_STORE_FILE)]
    store: Option<PathBuf>,
    /// YAML denial pattern catalogue (defaults to the standard catalogue)
    #[arg(long, global = true, env = ENV_PATTERN_FILE)]
    patterns: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the denial pattern catalogue
    Patterns,
    /// Analyse a denied claim without changing it
    Analyse {
        /// Claim identifier
        claim_id: String,
        /// Denial reasons as received from the payer
        #[arg(required = true)]
        reasons: Vec<String>,
    },
    /// Analyse a denied claim, apply the generated corrections and save the store
    Apply {
        /// Claim identifier
        claim_id: String,
        /// Denial reasons as received from the payer
        #[arg(required = true)]
        reasons: Vec<String>,
    },
    /// Summarise denials between two dates (inclusive)
    Analytics {
        /// First day (YYYY-MM-DD)
        from: NaiveDate,
        /// Last day (YYYY-MM-DD)
        to: NaiveDate,
    },
    /// Validate one or more claims before submission
    Validate {
        /// Claim identifiers
        #[arg(required = true)]
        claim_ids: Vec<String>,
    },
    /// Render a claim as an X12 837P interchange
    Edi {
        /// Claim identifier
        claim_id: String,
        /// Payer connection identifier
        payer_id: String,
    },
}

fn load_catalogue(path: Option<&Path>) -> anyhow::Result<PatternCatalogue> {
    Ok(match path {
        Some(p) => PatternCatalogue::load_yaml_file(p)?,
        None => PatternCatalogue::standard(),
    })
}

fn require_store(path: Option<&Path>) -> anyhow::Result<&Path> {
    match path {
        Some(p) => Ok(p),
        None => anyhow::bail!("a store file is required: pass --store or set {ENV_STORE_FILE}"),
    }
}

fn open_service(
    store_path: &Path,
    catalogue: PatternCatalogue,
) -> anyhow::Result<(DenialService, Arc<InMemoryStore>)> {
    let store = Arc::new(InMemoryStore::load_json_file(store_path)?);
    let cfg = Arc::new(core_config_from_env_values(|k| std::env::var(k).ok())?);
    let service = DenialService::new(cfg, Arc::new(catalogue), store.clone());
    Ok((service, store))
}

/// Runs one command and returns what should be printed.
async fn run(cli: Cli) -> anyhow::Result<String> {
    let Some(command) = cli.command else {
        return Ok("Use 'denials --help' for commands".into());
    };

    let catalogue = load_catalogue(cli.patterns.as_deref())?;
    let store_path = cli.store.as_deref();

    let output = match command {
        Commands::Patterns => serde_json::to_string_pretty(catalogue.patterns())?,
        Commands::Analyse { claim_id, reasons } => {
            let (service, _) = open_service(require_store(store_path)?, catalogue)?;
            let analysis = service.analyse_denial(&claim_id, &reasons).await?;
            serde_json::to_string_pretty(&analysis)?
        }
        Commands::Apply { claim_id, reasons } => {
            let path = require_store(store_path)?;
            let (service, store) = open_service(path, catalogue)?;
            let analysis = service.analyse_denial(&claim_id, &reasons).await?;
            let outcome = service
                .apply_corrections(&claim_id, &analysis.corrections)
                .await?;
            store.save_json_file(path)?;
            tracing::info!("saved store to {}", path.display());
            serde_json::to_string_pretty(&serde_json::json!({
                "analysis": analysis,
                "applied": outcome.applied,
            }))?
        }
        Commands::Analytics { from, to } => {
            let (service, _) = open_service(require_store(store_path)?, catalogue)?;
            let analytics = service.denial_analytics(DateRange::new(from, to)?).await?;
            serde_json::to_string_pretty(&analytics)?
        }
        Commands::Validate { claim_ids } => {
            let (service, _) = open_service(require_store(store_path)?, catalogue)?;
            let results = service.validate_batch(&claim_ids).await?;
            serde_json::to_string_pretty(&results)?
        }
        Commands::Edi { claim_id, payer_id } => {
            let (service, _) = open_service(require_store(store_path)?, catalogue)?;
            service
                .render_edi(&claim_id, &payer_id, control_number_for(Utc::now()))
                .await?
        }
    };

    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("denials_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STORE: &str = r#"{
        "claims": [{
            "id": "claim-1",
            "patient_id": "patient-1",
            "provider_id": "provider-1",
            "payer_id": "payer-1",
            "service_date": "2024-03-14",
            "processing_status": "denied",
            "line_items": [{
                "id": "l1",
                "procedure_code": "99215",
                "diagnosis_codes": ["M54.5"],
                "charge": 20000
            }]
        }],
        "providers": [{"id": "provider-1", "name": "Riverside Family Practice", "npi": "1234567890"}],
        "payer_connections": [{
            "payer_id": "payer-1",
            "name": "Acme Health",
            "submitter_id": "SUB123",
            "receiver_id": "RCV987"
        }],
        "billing_codes": [{"code": "99215", "description": "Office visit", "default_fee": 20000}]
    }"#;

    fn store_file(temp_dir: &TempDir) -> PathBuf {
        let path = temp_dir.path().join("store.json");
        std::fs::write(&path, STORE).expect("Failed to write store");
        path
    }

    fn cli(store: &Path, args: &[&str]) -> Cli {
        let store = store.to_string_lossy().to_string();
        let mut argv = vec!["denials", "--store", store.as_str()];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[tokio::test]
    async fn test_patterns_needs_no_store() {
        let cli = Cli::try_parse_from(["denials", "patterns"]).expect("arguments should parse");
        let output = run(Cli { store: None, ..cli }).await.expect("patterns should print");
        assert!(output.contains("CO-97"));
    }

    #[tokio::test]
    async fn test_apply_saves_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = store_file(&temp_dir);

        let output = run(cli(&path, &["apply", "claim-1", "CO-11 diagnosis mismatch"]))
            .await
            .expect("apply should succeed");
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["applied"], 2);

        let saved = InMemoryStore::load_json_file(&path)
            .expect("saved store should load")
            .snapshot()
            .unwrap();
        assert_eq!(saved.claims[0].line_items[0].procedure_code, "99214");
        assert_eq!(saved.audit_log.len(), 1);
    }

    #[tokio::test]
    async fn test_validate_and_edi() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = store_file(&temp_dir);

        let output = run(cli(&path, &["validate", "claim-1"])).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["valid"], true);

        let edi = run(cli(&path, &["edi", "claim-1", "payer-1"])).await.unwrap();
        assert!(edi.contains("CLM*claim-1*200.00"));
    }

    #[tokio::test]
    async fn test_analytics_rejects_reversed_range() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = store_file(&temp_dir);
        assert!(run(cli(&path, &["analytics", "2024-05-01", "2024-04-01"]))
            .await
            .is_err());
    }

    #[test]
    fn test_analyse_requires_reasons() {
        assert!(Cli::try_parse_from(["denials", "analyse", "claim-1"]).is_err());
    }
}
