//! Stowage - provision data product storage areas from the command line.
//!
//! Reads a provisioning request (JSON) and reconciles the data product bucket
//! and the storage area folder it names.
//!
//! # Usage
//!
//! ```text
//! stowage provision request.json
//! stowage unprovision request.json
//! stowage validate request.json
//! ```
//!
//! The result is printed to stdout as JSON. A failed operation is printed the
//! same way and the process exits with code 1.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LOG_FORMAT` | `text` | `json` for one JSON object per event |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `DEFAULT_REGION` | `us-east-1` | Region for account resolution |
//! | `AWS_ENDPOINT_URL` | *(unset)* | Endpoint override for every AWS client |
//! | `S3_BUCKET_WAIT_TIMEOUT_SECONDS` | `60` | Bucket propagation window |
//! | `S3_OBJECT_WAIT_TIMEOUT_SECONDS` | `20` | Folder propagation window |
//! | `S3_WAIT_POLL_INTERVAL_MS` | `5000` | Delay between existence checks |
//! | `BUCKET_POLICY_PATH` | *(bundled)* | Bucket policy template override |
//! | `KMS_POLICY_PATH` | *(bundled)* | Key policy template override |
//! | `KMS_ALIAS_PREFIX` | `alias/stowage` | Prefix of per-bucket key aliases |

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use serde_json::json;
use stowage_core::{LogFormat, StowageConfig};
use stowage_model::{FailedOperation, ProvisionRequest};
use stowage_s3::{AwsClientFactory, ReconcilerConfig, StorageAreaProvisioner};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: stowage <provision|unprovision|validate> <request.json>";

/// What to do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Provision,
    Unprovision,
    Validate,
}

impl Command {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "provision" => Some(Self::Provision),
            "unprovision" => Some(Self::Unprovision),
            "validate" => Some(Self::Validate),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Unprovision => "unprovision",
            Self::Validate => "validate",
        }
    }
}

/// Parse `<command> <request.json>` from the arguments after the program name.
fn parse_args<I>(args: I) -> Result<(Command, PathBuf)>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let (Some(command), Some(path), None) = (args.next(), args.next(), args.next()) else {
        bail!(USAGE);
    };
    let Some(command) = Command::parse(&command) else {
        bail!("unknown command '{command}'\n{USAGE}");
    };
    Ok((command, PathBuf::from(path)))
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Events go to stderr so stdout only carries the result document.
fn init_tracing(config: &StowageConfig) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(&config.log_level)
            .with_context(|| format!("invalid log level filter: {}", config.log_level))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    Ok(())
}

async fn read_request(path: &Path) -> Result<ProvisionRequest> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read request file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid provisioning request in {}", path.display()))
}

async fn run(
    provisioner: &StorageAreaProvisioner<AwsClientFactory>,
    command: Command,
    request: &ProvisionRequest,
) -> Result<serde_json::Value, FailedOperation> {
    match command {
        Command::Provision => provisioner.provision(request).await.map(|info| json!(info)),
        Command::Unprovision => provisioner.unprovision(request).await.map(|info| json!(info)),
        Command::Validate => provisioner
            .validate(request)
            .await
            .map(|()| json!({ "valid": true })),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let (command, path) = parse_args(std::env::args().skip(1))?;

    let config = StowageConfig::from_env();
    let reconciler_config = ReconcilerConfig::from_env();

    init_tracing(&config)?;

    info!(
        command = command.as_str(),
        request = %path.display(),
        endpoint_url = ?config.endpoint_url,
        version = VERSION,
        "starting stowage",
    );

    let request = read_request(&path).await?;
    let factory = AwsClientFactory::from_config(&config).await;
    let provisioner = StorageAreaProvisioner::new(factory, reconciler_config);

    let (document, code) = match run(&provisioner, command, &request).await {
        Ok(value) => (value, ExitCode::SUCCESS),
        Err(failed) => {
            error!(
                command = command.as_str(),
                problems = failed.problems.len(),
                error = %failed,
                "operation failed"
            );
            (json!(failed), ExitCode::FAILURE)
        }
    };

    let rendered =
        serde_json::to_string_pretty(&document).context("cannot serialize the result")?;
    println!("{rendered}");

    Ok(code)
}
