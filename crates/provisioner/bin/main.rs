use clap::Parser;
use compute_yandex::{
    DEFAULT_COMPUTE_ENDPOINT, DEFAULT_OPERATION_ENDPOINT, Endpoints, YandexCompute,
};
use credentials::{DEFAULT_TOKEN_ENDPOINT, SigningAlgorithm};
use provisioner::{Mode, Outcome, Settings};
use spec::DEFAULT_CONFIG_PATH;
use std::{path::PathBuf, time::Duration};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "provisioner")]
#[command(about = "Create a virtual machine from a declarative JSON description", long_about = None)]
struct Cli {
    /// Service account key container (JSON)
    #[arg(long, env = "AUTH_KEY", hide_env_values = true)]
    auth_key: Option<String>,

    /// Public key installed for the configured user
    #[arg(long, env = "SSH_PUBLIC_KEY_PATH")]
    ssh_public_key_path: Option<PathBuf>,

    /// Instance description
    #[arg(long, env = "PROVISIONER_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(long, default_value = DEFAULT_TOKEN_ENDPOINT)]
    iam_endpoint: Url,

    #[arg(long, default_value = DEFAULT_COMPUTE_ENDPOINT)]
    compute_endpoint: Url,

    #[arg(long, default_value = DEFAULT_OPERATION_ENDPOINT)]
    operation_endpoint: Url,

    /// JWT signing algorithm: rs256 or ps256
    #[arg(long, default_value = "rs256")]
    jwt_algorithm: SigningAlgorithm,

    /// Print the request instead of submitting it
    #[arg(long, conflicts_with = "wait")]
    dry_run: bool,

    /// Poll the create operation until it finishes
    #[arg(long)]
    wait: bool,

    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.dry_run {
            Mode::DryRun
        } else if self.wait {
            Mode::Wait {
                poll_interval: Duration::from_secs(self.poll_interval_secs),
            }
        } else {
            Mode::Submit
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mode = cli.mode();

    let endpoints = Endpoints::new(cli.compute_endpoint, cli.operation_endpoint);
    let settings = Settings {
        auth_key: cli.auth_key,
        ssh_public_key_path: cli.ssh_public_key_path,
        config_path: cli.config,
        token_endpoint: cli.iam_endpoint,
        algorithm: cli.jwt_algorithm,
        mode,
    };

    let outcome = provisioner::run(&settings, |credentials| {
        YandexCompute::new(credentials, endpoints)
    })
    .await?;

    match outcome {
        Outcome::NullConfig => {
            println!(
                "Configuration {} is empty, nothing to create",
                settings.config_path.display()
            );
        }
        Outcome::DryRun(request) => {
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Outcome::Submitted(operation) => {
            println!("Operation id: {}", operation.id);
        }
        Outcome::Completed(operation) => {
            println!("Operation id: {}", operation.id);
            if let Some(instance_id) = operation.resource_id() {
                println!("Instance id: {}", instance_id);
            }
        }
    }

    Ok(())
}
