//! Deployer - Docker 服务部署工具
//!
//! Usage:
//! - Deploy: `deployer --service api --version 1.2.3`
//! - Dry run: `deployer --service api --version 1.2.3 --dry-run`
//! - List services: `deployer --list`

use std::path::{Path, PathBuf};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use deployer::config::Config;
use deployer::domain::deploy::{DeploymentRequest, StepStatus};
use deployer::infra::docker::DockerCli;
use deployer::infra::ssh::SshSession;
use deployer::services::deploy::{Deployer, ProgressSink, StepEvent};

#[derive(Parser)]
#[command(name = "deployer")]
#[command(version, about = "Build, push and redeploy Docker services over SSH")]
struct Cli {
    /// Service name to deploy
    #[arg(long)]
    service: Option<String>,

    /// Version tag for the image
    #[arg(long)]
    version: Option<String>,

    /// Configuration file path
    #[arg(long, default_value = "deployment.config.json")]
    config: PathBuf,

    /// Path where to run docker build (overrides config)
    #[arg(long)]
    build_path: Option<String>,

    /// Show commands without executing them
    #[arg(long)]
    dry_run: bool,

    /// List available services from the config
    #[arg(long)]
    list: bool,
}

/// Renders pipeline progress events as a console bar with step lines
struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{bar:50.cyan/blue} {percent:>3}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_step(&self, event: &StepEvent) {
        self.bar.set_position(event.percent as u64);
        match event.state {
            StepStatus::Succeeded => {
                self.bar.println(format!(
                    "[{}/{}] COMPLETED: {}",
                    event.index + 1,
                    event.total,
                    event.name
                ));
            }
            StepStatus::Failed => {
                self.bar
                    .println(format!("[{}/{}] FAILED: {}", event.index + 1, event.total, event.name));
                if let Some(ref reason) = event.message {
                    self.bar.println(format!("        {}", reason));
                }
                self.bar.abandon();
            }
            _ => {}
        }
        if event.percent == 100 {
            self.bar.finish();
        }
    }
}

fn list_services(config: &Config, path: &Path) {
    println!("Available services in {}:", path.display());
    for name in config.service_names() {
        let service = &config.services[&name];
        println!("  - {}", name);
        println!("    Image: {}", service.image_name);
        println!("    Container: {}", service.container_name);
        println!("    Build Path: {}", service.build_path);
        println!("    Docker Args: {}", service.docker_run_args);
        println!();
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    if cli.list {
        list_services(&config, &cli.config);
        return;
    }

    let (service, version) = match (cli.service, cli.version) {
        (Some(service), Some(version)) => (service, version),
        _ => {
            eprintln!(
                "Usage: deployer --service <service-name> --version <version> \
                 [--config deployment.config.json] [--build-path /path/to/build] [--dry-run]"
            );
            eprintln!("       deployer --list [--config deployment.config.json]");
            std::process::exit(1);
        }
    };

    if !config.services.contains_key(&service) {
        error!(
            "Service '{}' not found in config. Available services: {:?}",
            service,
            config.service_names()
        );
        std::process::exit(1);
    }

    let request = DeploymentRequest {
        service_name: service,
        version,
        build_path_override: cli.build_path,
        dry_run: cli.dry_run,
    };

    if request.dry_run {
        info!("MODE: DRY RUN - No actual changes will be made");
    }

    let mut deployer = Deployer::new(
        DockerCli::new(request.dry_run),
        SshSession::new(request.dry_run),
        Box::new(ConsoleProgress::new()),
    );

    match deployer.deploy(&request, &config).await {
        Ok(()) => {
            info!("Deployment completed successfully!");
        }
        Err(e) => {
            error!("Deployment failed: {}", e);
            std::process::exit(1);
        }
    }
}
