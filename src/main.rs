use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use imagescan::{
    cleanup::CleanupManager,
    config::Config,
    model::ProviderKind,
    orchestrator::{unique_images, ImageOutcome, ScanOrchestrator},
    output::{print_result, render_result, OutputFormat},
    probe::{os_listing, OsDetector, PackageManagerDispatcher, PackageRecordParser, AUXILIARY_LISTINGS},
    runtime::{ContainerRuntime, ProcessRunner},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Exit codes for CI integration
mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const ERROR: u8 = 1;
}

#[derive(Parser)]
#[command(name = "imagescan")]
#[command(
    author,
    version,
    about = "Inventory OS and language packages installed in container images"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan container images and print their package inventory
    ///
    /// Images that could not be scanned are absent from the report.
    Scan {
        /// Output format (json, table)
        #[arg(short, long)]
        format: Option<String>,

        /// Write output to file
        #[arg(short, long)]
        output: Option<String>,

        /// Container runtime binary
        #[arg(long)]
        runtime: Option<String>,

        /// Timeout in seconds for each command run inside a container
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep images after scanning
        #[arg(long)]
        keep_images: bool,

        /// Skip the system-wide prune after scanning
        #[arg(long)]
        no_prune: bool,

        /// Image references to scan (e.g. --images alpine:3.19 debian:12)
        #[arg(long, required = true, num_args = 1..)]
        images: Vec<String>,
    },

    /// List package providers and their listing commands
    Providers,

    /// Show or create config file
    Config {
        /// Generate default config file
        #[arg(long)]
        init: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,
    },
}

struct ScanArgs {
    format: Option<String>,
    output: Option<String>,
    runtime: Option<String>,
    timeout: Option<u64>,
    keep_images: bool,
    no_prune: bool,
    images: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_codes::ERROR)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> Result<u8> {
    match command {
        Commands::Scan {
            format,
            output,
            runtime,
            timeout,
            keep_images,
            no_prune,
            images,
        } => {
            let config = Config::load().context("Failed to load config")?;
            run_scan(
                config,
                ScanArgs {
                    format,
                    output,
                    runtime,
                    timeout,
                    keep_images,
                    no_prune,
                    images,
                },
            )
            .await
        }
        Commands::Providers => {
            list_providers();
            Ok(exit_codes::SUCCESS)
        }
        Commands::Config { init, path } => {
            handle_config(init, path)?;
            Ok(exit_codes::SUCCESS)
        }
    }
}

async fn run_scan(mut config: Config, args: ScanArgs) -> Result<u8> {
    if let Some(runtime) = args.runtime {
        config.runtime = runtime;
    }
    if let Some(timeout) = args.timeout {
        config.exec_timeout_secs = timeout;
    }
    config.validate()?;

    let format_str = args.format.unwrap_or(config.default_format.clone());
    let format = OutputFormat::from_str(&format_str).map_err(|e| anyhow::anyhow!(e))?;
    let is_interactive = format == OutputFormat::Table;

    let images: Vec<String> = unique_images(&args.images)
        .into_iter()
        .filter(|image| {
            let ignored = config.ignore.should_ignore_image(image);
            if ignored {
                tracing::info!(image = %image, "image ignored by config");
            }
            !ignored
        })
        .collect();

    let runtime = ContainerRuntime::new(Arc::new(ProcessRunner), config.runtime.clone())
        .with_keep_alive(config.keep_alive())
        .with_exec_timeout(config.exec_timeout())
        .with_start_timeout(config.start_timeout());

    let cleanup = CleanupManager::new(&runtime)
        .with_image_removal(config.remove_images && !args.keep_images)
        .with_prune(config.prune_after_scan && !args.no_prune);

    let orchestrator = ScanOrchestrator::new(&runtime)
        .with_detector(OsDetector::new(config.release_file.clone()))
        .with_dispatcher(PackageManagerDispatcher::new(PackageRecordParser::new(config.npm_version)))
        .with_cleanup(cleanup);

    let progress = if is_interactive {
        let pb = ProgressBar::new(images.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let report = orchestrator
        .scan_all(&images, |image, outcome| {
            if let Some(ref pb) = progress {
                let status = match outcome {
                    ImageOutcome::Reported(_) => "ok",
                    ImageOutcome::Excluded(_) => "no data",
                    ImageOutcome::Failed(_) => "failed",
                };
                pb.set_message(format!("{} ({})", image, status));
                pb.inc(1);
            }
        })
        .await;

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Reported {} of {} images", report.images.len(), images.len()));
    }

    // Handle output
    if let Some(path) = args.output {
        let Some(text) = render_result(&report, format)? else {
            tracing::warn!("no image produced results, nothing written");
            return Ok(exit_codes::SUCCESS);
        };
        std::fs::write(&path, text).with_context(|| format!("Failed to write {}", path))?;
        if is_interactive {
            println!("Results written to: {}", path);
        }
    } else {
        print_result(&report, format)?;
    }

    Ok(exit_codes::SUCCESS)
}

fn list_providers() {
    println!("Package providers:");
    println!();

    for provider in ProviderKind::ALL {
        let command = match provider {
            ProviderKind::Pip | ProviderKind::Npm => AUXILIARY_LISTINGS
                .iter()
                .find(|l| l.provider == provider)
                .map(|l| l.argv.join(" ")),
            _ => os_listing(provider).map(|l| l.argv.join(" ")),
        };

        println!(
            "  {:<12} {}",
            provider.as_str(),
            command.unwrap_or_else(|| "(none, reported as unknown)".to_string())
        );
    }
}

fn handle_config(init: bool, show_path: bool) -> Result<()> {
    let config_path = Config::config_path();

    if show_path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config file already exists at: {}", config_path.display());
            return Ok(());
        }

        let config = Config::default();
        config.save()?;
        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Default configuration:");
        println!("{}", Config::generate_default_config());
        return Ok(());
    }

    // Show current config
    if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        println!("Config file: {}", config_path.display());
        println!();
        println!("{}", content);
    } else {
        println!("No config file found.");
        println!("Run 'imagescan config --init' to create one.");
        println!();
        println!("Config path: {}", config_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_images_stop_at_next_option() {
        let cli = Cli::try_parse_from([
            "imagescan",
            "scan",
            "--images",
            "alpine:3.19",
            "debian:12",
            "--no-prune",
        ])
        .unwrap();

        let Commands::Scan { images, no_prune, .. } = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(images, vec!["alpine:3.19".to_string(), "debian:12".to_string()]);
        assert!(no_prune);
    }

    #[test]
    fn test_images_required() {
        assert!(Cli::try_parse_from(["imagescan", "scan"]).is_err());
    }
}
