mod cases;
mod cli;
mod config;
mod runner;

use anyhow::Result;
use clap::Parser;
use edit_harness::CiConfig;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::SuiteConfig;
use runner::RunPlan;

/// Log filter variable; falls back to `RUST_LOG`.
const LOG_ENV: &str = "EDIT_SUITE_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Command::List => {
            for case in cases::CASES {
                println!("{:<16} {}", case.name, case.description);
            }
            0
        }
        Command::InitConfig { force } => {
            let path = cli.config.clone().unwrap_or_else(SuiteConfig::config_path);
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            SuiteConfig::default().save(&path)?;
            println!("wrote {}", path.display());
            0
        }
        Command::Run(args) => {
            let config = SuiteConfig::load(cli.config.as_deref())?;
            let ci = CiConfig::from_env();
            let plan = RunPlan::new(&args, &config, &ci)?;
            let reporter = plan.execute(&ci).await?;
            reporter.exit_code()
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
