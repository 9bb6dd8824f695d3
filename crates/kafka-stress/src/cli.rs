use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, warn};

use crate::config::LoadConfig;
use crate::error::LoadError;
use crate::load_driver::LoadDriver;
use crate::logging::LoggingOpt;
use crate::stats_collector::RunSummary;
use crate::transport::KafkaConnector;

/// Exit status when the run completed or was interrupted by the operator
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status on any setup failure
pub const EXIT_SETUP_FAILURE: u8 = 1;

/// Stress a Kafka cluster with batches of identical messages
#[derive(Debug, Parser)]
#[command(name = "kafka-stress", version)]
pub struct LoadOpt {
    /// Read the load profile from a YAML file instead of the flags below
    #[arg(long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Print a load profile with the default settings and exit
    #[arg(long)]
    pub example_config: bool,

    #[command(flatten)]
    pub load: LoadConfig,

    #[command(flatten)]
    pub logging: LoggingOpt,
}

impl LoadOpt {
    pub fn load_config(&self) -> Result<LoadConfig> {
        match &self.config {
            Some(path) => LoadConfig::from_file(path)
                .with_context(|| format!("loading load profile {}", path.display())),
            None => Ok(self.load.clone()),
        }
    }
}

pub async fn run_load(opt: LoadOpt) -> ExitCode {
    if opt.example_config {
        return match serde_yaml::to_string(&LoadConfig::default()) {
            Ok(profile) => {
                println!("{profile}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!("{err}");
                ExitCode::from(EXIT_SETUP_FAILURE)
            }
        };
    }

    let config = match opt.load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err:#}");
            return ExitCode::from(EXIT_SETUP_FAILURE);
        }
    };

    let driver = LoadDriver::new(config, KafkaConnector);
    let stop = driver.stop_signal();
    if let Err(err) = ctrlc::set_handler(move || {
        debug!("detected control c, stopping producers");
        stop.stop();
    }) {
        warn!(%err, "failed to install Ctrl-C handler");
    }

    let result = driver.run().await;
    match &result {
        Ok(summary) => summary.log(),
        Err(err) => error!("{err}"),
    }
    ExitCode::from(exit_status(&result))
}

/// Map the result of a run to the process exit status
pub fn exit_status(result: &Result<RunSummary, LoadError>) -> u8 {
    match result {
        Ok(_) => EXIT_SUCCESS,
        Err(_) => EXIT_SETUP_FAILURE,
    }
}
