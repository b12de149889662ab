//! Command-line pressure logger.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use iongauge::{
    AppConfig, CsvRecorder, GaugeClient, MemoryRecorder, PollingLoop, Recorder, list_ports,
};

/// Poll an ionization gauge and log its pressure.
#[derive(Debug, Parser)]
#[command(name = "iongauge", version, about)]
struct Cli {
    /// Configuration file, may be repeated (later files override earlier ones)
    #[arg(short, long = "config", value_name = "FILE")]
    configs: Vec<PathBuf>,

    /// Serial port, overrides the configuration
    #[arg(short, long)]
    port: Option<String>,

    /// Seconds between samples, overrides the configuration
    #[arg(short, long)]
    interval: Option<f64>,

    /// Run length in seconds (0 runs until interrupted), overrides the configuration
    #[arg(short, long)]
    duration: Option<f64>,

    /// Do not store samples
    #[arg(long)]
    no_store: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.serial.port.clone_from(port);
        }
        if let Some(interval) = self.interval {
            config.logging.interval = interval;
        }
        if let Some(duration) = self.duration {
            config.logging.duration = duration;
        }
        if self.no_store {
            config.logging.store_data = false;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> iongauge::Result<()> {
    if cli.list_ports {
        for port in list_ports()? {
            println!("{port}");
        }
        return Ok(());
    }

    let mut config = AppConfig::load(&cli.configs)?;
    cli.apply(&mut config);
    config.validate()?;

    let mut client = GaugeClient::serial(config.serial_config()?, config.gauge_config()?);
    let mut polling = PollingLoop::new(config.polling_config()?);

    let stop = polling.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after current sample");
            stop.stop();
        }
    });

    tracing::info!(
        "gauge {} on {}",
        client.config().address,
        client.transport().config().port
    );
    client.connect().await?;

    let mut recorder: Box<dyn Recorder> = if polling.config().store {
        let output = config.output_path();
        tracing::info!("storing samples in {}", output.display());
        Box::new(CsvRecorder::new(output))
    } else {
        Box::new(MemoryRecorder::new())
    };

    let result = polling.run(&mut client, recorder.as_mut()).await;
    client.disconnect().await?;

    let summary = result?;
    if summary.failures > 0 {
        tracing::warn!(
            "{} of {} reads failed",
            summary.failures,
            summary.samples
        );
    }
    Ok(())
}
