// Example of streaming simulated room-climate readings with sensorlink

use clap::Parser;
use log::{error, info};
use sensorlink::collector::DatasetCollector;
use sensorlink::config::{CollectorConfig, load_config};
use std::path::PathBuf;
use tokio::time::Duration;

/// Command line arguments for the room climate example
#[derive(Parser, Debug)]
#[command(name = "room_climate", about = "Sensorlink room climate example")]
struct Args {
    /// Path to the configuration file (required)
    #[arg(short, long)]
    config: PathBuf,

    /// Number of readings to record per series
    #[arg(short, long, default_value = "40")]
    readings: u32,

    /// Delay between readings in milliseconds
    #[arg(short, long, default_value = "250")]
    delay_ms: u64,
}

// Synthetic waveforms standing in for real sensors
fn temperature_at(step: u32) -> f64 {
    21.0 + (step as f64 * 0.3).sin() * 1.5
}

fn humidity_at(step: u32) -> f64 {
    48.0 + (step as f64 * 0.2).cos() * 4.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config: CollectorConfig = match load_config(&args.config) {
        Ok(config) => {
            sensorlink::init_logging(&config.log_level);
            info!("Configuration loaded from {}", args.config.display());
            config
        }
        Err(e) => {
            sensorlink::init_logging(&sensorlink::config::LogLevel::Error);
            error!("Failed to load configuration: {}", e);
            return Err(anyhow::anyhow!("Failed to load configuration: {}", e));
        }
    };

    info!("Initializing collector for dataset '{}'...", config.name);
    let use_device_time = config.use_device_time;
    let collector = DatasetCollector::create(config).await?;
    info!("Collector ready, dataset id {}", collector.dataset_id());

    for step in 0..args.readings {
        let temp = temperature_at(step);
        let humidity = humidity_at(step);

        if use_device_time {
            collector.record_data_point("temp", temp)?;
            collector.record_data_point("humidity", humidity)?;
        } else {
            let now = chrono::Utc::now().timestamp_millis() as f64;
            collector.add_data_point(now, "temp", temp)?;
            collector.add_data_point(now, "humidity", humidity)?;
        }

        tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
    }

    info!(
        "Recorded {} readings per series, completing dataset...",
        args.readings
    );
    collector.on_complete().await?;
    info!("Dataset upload complete");

    Ok(())
}
