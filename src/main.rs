//! Keyspaces Writer
//!
//! Demo binary: writes synthetic sensor readings through the batch writer,
//! authenticating with the configured role chain.

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use keyspaces_writer::{
    config::{create_signer, Environment, Settings},
    logging::init_tracing,
    schema::{ColumnValues, CompositeKey, CqlValue, Entity, EntitySchema, SchemaField},
    store, BatchWriter,
};
use std::sync::Arc;

/// Keyspaces Writer
///
/// Writes a batch of sample readings to `<keyspace>.sensor_readings`.
#[derive(Parser, Debug)]
#[command(name = "keyspaces-writer")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of readings to write
    #[arg(short, long, default_value_t = 10)]
    count: usize,

    /// Keyspace (overrides CASSANDRA_KEYSPACE env var)
    #[arg(short, long)]
    keyspace: Option<String>,

    /// TTL in seconds (overrides WRITE_TTL_SECONDS env var)
    #[arg(long)]
    ttl: Option<u32>,

    /// Write conditionally with IF NOT EXISTS
    #[arg(long)]
    if_not_exists: bool,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long)]
    env: Option<Environment>,
}

/// Partition key of a reading
#[derive(Debug, Clone)]
struct DeviceDay {
    device_id: String,
    day: String,
}

impl CompositeKey for DeviceDay {
    fn fields() -> Vec<SchemaField> {
        vec![SchemaField::plain("device_id"), SchemaField::plain("day")]
    }

    fn write_values(&self, values: &mut ColumnValues) {
        values
            .set("device_id", CqlValue::Text(self.device_id.clone()))
            .set("day", CqlValue::Text(self.day.clone()));
    }
}

#[derive(Debug, Clone)]
struct SensorReading {
    key: DeviceDay,
    reading_id: uuid::Uuid,
    recorded_at: i64,
    temperature: f64,
}

impl SensorReading {
    fn sample(index: usize) -> Self {
        let now = Utc::now();
        Self {
            key: DeviceDay {
                device_id: format!("device-{}", index % 4),
                day: now.format("%Y-%m-%d").to_string(),
            },
            reading_id: uuid::Uuid::new_v4(),
            recorded_at: now.timestamp_millis(),
            temperature: 18.0 + (index % 10) as f64 * 0.5,
        }
    }
}

impl Entity for SensorReading {
    fn schema() -> EntitySchema {
        EntitySchema::new("sensor_readings")
            .composite_key::<DeviceDay>("key")
            .column("reading_id")
            .column("recorded_at")
            .column("temperature")
    }

    fn write_values(&self, values: &mut ColumnValues) {
        self.key.write_values(values);
        values
            .set("reading_id", CqlValue::Uuid(self.reading_id))
            .set("recorded_at", CqlValue::BigInt(self.recorded_at))
            .set("temperature", CqlValue::Double(self.temperature));
    }

    fn identity(&self) -> String {
        format!("{}/{}/{}", self.key.device_id, self.key.day, self.reading_id)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;

    // Override settings with CLI arguments
    if let Some(keyspace) = args.keyspace {
        settings.keyspace = keyspace;
    }
    if let Some(ttl) = args.ttl {
        settings.write_ttl_seconds = Some(ttl);
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }
    settings.validate()?;

    init_tracing(&settings.log_level)?;

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        region = %settings.aws_region,
        keyspace = %settings.keyspace,
        "Starting application"
    );

    let signer = create_signer(&settings).await?;
    let session = store::connect(&settings.contact_points, signer).await?;

    let writer = BatchWriter::with_statement_cache_capacity(
        Arc::new(session),
        settings.keyspace.clone(),
        settings.statement_cache_capacity,
    );

    let options = settings.write_options().with_if_not_exists(args.if_not_exists);
    let readings: Vec<SensorReading> = (0..args.count).map(SensorReading::sample).collect();

    let report = writer.insert_all(&readings, &options).await?;

    tracing::info!(
        keyspace = %writer.keyspace(),
        total = report.total(),
        applied = report.applied_count(),
        "Batch written"
    );

    Ok(())
}
