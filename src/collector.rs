use chrono::Utc;
use log::{debug, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::buffer::DataStore;
use crate::config::CollectorConfig;
use crate::error::{ClientError, Result};
use crate::series::{Labeling, round_value};
use crate::transport::IngestApi;
use crate::transport::http::HttpTransport;

/// A collector session for one remote dataset.
///
/// Accumulates labeled data points per declared series and flushes them to
/// the ingestion endpoint once the flush interval has elapsed. Periodic
/// flushes run as detached tasks; their failures are captured and surfaced
/// on the next call into the collector.
pub struct DatasetCollector {
    /// Transport used for the append exchanges
    transport: Arc<dyn IngestApi>,

    /// Remote-assigned dataset identifier
    dataset_id: String,

    /// Series names declared at creation
    series_names: Vec<String>,

    /// Whether the collector mints timestamps itself
    use_device_time: bool,

    /// Parsed dataset labeling, sent with the terminal flush only
    labeling: Option<Labeling>,

    /// Wall-clock interval between periodic flushes
    flush_interval: std::time::Duration,

    /// Accumulation buffer for the current open window
    store: Arc<DataStore>,

    /// When the last flush was triggered
    last_flush: Mutex<Instant>,

    /// Set once `on_complete` has succeeded
    completed: AtomicBool,

    /// First failure reported by a detached flush task
    flush_error: Arc<Mutex<Option<String>>>,
}

impl std::fmt::Debug for DatasetCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCollector")
            .field("dataset_id", &self.dataset_id)
            .field("series_names", &self.series_names)
            .field("use_device_time", &self.use_device_time)
            .field("flush_interval", &self.flush_interval)
            .finish_non_exhaustive()
    }
}

impl DatasetCollector {
    /// Create a collector, performing the initialization exchange against
    /// the configured endpoint
    pub async fn create(config: CollectorConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.endpoint, &config.api_key)?;
        Self::with_transport(Arc::new(transport), config).await
    }

    /// Create a collector over an arbitrary transport implementation
    pub async fn with_transport(
        transport: Arc<dyn IngestApi>,
        config: CollectorConfig,
    ) -> Result<Self> {
        config.validate()?;

        let labeling = config
            .dataset_label
            .as_deref()
            .map(Labeling::parse)
            .transpose()?;

        let dataset_id = transport
            .init_dataset(
                &config.name,
                &config.meta_data,
                &config.time_series,
                labeling.as_ref(),
            )
            .await?;

        debug!(
            "Collector for dataset '{}' initialized with id {}",
            config.name, dataset_id
        );

        let flush_interval = config.flush_interval();
        Ok(Self {
            transport,
            dataset_id,
            series_names: config.time_series,
            use_device_time: config.use_device_time,
            labeling,
            flush_interval,
            store: Arc::new(DataStore::new()),
            last_flush: Mutex::new(Instant::now()),
            completed: AtomicBool::new(false),
            flush_error: Arc::new(Mutex::new(None)),
        })
    }

    /// Get the remote-assigned dataset identifier
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Get the accumulation buffer, e.g. to inspect pending points
    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Add a data point to one of the declared series.
    ///
    /// In caller-time mode `time` must be a finite timestamp in epoch
    /// milliseconds; in device-time mode it is ignored and the current
    /// wall-clock time is substituted. The value is rounded to two decimal
    /// places before storage. May trigger a detached periodic flush of the
    /// points buffered so far; the flushed batch never includes the point
    /// being added.
    pub fn add_data_point(&self, time: f64, series_name: &str, value: f64) -> Result<()> {
        if self.completed.load(Ordering::SeqCst) {
            return Err(ClientError::AlreadyCompleted);
        }
        if !self.series_names.iter().any(|s| s == series_name) {
            return Err(ClientError::InvalidSeries(series_name.to_string()));
        }
        self.check_flush_error()?;
        if !value.is_finite() {
            return Err(ClientError::InvalidValue(value.to_string()));
        }

        let time = if self.use_device_time {
            Utc::now().timestamp_millis() as f64
        } else if time.is_finite() {
            time
        } else {
            return Err(ClientError::InvalidTimestamp(time.to_string()));
        };

        self.flush_if_due();
        self.store.append(series_name, time, round_value(value))?;

        Ok(())
    }

    /// Add a data point using a device-generated timestamp.
    ///
    /// Only valid for collectors created with `use_device_time`.
    pub fn record_data_point(&self, series_name: &str, value: f64) -> Result<()> {
        if !self.use_device_time {
            return Err(ClientError::InvalidTimestamp(
                "collector expects caller-supplied timestamps".to_string(),
            ));
        }
        self.add_data_point(f64::NAN, series_name, value)
    }

    /// Send any remaining buffered points and mark the dataset complete.
    ///
    /// Unlike periodic flushes, the terminal flush carries the dataset
    /// labeling. The completion flag is only set once the flush has
    /// succeeded; a failed terminal flush leaves the collector usable for
    /// another attempt.
    pub async fn on_complete(&self) -> Result<()> {
        if self.completed.load(Ordering::SeqCst) {
            return Err(ClientError::AlreadyCompleted);
        }
        self.check_flush_error()?;

        let batches = self.store.take()?;
        self.transport
            .append_batch(&self.dataset_id, batches, self.labeling.clone())
            .await?;

        self.completed.store(true, Ordering::SeqCst);
        debug!("Dataset {} completed", self.dataset_id);

        Ok(())
    }

    /// Trigger a detached flush if the flush interval has elapsed
    fn flush_if_due(&self) {
        let mut last_flush = match self.last_flush.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if last_flush.elapsed() <= self.flush_interval {
            return;
        }
        *last_flush = Instant::now();
        drop(last_flush);

        let batches = match self.store.take() {
            Ok(batches) => batches,
            Err(e) => {
                warn!("Skipping flush, could not drain buffer: {}", e);
                return;
            }
        };
        if batches.is_empty() {
            return;
        }

        debug!(
            "Flushing {} series to dataset {}",
            batches.len(),
            self.dataset_id
        );

        // Periodic flushes omit the dataset labeling; only the terminal
        // flush from on_complete carries it. A failed flush's data is
        // dropped, not re-queued.
        let transport = Arc::clone(&self.transport);
        let dataset_id = self.dataset_id.clone();
        let flush_error = Arc::clone(&self.flush_error);
        tokio::spawn(async move {
            if let Err(err) = transport.append_batch(&dataset_id, batches, None).await {
                warn!("Background flush for dataset {} failed: {}", dataset_id, err);
                if let Ok(mut slot) = flush_error.lock() {
                    slot.get_or_insert(err.to_string());
                }
            }
        });
    }

    /// Fail if a detached flush has reported an error
    fn check_flush_error(&self) -> Result<()> {
        let slot = self
            .flush_error
            .lock()
            .map_err(|_| ClientError::Other("Lock poisoned".to_string()))?;
        match slot.as_ref() {
            Some(message) => Err(ClientError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

/// Create a collector for one remote dataset.
///
/// `time_series` declares the series points may be added for;
/// `dataset_label`, when given, must be of the form
/// `labelingName_labelName`. The calling convention for adding points
/// follows the selected time mode: `record_data_point` for device time,
/// `add_data_point` for caller-supplied time.
pub async fn dataset_collector(
    endpoint: &str,
    api_key: &str,
    name: &str,
    use_device_time: bool,
    time_series: Vec<String>,
    meta_data: Value,
    dataset_label: Option<&str>,
) -> Result<DatasetCollector> {
    let mut builder = CollectorConfig::builder(name)
        .endpoint(endpoint)
        .api_key(api_key)
        .use_device_time(use_device_time)
        .time_series(time_series)
        .meta_data(meta_data);
    if let Some(label) = dataset_label {
        builder = builder.dataset_label(label);
    }

    DatasetCollector::create(builder.build()).await
}
