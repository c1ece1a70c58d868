//! A client library for collecting time-series sensor data and batching it
//! to a remote ingestion API

pub mod buffer;
pub mod collector;
pub mod config;
pub mod error;
pub mod series;
pub mod transport;
pub mod util;

pub use collector::{DatasetCollector, dataset_collector};
pub use transport::send_dataset;
pub use util::logging::init as init_logging;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::buffer::DataStore;
    pub use crate::collector::{DatasetCollector, dataset_collector};
    pub use crate::config::{CollectorConfig, CollectorConfigBuilder, load_config};
    pub use crate::error::{ClientError, Result};
    pub use crate::series::{Labeling, SeriesBatch};
    pub use crate::transport::{IngestApi, send_dataset};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
