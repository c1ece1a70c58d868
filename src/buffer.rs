use log::{debug, trace};
use std::mem;
use std::sync::Mutex;

use crate::error::{ClientError, Result};
use crate::series::SeriesBatch;

/// Buffered points for a single series during the current open window
#[derive(Debug, Clone)]
pub struct SeriesBuffer {
    /// Name of the series
    name: String,

    /// Points appended since the last flush, in insertion order
    points: Vec<(f64, f64)>,

    /// Running minimum timestamp
    start: Option<f64>,

    /// Running maximum timestamp
    end: Option<f64>,
}

impl SeriesBuffer {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
            start: None,
            end: None,
        }
    }

    /// Append a point and widen the timestamp bounds.
    ///
    /// Bounds are simple min/max; point ordering is not enforced.
    fn push(&mut self, time: f64, value: f64) {
        self.points.push((time, value));
        self.start = Some(self.start.map_or(time, |s| s.min(time)));
        self.end = Some(self.end.map_or(time, |e| e.max(time)));
    }

    fn into_batch(self) -> SeriesBatch {
        SeriesBatch {
            name: self.name,
            data: self.points,
            start: self.start,
            end: self.end,
        }
    }

    fn as_batch(&self) -> SeriesBatch {
        self.clone().into_batch()
    }
}

/// Accumulation buffer shared between the ingestion path and in-flight
/// flushes.
///
/// All access goes through a single lock, so "swap the live buffer for an
/// empty one and hand the old contents to a flush task" is one atomic step
/// relative to concurrent appends. Series order is first-use order.
pub struct DataStore {
    series: Mutex<Vec<SeriesBuffer>>,
}

impl DataStore {
    /// Create an empty data store
    pub fn new() -> Self {
        Self {
            series: Mutex::new(Vec::new()),
        }
    }

    /// Append a point to the named series, creating the buffer on first use
    pub fn append(&self, name: &str, time: f64, value: f64) -> Result<()> {
        let mut series = self
            .series
            .lock()
            .map_err(|_| ClientError::Other("Lock poisoned".to_string()))?;

        let idx = match series.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                series.push(SeriesBuffer::new(name));
                series.len() - 1
            }
        };
        series[idx].push(time, value);

        trace!("Buffered ({}, {}) for series '{}'", time, value, name);

        Ok(())
    }

    /// Take the current buffer contents, leaving the store empty.
    ///
    /// Series with no buffered points are dropped from the result.
    pub fn take(&self) -> Result<Vec<SeriesBatch>> {
        let mut series = self
            .series
            .lock()
            .map_err(|_| ClientError::Other("Lock poisoned".to_string()))?;

        let drained = mem::take(&mut *series);
        let batches: Vec<SeriesBatch> = drained
            .into_iter()
            .filter(|s| !s.points.is_empty())
            .map(SeriesBuffer::into_batch)
            .collect();

        if !batches.is_empty() {
            debug!("Drained {} series from the buffer", batches.len());
        }

        Ok(batches)
    }

    /// Get a snapshot of one series' current buffer, if it has any points
    pub fn series_batch(&self, name: &str) -> Result<Option<SeriesBatch>> {
        let series = self
            .series
            .lock()
            .map_err(|_| ClientError::Other("Lock poisoned".to_string()))?;
        Ok(series.iter().find(|s| s.name == name).map(SeriesBuffer::as_batch))
    }

    /// Get the total number of buffered points across all series
    pub fn total_count(&self) -> Result<usize> {
        let series = self
            .series
            .lock()
            .map_err(|_| ClientError::Other("Lock poisoned".to_string()))?;
        Ok(series.iter().map(|s| s.points.len()).sum())
    }

    /// Get the number of series with at least one buffered point
    pub fn series_count(&self) -> Result<usize> {
        let series = self
            .series
            .lock()
            .map_err(|_| ClientError::Other("Lock poisoned".to_string()))?;
        Ok(series.iter().filter(|s| !s.points.is_empty()).count())
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_buffer_on_first_use() {
        let store = DataStore::new();
        assert_eq!(store.series_count().unwrap(), 0);

        store.append("temp", 10.0, 21.5).unwrap();
        assert_eq!(store.series_count().unwrap(), 1);
        assert_eq!(store.total_count().unwrap(), 1);
    }

    #[test]
    fn bounds_track_min_and_max() {
        let store = DataStore::new();
        store.append("temp", 30.0, 1.0).unwrap();
        store.append("temp", 10.0, 2.0).unwrap();
        store.append("temp", 20.0, 3.0).unwrap();

        let batch = store.series_batch("temp").unwrap().unwrap();
        assert_eq!(batch.start, Some(10.0));
        assert_eq!(batch.end, Some(30.0));
        assert_eq!(batch.data.len(), 3);
    }

    #[test]
    fn bounds_set_from_first_point() {
        let store = DataStore::new();
        store.append("temp", 42.0, 1.0).unwrap();

        let batch = store.series_batch("temp").unwrap().unwrap();
        assert_eq!(batch.start, Some(42.0));
        assert_eq!(batch.end, Some(42.0));
    }

    #[test]
    fn take_drains_and_resets() {
        let store = DataStore::new();
        store.append("temp", 10.0, 1.0).unwrap();
        store.append("humidity", 11.0, 2.0).unwrap();

        let batches = store.take().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(store.total_count().unwrap(), 0);
        assert!(store.take().unwrap().is_empty());
    }

    #[test]
    fn take_preserves_first_use_order() {
        let store = DataStore::new();
        store.append("b", 1.0, 1.0).unwrap();
        store.append("a", 2.0, 2.0).unwrap();
        store.append("b", 3.0, 3.0).unwrap();

        let batches = store.take().unwrap();
        assert_eq!(batches[0].name, "b");
        assert_eq!(batches[1].name, "a");
        assert_eq!(batches[0].data, vec![(1.0, 1.0), (3.0, 3.0)]);
    }

    #[test]
    fn points_keep_insertion_order_within_series() {
        let store = DataStore::new();
        store.append("temp", 30.0, 1.0).unwrap();
        store.append("temp", 10.0, 2.0).unwrap();

        let batch = store.series_batch("temp").unwrap().unwrap();
        assert_eq!(batch.data, vec![(30.0, 1.0), (10.0, 2.0)]);
    }
}
