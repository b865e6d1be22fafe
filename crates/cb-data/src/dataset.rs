//! The canonical dataset: equal-length numeric series, series 0 being the axis

use std::ops::Range;

use arrow::record_batch::RecordBatch;
use serde::Serialize;

use crate::normalize::{arrow_series, IntoSeries};
use crate::window::window_range;
use crate::DataError;

/// Ordered set of equal-length series.
///
/// Every mutation touches all series together, so the lengths never diverge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    series: Vec<Vec<f64>>,
}

/// What `push` did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The point was appended to the existing series
    Appended,
    /// The arity differed; the store was reset to the point's arity first
    Reset { previous_arity: usize },
    /// Empty point, nothing changed
    Ignored,
}

impl Dataset {
    /// An empty dataset with no series
    pub fn new() -> Self {
        Self::default()
    }

    /// `arity` empty series
    pub fn with_arity(arity: usize) -> Self {
        Self {
            series: vec![Vec::new(); arity],
        }
    }

    /// Build from already-normalized series, checking the lengths agree
    pub fn from_series(series: Vec<Vec<f64>>) -> Result<Self, DataError> {
        if let Some(first) = series.first() {
            let expected = first.len();
            if let Some((index, found)) = series
                .iter()
                .enumerate()
                .find(|(_, s)| s.len() != expected)
                .map(|(i, s)| (i, s.len()))
            {
                return Err(DataError::Ragged { expected, found, index });
            }
        }
        Ok(Self { series })
    }

    /// Build from typed buffers of any supported representation
    pub fn from_buffers<I, B>(buffers: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = B>,
        B: IntoSeries,
    {
        Self::from_series(buffers.into_iter().map(IntoSeries::into_series).collect())
    }

    /// Normalize the named numeric columns of a record batch, in order
    pub fn from_record_batch(batch: &RecordBatch, columns: &[&str]) -> Result<Self, DataError> {
        let mut series = Vec::with_capacity(columns.len());
        for name in columns {
            let column = batch
                .column_by_name(name)
                .ok_or_else(|| DataError::NonNumericColumn(name.to_string()))?;
            let values = arrow_series(column.as_ref())
                .ok_or_else(|| DataError::NonNumericColumn(name.to_string()))?;
            series.push(values);
        }
        tracing::debug!("Normalized {} columns, {} rows", series.len(), batch.num_rows());
        Self::from_series(series)
    }

    pub fn series(&self) -> &[Vec<f64>] {
        &self.series
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Number of points (shared length of every series)
    pub fn len(&self) -> usize {
        self.series.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole dataset
    pub fn replace(&mut self, other: Dataset) {
        self.series = other.series;
    }

    /// Drop every series
    pub fn clear(&mut self) {
        self.series.clear();
    }

    /// Append one value per series.
    ///
    /// A point whose arity differs from the series count resets the store to
    /// that many empty series before appending. An empty point carries no
    /// values and leaves the store untouched.
    pub fn push(&mut self, point: &[f64]) -> PushOutcome {
        if point.is_empty() {
            return PushOutcome::Ignored;
        }

        let mut outcome = PushOutcome::Appended;
        if point.len() != self.series.len() {
            outcome = PushOutcome::Reset {
                previous_arity: self.series.len(),
            };
            self.series = vec![Vec::new(); point.len()];
        }

        for (series, value) in self.series.iter_mut().zip(point) {
            series.push(*value);
        }
        outcome
    }

    /// Restrict every series to the index window where series `axis` lies in
    /// `[min, max]`. Empties every series when nothing matches.
    ///
    /// Returns the kept window.
    pub fn slice(
        &mut self,
        axis: usize,
        min: f64,
        max: f64,
    ) -> Result<Option<Range<usize>>, DataError> {
        let axis_values = self.series.get(axis).ok_or(DataError::AxisOutOfRange {
            axis,
            series: self.series.len(),
        })?;

        let window = window_range(axis_values, min, max);
        match &window {
            Some(range) => {
                for series in &mut self.series {
                    series.truncate(range.end);
                    series.drain(..range.start);
                }
            }
            None => {
                for series in &mut self.series {
                    series.clear();
                }
            }
        }
        Ok(window)
    }

    pub fn into_series(self) -> Vec<Vec<f64>> {
        self.series
    }
}

impl TryFrom<Vec<Vec<f64>>> for Dataset {
    type Error = DataError;

    fn try_from(series: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_series(series)
    }
}
