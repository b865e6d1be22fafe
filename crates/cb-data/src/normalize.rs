//! Normalization of typed numeric buffers into plain `f64` sequences
//!
//! Whatever representation a caller hands in, the canonical store keeps a
//! `Vec<f64>` per series so every onward encoding sees the same shape.
//! Nulls become `NaN`, which encodes as JSON `null` (a gap for the engine).

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array, UInt32Array};

/// Conversion into one normalized series
pub trait IntoSeries {
    fn into_series(self) -> Vec<f64>;
}

impl IntoSeries for Vec<f64> {
    fn into_series(self) -> Vec<f64> {
        self
    }
}

impl IntoSeries for &[f64] {
    fn into_series(self) -> Vec<f64> {
        self.to_vec()
    }
}

macro_rules! impl_into_series_lossless {
    ($($t:ty),*) => {
        $(
            impl IntoSeries for Vec<$t> {
                fn into_series(self) -> Vec<f64> {
                    self.into_iter().map(f64::from).collect()
                }
            }

            impl IntoSeries for &[$t] {
                fn into_series(self) -> Vec<f64> {
                    self.iter().copied().map(f64::from).collect()
                }
            }
        )*
    }
}

impl_into_series_lossless!(f32, i32, u32, i16, u16, i8, u8);

// 64-bit integers may lose precision past 2^53; that is what the engine sees anyway
impl IntoSeries for Vec<i64> {
    fn into_series(self) -> Vec<f64> {
        self.into_iter().map(|v| v as f64).collect()
    }
}

impl IntoSeries for Vec<u64> {
    fn into_series(self) -> Vec<f64> {
        self.into_iter().map(|v| v as f64).collect()
    }
}

impl IntoSeries for &Float64Array {
    fn into_series(self) -> Vec<f64> {
        (0..self.len())
            .map(|i| if self.is_null(i) { f64::NAN } else { self.value(i) })
            .collect()
    }
}

impl IntoSeries for &Float32Array {
    fn into_series(self) -> Vec<f64> {
        (0..self.len())
            .map(|i| if self.is_null(i) { f64::NAN } else { self.value(i) as f64 })
            .collect()
    }
}

impl IntoSeries for &Int64Array {
    fn into_series(self) -> Vec<f64> {
        (0..self.len())
            .map(|i| if self.is_null(i) { f64::NAN } else { self.value(i) as f64 })
            .collect()
    }
}

impl IntoSeries for &Int32Array {
    fn into_series(self) -> Vec<f64> {
        (0..self.len())
            .map(|i| if self.is_null(i) { f64::NAN } else { self.value(i) as f64 })
            .collect()
    }
}

impl IntoSeries for &UInt32Array {
    fn into_series(self) -> Vec<f64> {
        (0..self.len())
            .map(|i| if self.is_null(i) { f64::NAN } else { self.value(i) as f64 })
            .collect()
    }
}

/// Normalize a type-erased Arrow array; `None` for non-numeric arrays.
pub fn arrow_series(array: &dyn Array) -> Option<Vec<f64>> {
    let any = array.as_any();
    if let Some(values) = any.downcast_ref::<Float64Array>() {
        Some(values.into_series())
    } else if let Some(values) = any.downcast_ref::<Int64Array>() {
        Some(values.into_series())
    } else if let Some(values) = any.downcast_ref::<Int32Array>() {
        Some(values.into_series())
    } else if let Some(values) = any.downcast_ref::<Float32Array>() {
        Some(values.into_series())
    } else if let Some(values) = any.downcast_ref::<UInt32Array>() {
        Some(values.into_series())
    } else {
        None
    }
}

/// A series in one of the specialized representations callers commonly hold
#[derive(Debug, Clone, PartialEq)]
pub enum NumericBuffer {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    U8(Vec<u8>),
}

impl IntoSeries for NumericBuffer {
    fn into_series(self) -> Vec<f64> {
        match self {
            NumericBuffer::F64(values) => values,
            NumericBuffer::F32(values) => values.into_series(),
            NumericBuffer::I64(values) => values.into_series(),
            NumericBuffer::I32(values) => values.into_series(),
            NumericBuffer::U32(values) => values.into_series(),
            NumericBuffer::U8(values) => values.into_series(),
        }
    }
}
