//! N-dimensional `f64` datasets
//!
//! Placeholder stacks are mostly constant, so a dataset is either a fill value
//! over a shape (stored as one number) or a dense row-major buffer.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dataset payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "storage", rename_all = "snake_case")]
pub enum Dataset {
    /// Every element equals `value`
    Fill {
        /// Dimensions, slowest-varying first
        shape: Vec<usize>,
        /// Fill value
        value: f64,
    },
    /// Row-major values
    Dense {
        /// Dimensions, slowest-varying first
        shape: Vec<usize>,
        /// `shape.iter().product()` values
        values: Vec<f64>,
    },
}

impl Dataset {
    /// Constant dataset.
    #[must_use]
    pub fn filled(shape: Vec<usize>, value: f64) -> Self {
        Self::Fill { shape, value }
    }

    /// All-ones dataset.
    #[must_use]
    pub fn ones(shape: Vec<usize>) -> Self {
        Self::filled(shape, 1.0)
    }

    /// Dense dataset, checking that the buffer matches the shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `values.len()` differs from the
    /// product of `shape`.
    pub fn try_dense(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(Error::InvalidInput(format!(
                "dataset shape {shape:?} needs {expected} values, got {}",
                values.len()
            )));
        }
        Ok(Self::Dense { shape, values })
    }

    // Callers guarantee `values.len() == shape.iter().product()`.
    pub(crate) fn dense(shape: Vec<usize>, values: Vec<f64>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        Self::Dense { shape, values }
    }

    /// Dimensions.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Fill { shape, .. } | Self::Dense { shape, .. } => shape,
        }
    }

    /// Number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// Check if the dataset has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at a multi-dimensional index.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        let shape = self.shape();
        if index.len() != shape.len() || index.iter().zip(shape).any(|(i, n)| i >= n) {
            return None;
        }
        match self {
            Self::Fill { value, .. } => Some(*value),
            Self::Dense { values, .. } => {
                let offset = index
                    .iter()
                    .zip(shape)
                    .fold(0, |acc, (i, n)| acc * n + i);
                values.get(offset).copied()
            }
        }
    }

    /// Swap the two axes of a 2-D dataset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for datasets that are not 2-D.
    pub fn transposed(self) -> Result<Self> {
        if self.rank() != 2 {
            return Err(Error::InvalidInput(format!(
                "transpose needs a 2-D dataset, got shape {:?}",
                self.shape()
            )));
        }
        Ok(match self {
            Self::Fill { shape, value } => Self::Fill {
                shape: vec![shape[1], shape[0]],
                value,
            },
            Self::Dense { shape, values } => {
                let (rows, cols) = (shape[0], shape[1]);
                let mut out = Vec::with_capacity(values.len());
                for c in 0..cols {
                    out.extend((0..rows).map(|r| values[r * cols + c]));
                }
                Self::Dense {
                    shape: vec![cols, rows],
                    values: out,
                }
            }
        })
    }
}
