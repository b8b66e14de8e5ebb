//! Owned, row-major tensors with explicit shape metadata.
//!
//! Every tensor handed to or received from a model is a [`Tensor`]: a flat
//! `Vec` plus its dimension sizes.  Construction checks that the two agree,
//! and all indexing goes through bounds-checked slices.

use std::fmt;

use thiserror::Error;

/// Shape / data disagreement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("shape {shape:?} holds {expected} elements but {actual} were supplied")]
    ElementCount { shape: Vec<usize>, expected: usize, actual: usize },

    #[error("expected shape {expected}, got {actual:?}")]
    Mismatch { expected: Pattern, actual: Vec<usize> },
}

/// Expected shape with optional wildcard dimensions, e.g. `[1, N, ?]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(pub Vec<Option<usize>>);

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match dim {
                Some(d) => write!(f, "{d}")?,
                None => f.write_str("?")?,
            }
        }
        f.write_str("]")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    shape: Vec<usize>,
    data: Vec<T>, // flat, row-major
}

impl<T> Tensor<T> {
    /// Wrap `data` with `shape`, checking the element count.
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self, ShapeError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ShapeError::ElementCount { shape, expected, actual: data.len() });
        }
        Ok(Self { shape, data })
    }

    /// Rank-2 singleton-batch tensor `[1, len]`.
    pub fn row(data: Vec<T>) -> Self {
        Self { shape: vec![1, data.len()], data }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<T>) {
        (self.shape, self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Size of the last dimension (1 for scalars).
    pub fn width(&self) -> usize {
        self.shape.last().copied().unwrap_or(1)
    }

    /// Check the shape against `pattern`; `None` entries match any size.
    pub fn expect_shape(&self, pattern: &[Option<usize>]) -> Result<(), ShapeError> {
        let matches = self.shape.len() == pattern.len()
            && self.shape.iter().zip(pattern).all(|(&d, p)| p.map_or(true, |p| p == d));
        if matches {
            Ok(())
        } else {
            Err(ShapeError::Mismatch {
                expected: Pattern(pattern.to_vec()),
                actual: self.shape.clone(),
            })
        }
    }
}

impl<T: Copy> Tensor<T> {
    /// Swap the last two axes of a rank-3 tensor: `[B, R, C]` → `[B, C, R]`.
    pub fn transpose_last2(&self) -> Result<Self, ShapeError> {
        self.expect_shape(&[None, None, None])?;
        let (b, r, c) = (self.shape[0], self.shape[1], self.shape[2]);
        let mut out = Vec::with_capacity(self.data.len());
        for k in 0..b {
            let batch = &self.data[k * r * c..(k + 1) * r * c];
            for j in 0..c {
                for i in 0..r {
                    out.push(batch[i * c + j]);
                }
            }
        }
        Tensor::new(vec![b, c, r], out)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_element_count() {
        assert!(Tensor::new(vec![2, 3], vec![0.0f32; 6]).is_ok());
        let err = Tensor::new(vec![2, 3], vec![0.0f32; 5]).unwrap_err();
        assert!(matches!(err, ShapeError::ElementCount { expected: 6, actual: 5, .. }));
    }

    #[test]
    fn test_expect_shape_wildcards() {
        let t = Tensor::new(vec![1, 4, 8], vec![0i64; 32]).unwrap();
        assert!(t.expect_shape(&[Some(1), None, Some(8)]).is_ok());
        assert!(t.expect_shape(&[Some(1), Some(3), None]).is_err());
        assert!(t.expect_shape(&[Some(1), None]).is_err());
    }

    #[test]
    fn test_mismatch_message() {
        let t = Tensor::row(vec![1.0f32, 2.0]);
        let err = t.expect_shape(&[Some(1), Some(3)]).unwrap_err();
        assert_eq!(err.to_string(), "expected shape [1, 3], got [1, 2]");
    }

    #[test]
    fn test_transpose_last2() {
        // [1, 2, 3] → [1, 3, 2]
        let t = Tensor::new(vec![1, 2, 3], vec![1, 2, 3, 4, 5, 6]).unwrap();
        let tt = t.transpose_last2().unwrap();
        assert_eq!(tt.shape(), &[1, 3, 2]);
        assert_eq!(tt.data(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_transpose_empty_time_axis() {
        let t: Tensor<f32> = Tensor::new(vec![1, 0, 80], vec![]).unwrap();
        let tt = t.transpose_last2().unwrap();
        assert_eq!(tt.shape(), &[1, 80, 0]);
        assert!(tt.is_empty());
    }
}
