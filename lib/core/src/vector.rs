use serde::{Deserialize, Serialize};

/// A dense embedding vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    #[inline]
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn from_slice(data: &[f32]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    #[inline]
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: vec![0.0; dim],
        }
    }

    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub fn norm(&self) -> f32 {
        crate::simd::norm_simd(&self.data)
    }

    /// True when every component is finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    #[inline]
    pub fn dot(&self, other: &Vector) -> f32 {
        crate::simd::dot_product_simd(&self.data, &other.data)
    }

    /// Cosine similarity, 0.0 for mismatched dimensions or zero vectors
    #[inline]
    pub fn cosine_similarity(&self, other: &Vector) -> f32 {
        if self.dim() != other.dim() {
            return 0.0;
        }

        let norm_a = self.norm();
        let norm_b = other.norm();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        self.dot(other) / (norm_a * norm_b)
    }

    /// Scale to unit length in place. Returns false (and leaves the vector
    /// untouched) when the norm is zero or not finite.
    #[inline]
    pub fn normalize(&mut self) -> bool {
        let norm = self.norm();
        if !norm.is_finite() || norm <= f32::EPSILON {
            return false;
        }
        let inv_norm = 1.0 / norm;
        for x in &mut self.data {
            *x *= inv_norm;
        }
        true
    }

    /// Unit-length copy, `None` for zero or non-finite vectors
    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Option<Self> {
        let mut v = self.clone();
        v.normalize().then_some(v)
    }

    /// Component-wise mean of vectors sharing one dimension.
    ///
    /// Returns `None` for an empty input or when dimensions disagree.
    pub fn mean<'a, I>(vectors: I) -> Option<Vector>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let mut iter = vectors.into_iter();
        let first = iter.next()?;
        let mut sum: Vec<f32> = first.to_vec();
        let mut count = 1usize;

        for v in iter {
            if v.len() != sum.len() {
                return None;
            }
            for (acc, x) in sum.iter_mut().zip(v) {
                *acc += x;
            }
            count += 1;
        }

        let inv = 1.0 / count as f32;
        for x in &mut sum {
            *x *= inv;
        }
        Some(Vector::new(sum))
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let v1 = Vector::new(vec![1.0, 0.0]);
        let v2 = Vector::new(vec![2.0, 0.0]);
        assert!((v1.cosine_similarity(&v2) - 1.0).abs() < 1e-6);

        let v3 = Vector::new(vec![1.0, 0.0]);
        let v4 = Vector::new(vec![0.0, 1.0]);
        assert!(v3.cosine_similarity(&v4).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = Vector::zeros(4);
        assert!(!v.normalize());
        assert!(Vector::new(vec![f32::NAN, 1.0]).normalized().is_none());

        let unit = Vector::new(vec![3.0, 4.0]).normalized().unwrap();
        assert!((unit.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_mean() {
        let a = [1.0, 3.0];
        let b = [3.0, 5.0];
        let mean = Vector::mean([&a[..], &b[..]]).unwrap();
        assert_eq!(mean.as_slice(), &[2.0, 4.0]);

        let c = [1.0];
        assert!(Vector::mean([&a[..], &c[..]]).is_none());
        assert!(Vector::mean(std::iter::empty::<&[f32]>()).is_none());
    }

    #[test]
    fn test_serde_transparent() {
        let v = Vector::new(vec![0.5, -1.0]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "[0.5,-1.0]");
    }
}
