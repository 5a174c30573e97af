use crate::error::PrepError;

/// A single stored sparse feature.
///
/// `index` is the zero-based column the entry lands in once the file's
/// index base has been resolved, so a one-based `3:0.5` token becomes
/// `FeatureNode { index: 2, value: 0.5 }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureNode {
    /// Zero-based column index.
    pub index: usize,
    /// Feature value.
    pub value: f64,
}

/// A labelled sparse matrix as read from an SVM-light file.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Label (class or regression target) per instance.
    pub labels: Vec<f64>,
    /// Sparse feature vectors, one per instance, columns ascending.
    pub instances: Vec<Vec<FeatureNode>>,
    /// Query ids from `qid:` tokens. Empty when the file carries none,
    /// otherwise one entry per instance (0 where a row has no `qid`).
    pub query_ids: Vec<i64>,
    /// Number of columns of the dense representation.
    pub n_features: usize,
}

impl Dataset {
    /// Number of instances.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Total number of stored (non-implicit) entries.
    pub fn nnz(&self) -> usize {
        self.instances.iter().map(Vec::len).sum()
    }

    /// Select rows by position, in the given order.
    ///
    /// The column count is inherited so that every subset densifies to the
    /// same width as its parent.
    pub fn subset(&self, rows: &[usize]) -> Dataset {
        let query_ids = if self.query_ids.is_empty() {
            Vec::new()
        } else {
            rows.iter().map(|&r| self.query_ids[r]).collect()
        };
        Dataset {
            labels: rows.iter().map(|&r| self.labels[r]).collect(),
            instances: rows.iter().map(|&r| self.instances[r].clone()).collect(),
            query_ids,
            n_features: self.n_features,
        }
    }

    /// Densify into a `len() × n_features` row-major matrix.
    pub fn to_dense(&self) -> Array {
        let cols = self.n_features;
        let mut data = vec![0.0; self.len() * cols];
        for (row, nodes) in data.chunks_exact_mut(cols.max(1)).zip(&self.instances) {
            for node in nodes {
                row[node.index] = node.value;
            }
        }
        Array {
            shape: vec![self.len(), cols],
            data,
        }
    }

    /// Labels as a 1-D array.
    pub fn labels_array(&self) -> Array {
        Array::vector(self.labels.clone())
    }
}

/// A dense, row-major (C order) array of `f64`.
///
/// This is the representation both pipelines exchange: densified feature
/// matrices and label vectors are `Array`s, and so is anything read back
/// from `.npy` or delimited text.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Array {
    /// A 1-D array.
    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// A 2-D array with `rows × cols` elements in row-major order.
    pub fn matrix(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, PrepError> {
        Self::from_shape(vec![rows, cols], data)
    }

    /// An array of arbitrary dimensionality. An empty shape is a scalar.
    pub fn from_shape(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, PrepError> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| PrepError::Shape(format!("shape {:?} overflows", shape)))?;
        if expected != data.len() {
            return Err(PrepError::Shape(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Iterate over the rows of a 1-D or 2-D array.
    ///
    /// A 1-D array yields one single-element row per value, matching how a
    /// label vector is laid out as text. A zero-width matrix yields one
    /// empty row per sample.
    pub fn rows(&self) -> Result<impl Iterator<Item = &[f64]> + '_, PrepError> {
        let (n_rows, width) = match self.shape.as_slice() {
            [n] => (*n, 1),
            [n, cols] => (*n, *cols),
            other => {
                return Err(PrepError::Shape(format!(
                    "expected 1D or 2D array, got {}D array instead",
                    other.len()
                )))
            }
        };
        Ok((0..n_rows).map(move |i| &self.data[i * width..(i + 1) * width]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(index: usize, value: f64) -> FeatureNode {
        FeatureNode { index, value }
    }

    fn tiny() -> Dataset {
        Dataset {
            labels: vec![1.0, -1.0, 1.0],
            instances: vec![
                vec![node(0, 0.5), node(3, -0.25)],
                vec![],
                vec![node(1, 2.0)],
            ],
            query_ids: Vec::new(),
            n_features: 4,
        }
    }

    #[test]
    fn to_dense_places_values_and_fills_zeros() {
        let dense = tiny().to_dense();
        assert_eq!(dense.shape(), &[3, 4]);
        assert_eq!(
            dense.as_slice(),
            &[0.5, 0.0, 0.0, -0.25, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0]
        );
    }

    #[test]
    fn to_dense_of_empty_dataset() {
        let empty = Dataset {
            labels: vec![],
            instances: vec![],
            query_ids: vec![],
            n_features: 0,
        };
        let dense = empty.to_dense();
        assert_eq!(dense.shape(), &[0, 0]);
        assert!(dense.is_empty());
    }

    #[test]
    fn subset_keeps_width_and_order() {
        let ds = tiny();
        let sub = ds.subset(&[2, 0]);
        assert_eq!(sub.labels, vec![1.0, 1.0]);
        assert_eq!(sub.n_features, 4);
        assert_eq!(sub.instances[0], vec![node(1, 2.0)]);
        assert_eq!(sub.to_dense().shape(), &[2, 4]);
    }

    #[test]
    fn subset_carries_query_ids() {
        let mut ds = tiny();
        ds.query_ids = vec![7, 8, 9];
        assert_eq!(ds.subset(&[1, 2]).query_ids, vec![8, 9]);
    }

    #[test]
    fn nnz_counts_stored_entries() {
        assert_eq!(tiny().nnz(), 3);
    }

    #[test]
    fn matrix_rejects_wrong_element_count() {
        let err = Array::matrix(2, 3, vec![0.0; 5]).unwrap_err();
        assert!(format!("{}", err).contains("needs 6 elements"));
    }

    #[test]
    fn rows_of_vector_are_single_values() {
        let v = Array::vector(vec![1.0, 2.0, 3.0]);
        let rows: Vec<&[f64]> = v.rows().unwrap().collect();
        assert_eq!(rows, vec![&[1.0][..], &[2.0][..], &[3.0][..]]);
    }

    #[test]
    fn rows_of_zero_width_matrix_are_empty() {
        let m = Array::matrix(3, 0, Vec::new()).unwrap();
        let rows: Vec<&[f64]> = m.rows().unwrap().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn rows_rejects_three_dimensions() {
        let a = Array::from_shape(vec![1, 1, 2], vec![0.0, 1.0]).unwrap();
        assert!(a.rows().is_err());
        let scalar = Array::from_shape(vec![], vec![1.0]).unwrap();
        assert!(scalar.rows().is_err());
    }
}
