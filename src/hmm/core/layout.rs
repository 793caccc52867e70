//! Free-parameter layout: mapping between a model and the flat vector θ.
//!
//! Purpose
//! -------
//! Fix, once per starting model, which probability entries are free and
//! where each lives in θ, so packing, unpacking, gradient assembly, and the
//! degrees-of-freedom count all iterate the same block list.
//!
//! Key behaviors
//! -------------
//! - Each probability row keeps its **support** (entries that are nonzero in
//!   the starting values). Entries outside the support are structural zeros
//!   and stay exactly zero through every unpack.
//! - One support entry per row is the **reference**: the largest starting
//!   value, lowest index on ties. Its logit is pinned at zero; the other
//!   support entries are free.
//! - Block order in θ: every cluster's transition rows, then every
//!   cluster's emission rows (cluster, channel, row), then every cluster's
//!   initial vector, then the coefficients of clusters `1..K` (`q` entries
//!   each, `Γ[0..q, k]`).
//!
//! Invariants & assumptions
//! ------------------------
//! - `n_params()` equals the degrees of freedom of the model.
//! - A layout is only valid for models with the same shapes as the one it
//!   was built from.
//!
//! Conventions
//! -----------
//! - Rows are packed with floored log-ratios (`safe_logit`) and unpacked with
//!   `safe_softmax` over the support.
use crate::{
    hmm::{
        core::{model::Model, params::HmmParams, posterior::ClusterTables, validation::validate_theta},
        errors::HmmResult,
    },
    optimization::numerical_stability::{safe_logit, safe_softmax, safe_softmax_deriv},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};

/// Support, reference, and free entries of one probability row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowLayout {
    pub support: Vec<usize>,
    pub reference: usize,
    pub free: Vec<usize>,
}

impl RowLayout {
    pub fn from_row(row: ArrayView1<f64>) -> RowLayout {
        let support: Vec<usize> =
            row.iter().enumerate().filter(|(_, p)| **p > 0.0).map(|(j, _)| j).collect();
        let mut reference = support[0];
        for &j in &support[1..] {
            if row[j] > row[reference] {
                reference = j;
            }
        }
        let free = support.iter().copied().filter(|&j| j != reference).collect();
        RowLayout { support, reference, free }
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    /// Probability row of length `len` from the free logits of this row.
    pub fn unpack(&self, logits: ArrayView1<f64>, len: usize) -> Array1<f64> {
        let mut full = Array1::from_elem(len, f64::NEG_INFINITY);
        full[self.reference] = 0.0;
        for (&j, &value) in self.free.iter().zip(logits.iter()) {
            full[j] = value;
        }
        safe_softmax(full.view())
    }
}

/// Which probability row a block refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Transition { cluster: usize, row: usize },
    Emission { cluster: usize, channel: usize, row: usize },
    Initial { cluster: usize },
}

impl BlockKind {
    pub fn row<'a>(&self, clusters: &'a [HmmParams]) -> ArrayView1<'a, f64> {
        match *self {
            BlockKind::Transition { cluster, row } => clusters[cluster].transition.row(row),
            BlockKind::Emission { cluster, channel, row } => {
                clusters[cluster].emissions[channel].row(row)
            }
            BlockKind::Initial { cluster } => clusters[cluster].initial.view(),
        }
    }

    pub fn row_mut<'a>(&self, clusters: &'a mut [HmmParams]) -> ArrayViewMut1<'a, f64> {
        match *self {
            BlockKind::Transition { cluster, row } => clusters[cluster].transition.row_mut(row),
            BlockKind::Emission { cluster, channel, row } => {
                clusters[cluster].emissions[channel].row_mut(row)
            }
            BlockKind::Initial { cluster } => clusters[cluster].initial.view_mut(),
        }
    }

    /// The matching row of an accumulator table.
    pub fn table_row<'a>(&self, tables: &'a [ClusterTables]) -> ArrayView1<'a, f64> {
        match *self {
            BlockKind::Transition { cluster, row } => tables[cluster].transition.row(row),
            BlockKind::Emission { cluster, channel, row } => {
                tables[cluster].emissions[channel].row(row)
            }
            BlockKind::Initial { cluster } => tables[cluster].initial.view(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbBlock {
    pub kind: BlockKind,
    pub layout: RowLayout,
    /// Position of the block's first free entry in θ.
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamLayout {
    blocks: Vec<ProbBlock>,
    coef_offset: usize,
    n_covariates: usize,
    n_clusters: usize,
}

impl ParamLayout {
    /// Record supports and references from the starting values of `model`.
    pub fn from_model(model: &Model) -> ParamLayout {
        let clusters = model.clusters();
        let mut kinds = Vec::new();
        for (cluster, params) in clusters.iter().enumerate() {
            for row in 0..params.n_states() {
                kinds.push(BlockKind::Transition { cluster, row });
            }
        }
        for (cluster, params) in clusters.iter().enumerate() {
            for channel in 0..params.n_channels() {
                for row in 0..params.n_states() {
                    kinds.push(BlockKind::Emission { cluster, channel, row });
                }
            }
        }
        for cluster in 0..clusters.len() {
            kinds.push(BlockKind::Initial { cluster });
        }

        let mut offset = 0;
        let blocks = kinds
            .into_iter()
            .map(|kind| {
                let layout = RowLayout::from_row(kind.row(clusters));
                let block = ProbBlock { kind, layout, offset };
                offset += block.layout.n_free();
                block
            })
            .collect();
        ParamLayout {
            blocks,
            coef_offset: offset,
            n_covariates: model.n_covariates(),
            n_clusters: model.n_clusters(),
        }
    }

    pub fn blocks(&self) -> &[ProbBlock] {
        &self.blocks
    }

    /// Position of the first coefficient in θ.
    pub fn coef_offset(&self) -> usize {
        self.coef_offset
    }

    /// Length of θ, which is also the model's degrees of freedom.
    pub fn n_params(&self) -> usize {
        self.coef_offset + self.n_covariates * self.n_clusters.saturating_sub(1)
    }

    /// Pack the current values of `model` into θ.
    pub fn to_theta(&self, model: &Model) -> Array1<f64> {
        let clusters = model.clusters();
        let mut theta = Array1::<f64>::zeros(self.n_params());
        for block in &self.blocks {
            let row = block.kind.row(clusters);
            let p_ref = row[block.layout.reference];
            for (k, &j) in block.layout.free.iter().enumerate() {
                theta[block.offset + k] = safe_logit(row[j], p_ref);
            }
        }
        if let Some(gamma) = model.coefficients() {
            let q = self.n_covariates;
            for k in 1..self.n_clusters {
                for j in 0..q {
                    theta[self.coef_offset + (k - 1) * q + j] = gamma[[j, k]];
                }
            }
        }
        theta
    }

    /// Overwrite the parameters of `model` with the values encoded in θ.
    ///
    /// # Errors
    /// - [`HmmError::ThetaLengthMismatch`](crate::hmm::errors::HmmError::ThetaLengthMismatch)
    ///   / [`HmmError::InvalidThetaInput`](crate::hmm::errors::HmmError::InvalidThetaInput)
    ///   from [`validate_theta`].
    pub fn apply_theta(&self, model: &mut Model, theta: ArrayView1<f64>) -> HmmResult<()> {
        validate_theta(theta, self.n_params())?;
        let clusters = model.clusters_mut();
        for block in &self.blocks {
            let n_free = block.layout.n_free();
            let logits = theta.slice(ndarray::s![block.offset..block.offset + n_free]);
            let mut row = block.kind.row_mut(clusters);
            let len = row.len();
            row.assign(&block.layout.unpack(logits, len));
        }
        if let Model::Mixture(mix) = model {
            let q = self.n_covariates;
            for k in 1..self.n_clusters {
                for j in 0..q {
                    mix.coefficients[[j, k]] = theta[self.coef_offset + (k - 1) * q + j];
                }
            }
        }
        Ok(())
    }

    /// A copy of `base` carrying the parameters encoded in θ.
    pub fn model_from_theta(&self, base: &Model, theta: ArrayView1<f64>) -> HmmResult<Model> {
        let mut model = base.clone();
        self.apply_theta(&mut model, theta)?;
        Ok(model)
    }

    /// Coefficient block of θ reshaped to `q × K` with a zero baseline column.
    pub fn coefficients_from_theta(&self, theta: ArrayView1<f64>) -> Array2<f64> {
        let q = self.n_covariates;
        Array2::from_shape_fn((q, self.n_clusters), |(j, k)| {
            if k == 0 { 0.0 } else { theta[self.coef_offset + (k - 1) * q + j] }
        })
    }

    /// Gradient of ℓ with respect to θ.
    ///
    /// `raw` holds `∂ℓ/∂p` for every probability entry (responsibility
    /// weighted and summed over subjects); each row is pushed through the
    /// softmax Jacobian of its current values. `coef_grad` is the `q × K`
    /// coefficient gradient; its baseline column is ignored.
    pub fn gradient(
        &self, clusters: &[HmmParams], raw: &[ClusterTables], coef_grad: Option<ArrayView2<f64>>,
    ) -> Array1<f64> {
        let mut grad = Array1::<f64>::zeros(self.n_params());
        for block in &self.blocks {
            let p = block.kind.row(clusters);
            let g = block.kind.table_row(raw);
            let d = safe_softmax_deriv(p, g);
            for (k, &j) in block.layout.free.iter().enumerate() {
                grad[block.offset + k] = d[j];
            }
        }
        if let Some(coef) = coef_grad {
            let q = self.n_covariates;
            for k in 1..self.n_clusters {
                for j in 0..q {
                    grad[self.coef_offset + (k - 1) * q + j] = coef[[j, k]];
                }
            }
        }
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Reference selection (largest value, lowest index on ties).
    // - Block offsets and the degrees-of-freedom count.
    // - Structural zeros surviving arbitrary θ.
    // - Packing followed by unpacking reproducing the model.
    //
    // They intentionally DO NOT cover:
    // - Gradient correctness, checked end to end against finite differences
    //   in the objective tests.
    // -------------------------------------------------------------------------

    fn left_to_right() -> HmmParams {
        HmmParams::new(
            array![[0.6, 0.4, 0.0], [0.0, 0.7, 0.3], [0.0, 0.0, 1.0]],
            vec![array![[0.5, 0.5], [0.25, 0.75], [0.9, 0.1]]],
            array![1.0, 0.0, 0.0],
        )
        .expect("valid parameters")
    }

    #[test]
    fn reference_is_largest_entry_with_lowest_index_on_ties() {
        let layout = RowLayout::from_row(array![0.3, 0.0, 0.35, 0.35].view());
        assert_eq!(layout.support, vec![0, 2, 3]);
        assert_eq!(layout.reference, 2);
        assert_eq!(layout.free, vec![0, 3]);
    }

    #[test]
    // Purpose
    // -------
    // Count free parameters for a left-to-right chain and a covariate mixture.
    //
    // Given
    // -----
    // - Cluster with transition support sizes (2, 2, 1), emission rows of
    //   width 2, and a degenerate initial vector.
    // - A two-cluster mixture of that chain with q = 2.
    //
    // Expect
    // ------
    // - Single: (1 + 1 + 0) + 3 · 1 + 0 = 5.
    // - Mixture: 2 · 5 + (2 − 1) · 2 = 12, coefficients starting at 10.
    fn n_params_counts_free_entries_and_coefficients() {
        // Arrange
        let single = Model::Single(left_to_right());
        let mixture = Model::mixture(
            vec![left_to_right(), left_to_right()],
            array![[1.0, 0.0], [1.0, 1.0]],
            array![[0.0, 0.5], [0.0, -1.0]],
        )
        .expect("valid mixture");

        // Act
        let single_layout = ParamLayout::from_model(&single);
        let mixture_layout = ParamLayout::from_model(&mixture);

        // Assert
        assert_eq!(single_layout.n_params(), 5);
        assert_eq!(mixture_layout.n_params(), 12);
        assert_eq!(mixture_layout.coef_offset(), 10);
        // Emission blocks of cluster 0 follow all transition blocks.
        let first_emission = mixture_layout
            .blocks()
            .iter()
            .find(|b| matches!(b.kind, BlockKind::Emission { .. }))
            .expect("emission block");
        assert_eq!(first_emission.kind, BlockKind::Emission { cluster: 0, channel: 0, row: 0 });
        assert_eq!(first_emission.offset, 4);
    }

    #[test]
    // Purpose
    // -------
    // Ensure structural zeros stay exactly zero for any θ.
    //
    // Given
    // -----
    // - The left-to-right chain and a θ of large, mixed-sign values.
    //
    // Expect
    // ------
    // - Forbidden transitions and the zero initial entries remain 0.0; every
    //   row still sums to one.
    fn apply_theta_preserves_structural_zeros() {
        // Arrange
        let mut model = Model::Single(left_to_right());
        let layout = ParamLayout::from_model(&model);
        let theta = array![12.0, -30.0, 4.0, -2.5, 0.7];

        // Act
        layout.apply_theta(&mut model, theta.view()).expect("valid theta");

        // Assert
        let params = &model.clusters()[0];
        assert_eq!(params.transition[[0, 2]], 0.0);
        assert_eq!(params.transition[[1, 0]], 0.0);
        assert_eq!(params.transition[[2, 0]], 0.0);
        assert_eq!(params.transition[[2, 1]], 0.0);
        assert_eq!(params.initial, array![1.0, 0.0, 0.0]);
        for row in params.transition.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn packing_then_unpacking_reproduces_model() {
        let model = Model::mixture(
            vec![left_to_right(), left_to_right()],
            array![[1.0, 0.2], [1.0, -0.4]],
            array![[0.0, 0.3], [0.0, -1.2]],
        )
        .expect("valid mixture");
        let layout = ParamLayout::from_model(&model);
        let theta = layout.to_theta(&model);
        let rebuilt = layout.model_from_theta(&model, theta.view()).expect("valid theta");
        for (a, b) in model.clusters().iter().zip(rebuilt.clusters()) {
            assert!((&a.transition - &b.transition).iter().all(|d| d.abs() < 1e-12));
            assert!((&a.emissions[0] - &b.emissions[0]).iter().all(|d| d.abs() < 1e-12));
        }
        assert_eq!(rebuilt.coefficients(), model.coefficients());
        assert_eq!(layout.coefficients_from_theta(theta.view()), array![[0.0, 0.3], [0.0, -1.2]]);
    }

    #[test]
    fn apply_theta_rejects_wrong_length() {
        let mut model = Model::Single(left_to_right());
        let layout = ParamLayout::from_model(&model);
        let err = layout.apply_theta(&mut model, array![0.0, 1.0].view()).unwrap_err();
        assert_eq!(
            err,
            crate::hmm::errors::HmmError::ThetaLengthMismatch { expected: 5, actual: 2 }
        );
    }
}
