//! Dense singular values for the subtree signatures.

use nalgebra::DMatrix;
use ndarray::ArrayView2;
use std::cmp::Ordering;

/// Anything that can compute the singular values of a dense matrix.
pub trait SingularValues {
    /// Returns all singular values of `m`, sorted in descending order.
    fn singular_values(&self, m: ArrayView2<'_, f64>) -> Vec<f64>;
}

/// Singular values from the SVD of `nalgebra`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenseSvd;

impl SingularValues for DenseSvd {
    fn singular_values(&self, m: ArrayView2<'_, f64>) -> Vec<f64> {
        if m.is_empty() {
            return Vec::new();
        }

        // ndarray iterates in logical row-major order, whatever the memory layout of the view.
        let data: Vec<f64> = m.iter().copied().collect();
        let dm = DMatrix::from_row_slice(m.nrows(), m.ncols(), &data);

        let mut values: Vec<f64> = dm.singular_values().iter().copied().collect();
        values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        values
    }
}

/// Sums the `k` largest singular values of `m`.
pub fn largest_singular_value_sum<S: SingularValues>(solver: &S, m: ArrayView2<'_, f64>, k: usize) -> f64 {
    solver.singular_values(m).into_iter().take(k).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn test_antisymmetric_pair() {
        // A single edge of weight 2: singular values are {2, 2}.
        let m = arr2(&[[0.0, 2.0], [-2.0, 0.0]]);
        let sv = DenseSvd.singular_values(m.view());
        assert_eq!(2, sv.len());
        assert_relative_eq!(2.0, sv[0], epsilon = 1e-10);
        assert_relative_eq!(2.0, sv[1], epsilon = 1e-10);
    }

    #[test]
    fn test_star_with_two_leaves() {
        // root -> a, root -> b with unit weights: singular values sqrt(2), sqrt(2), 0.
        let m = arr2(&[[0.0, 1.0, 1.0], [-1.0, 0.0, 0.0], [-1.0, 0.0, 0.0]]);
        let sv = DenseSvd.singular_values(m.view());
        assert_relative_eq!(2.0_f64.sqrt(), sv[0], epsilon = 1e-10);
        assert_relative_eq!(2.0_f64.sqrt(), sv[1], epsilon = 1e-10);
        assert_relative_eq!(0.0, sv[2], epsilon = 1e-7);
        assert_relative_eq!(
            2.0 * 2.0_f64.sqrt(),
            largest_singular_value_sum(&DenseSvd, m.view(), 2),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_single_entry() {
        let m = arr2(&[[0.0]]);
        let sv = DenseSvd.singular_values(m.view());
        assert_eq!(vec![0.0], sv);
        assert_eq!(0.0, largest_singular_value_sum(&DenseSvd, m.view(), 0));
    }
}
