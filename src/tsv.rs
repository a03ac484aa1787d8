use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// Topological signature vector of a node.
///
/// One entry per child: the subtree signature of that child. Entries are kept in descending
/// order so that two vectors can be compared element-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tsv {
    values: Vec<f64>,
}

impl Tsv {
    pub fn new(mut values: Vec<f64>) -> Tsv {
        debug_assert!(values.iter().all(|v| *v >= 0.0 || v.abs() < 1e-9));
        values.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        Tsv { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// L2 norm.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

impl<'a> Sub for &'a Tsv {
    type Output = Tsv;

    /// Element-wise difference. The shorter vector is padded with zeros.
    fn sub(self, rhs: &'a Tsv) -> Tsv {
        let n = self.len().max(rhs.len());
        let values = (0..n)
            .map(|i| {
                let a = self.values.get(i).copied().unwrap_or(0.0);
                let b = rhs.values.get(i).copied().unwrap_or(0.0);
                a - b
            })
            .collect();
        Tsv { values }
    }
}

/// Structural similarity of two signature vectors in `[0, 1]`.
///
/// `1 - |a - b| / max(|a|, |b|)`; two empty (or zero) vectors are identical, and a difference
/// larger than the normalization factor yields 0.
pub fn tsv_similarity(a: &Tsv, b: &Tsv) -> f64 {
    let na = a.norm();
    let nb = b.norm();

    if na == 0.0 && nb == 0.0 {
        return 1.0;
    }

    let diff = (a - b).norm();
    let max = na.max(nb);

    if diff > max {
        0.0
    } else {
        1.0 - diff / max
    }
}

#[test]
fn test_tsv_sorted_and_norm() {
    let t = Tsv::new(vec![1.0, 3.0, 2.0]);
    assert_eq!(&[3.0, 2.0, 1.0], t.values());
    assert_eq!(14.0_f64.sqrt(), t.norm());
}

#[test]
fn test_tsv_similarity() {
    let a = Tsv::new(vec![2.0, 1.0]);
    let b = Tsv::new(vec![2.0]);
    assert_eq!(1.0, tsv_similarity(&a, &a));
    assert_eq!(1.0, tsv_similarity(&Tsv::default(), &Tsv::default()));
    // |(0, 1)| / |(2, 1)|
    let expected = 1.0 - 1.0 / 5.0_f64.sqrt();
    assert!((tsv_similarity(&a, &b) - expected).abs() < 1e-12);
    assert_eq!(0.0, tsv_similarity(&Tsv::new(vec![1.0]), &Tsv::default()));
}
