/// How a summed match score is turned into a graph similarity.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ScoreNorm {
    /// Divide by each node count and keep the minimum.
    Min,

    /// Divide by each node count and take the mean.
    Mean,
}

impl ScoreNorm {
    pub fn normalize(self, sum: f64, n0: usize, n1: usize) -> f64 {
        assert!(n0 > 0 && n1 > 0, "cannot normalize by an empty graph");
        let s0 = sum / n0 as f64;
        let s1 = sum / n1 as f64;

        match self {
            ScoreNorm::Min => s0.min(s1),
            ScoreNorm::Mean => (s0 + s1) / 2.0,
        }
    }
}

#[test]
fn test_normalize() {
    assert_eq!(0.75, ScoreNorm::Min.normalize(3.0, 4, 3));
    assert_eq!(0.875, ScoreNorm::Mean.normalize(3.0, 4, 3));
}
