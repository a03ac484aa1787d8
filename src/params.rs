use crate::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};

/// Parameters shared by all matchers. Never mutated during a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Do not try the skip-edge interpretations in the adaptive matcher.
    pub disable_node_skipping: bool,

    /// Weight of the node similarity against the relative node mass when the greedy matcher
    /// picks its next anchor pair.
    pub similarity_mass_weight: f64,

    /// Factor applied to the similarity of pairs that break the sibling relation of the last
    /// greedy anchor. 1 disables the penalty.
    pub break_sibling_relation_penalty: f64,

    /// Only pair nodes whose ancestor relation to the last greedy anchor agrees on both sides.
    pub preserve_ancestor_relation: bool,

    /// Weight of the TSV similarity in the greedy similarity matrix.
    pub tsv_similarity_weight: f64,

    /// The topological matcher roots its assignment trees at pairs of level 1 nodes. When set,
    /// pairs of level 0 nodes are tried as well, so graphs without a level 1 get a match.
    pub include_root_nodes: bool,
}

impl Default for MatchParams {
    fn default() -> Self {
        MatchParams {
            disable_node_skipping: false,
            similarity_mass_weight: 0.5,
            break_sibling_relation_penalty: 0.5,
            preserve_ancestor_relation: false,
            tsv_similarity_weight: 0.0,
            include_root_nodes: false,
        }
    }
}

impl MatchParams {
    pub fn validate(&self) -> GraphResult<()> {
        let unit = [
            ("similarity_mass_weight", self.similarity_mass_weight),
            ("break_sibling_relation_penalty", self.break_sibling_relation_penalty),
            ("tsv_similarity_weight", self.tsv_similarity_weight),
        ];

        for &(name, value) in unit.iter() {
            if !(0.0..=1.0).contains(&value) {
                return Err(GraphError::InvalidParams(format!(
                    "{} must be in [0, 1], got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    /// Parses a JSON object. Missing fields keep their default value.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        let params: MatchParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub(crate) fn assert_valid(&self) {
        if let Err(err) = self.validate() {
            panic!("{}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(MatchParams::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let params = MatchParams::from_json(r#"{"disable_node_skipping": true}"#).unwrap();
        assert!(params.disable_node_skipping);
        assert!(!params.include_root_nodes);
        assert_eq!(0.5, params.similarity_mass_weight);
    }

    #[test]
    fn test_out_of_range() {
        let params = MatchParams {
            similarity_mass_weight: 1.5,
            ..MatchParams::default()
        };
        assert!(matches!(params.validate(), Err(GraphError::InvalidParams(_))));
        assert!(MatchParams::from_json(r#"{"tsv_similarity_weight": -1}"#).is_err());
    }
}
