use std::fmt;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A multi-document fragment file must hold header/payload pairs.
    #[error("{file}: expected header/payload document pairs, found {count} documents")]
    OddDocumentCount { file: String, count: usize },

    #[error("{file}: invalid YAML document: {source}")]
    Yaml {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A fragment's own rules demand it both precede and follow the same
    /// other fragment at equal specificity.
    #[error("contradictory ordering: {fragment} must be both before and after {other}")]
    ContradictoryOrder { fragment: String, other: String },

    /// The ordering rules form a cycle. The residual subgraph (everything
    /// that could not be sorted) is preserved for diagnostics.
    #[error("configuration ordering cycle:\n{residual}")]
    Cycle { residual: ResidualGraph },
}

/// The unsortable remainder of the ordering graph: the nodes still standing
/// when the topological sort ran out of roots, plus the edges among them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidualGraph {
    pub nodes: Vec<String>,
    /// `(from, to)` meaning `from` must be processed before `to`.
    pub edges: Vec<(String, String)>,
}

impl fmt::Display for ResidualGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  unsortable fragments: {}", self.nodes.join(", "))?;
        for (from, to) in &self.edges {
            writeln!(f, "    {from} -> {to}")?;
        }
        Ok(())
    }
}
