pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Two files declare the same qualified type name. Fatal: the manifest
    /// refuses to guess which declaration wins.
    #[error("duplicate declaration of {name:?}: first in {first}, again in {second}")]
    DuplicateType {
        name: String,
        first: String,
        second: String,
    },

    /// `extends` edges form a loop (e.g. `A extends B`, `B extends A`).
    #[error("inheritance cycle involving {name:?}")]
    InheritanceCycle { name: String },

    #[error(transparent)]
    Syntax(#[from] strata_syntax::SyntaxError),
}
