use thiserror::Error;

/// Errors that can occur while loading, editing, or exporting an NF-e.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotaError {
    /// The input document is not well-formed XML. Aborts the load; a
    /// previously loaded session is left untouched.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Export precondition failed (e.g. no document loaded).
    #[error("export error: {0}")]
    Export(String),

    /// A user edit was rejected (out-of-range row, empty bulk unit, ...).
    #[error("invalid edit: {0}")]
    Edit(String),
}

impl NotaError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        NotaError::Parse(msg.into())
    }

    pub(crate) fn edit(msg: impl Into<String>) -> Self {
        NotaError::Edit(msg.into())
    }
}
