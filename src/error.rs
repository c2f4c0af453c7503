use std::path::PathBuf;

/// Why an artifact could not be turned into a record.
///
/// Never reaches an HTTP caller: the store logs it and substitutes the
/// artifact's default.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl ArtifactError {
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            ArtifactError::Unreadable { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
