use thiserror::Error;

pub type SkiffResult<T> = Result<T, SkiffError>;

#[derive(Error, Debug)]
pub enum SkiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("WalkDir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("Invalid delta base: {0}")]
    InvalidDeltaBase(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Package error: {0}")]
    Package(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl SkiffError {
    /// Whether this failure aborts before any filesystem mutation.
    pub fn is_validation(&self) -> bool {
        matches!(self, SkiffError::Validation(_) | SkiffError::Version(_))
    }
}
