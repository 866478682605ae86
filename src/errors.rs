use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Camera or file could not be read. Caller must re-trigger capture.
    #[error("Acquisition error: {0}")]
    Acquisition(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Extraction service error: {0}")]
    Extraction(String),
    #[error("Record update error: {0}")]
    RecordUpdate(String),
    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

impl ScanError {
    /// True for errors raised by a remote collaborator.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ScanError::Extraction(_) | ScanError::RecordUpdate(_) | ScanError::Timeout(_)
        )
    }
}

impl From<image::ImageError> for ScanError {
    fn from(err: image::ImageError) -> Self {
        ScanError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanError::Acquisition("camera busy".to_string());
        assert_eq!(err.to_string(), "Acquisition error: camera busy");

        let err = ScanError::Timeout(30_000);
        assert!(err.to_string().contains("30000 ms"));
    }

    #[test]
    fn test_remote_classification() {
        assert!(ScanError::Extraction("503".into()).is_remote());
        assert!(ScanError::Timeout(10).is_remote());
        assert!(!ScanError::Decode("bad png".into()).is_remote());
        assert!(!ScanError::Acquisition("no file".into()).is_remote());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ScanError = io.into();
        assert!(matches!(err, ScanError::Io(_)));
    }
}
