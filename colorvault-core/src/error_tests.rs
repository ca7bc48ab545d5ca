/*!
Tests for error handling and error types.
*/

#[cfg(test)]
mod tests {
    use crate::error::VaultError;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_vault_error_display() {
        let error = VaultError::validation("test validation error");
        assert_eq!(error.to_string(), "Validation error: test validation error");

        let error = VaultError::archive("bad central directory");
        assert_eq!(error.to_string(), "Archive error: bad central directory");

        let error = VaultError::Storage("test storage error".to_string());
        assert_eq!(error.to_string(), "Storage error: test storage error");
    }

    #[test]
    fn test_vault_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let vault_error = VaultError::from(io_error);

        match vault_error {
            VaultError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_vault_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let vault_error = VaultError::from(json_error);

        match vault_error {
            VaultError::Json(_) => {}
            _ => panic!("Expected Json error variant"),
        }
    }

    #[test]
    fn test_extraction_error_names_archive_and_cause() {
        let cause = VaultError::archive("invalid zip header");
        let error = VaultError::extraction("comics.cbz", cause);

        let message = error.to_string();
        assert!(message.contains("comics.cbz"));
        assert!(message.contains("invalid zip header"));

        let source = error.source().expect("extraction error keeps its cause");
        assert_eq!(source.to_string(), "Archive error: invalid zip header");
    }

    #[test]
    fn test_extraction_error_wraps_io_cause() {
        let root_cause = io::Error::new(io::ErrorKind::PermissionDenied, "Access denied");
        let error = VaultError::extraction("photos.zip", root_cause);

        match error {
            VaultError::Extraction { ref archive, ref source } => {
                assert_eq!(archive, "photos.zip");
                let io_err = source
                    .downcast_ref::<io::Error>()
                    .expect("cause is an io::Error");
                assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
            }
            _ => panic!("Expected Extraction error"),
        }
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VaultError>();
        assert_sync::<VaultError>();
    }

    #[test]
    fn test_unsupported_format_error() {
        let error = VaultError::UnsupportedFormat("rar".to_string());
        assert!(error.to_string().contains("rar"));
    }

    #[test]
    fn test_error_result_type() {
        fn returns_error() -> crate::Result<()> {
            Err(VaultError::validation("test error"))
        }

        assert!(returns_error().is_err());
    }
}
