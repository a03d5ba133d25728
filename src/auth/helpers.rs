#[derive(Debug, PartialEq, Eq)]
pub enum TokenExtractionError {
    InvalidScheme,
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
/// Returns None if no auth header is present.
pub fn extract_token_from_header(
    auth_header: Option<&str>,
) -> Result<Option<String>, TokenExtractionError> {
    match auth_header {
        Some(header) => match header.strip_prefix("Bearer ") {
            Some(token) => Ok(Some(token.trim().to_string())),
            None => Err(TokenExtractionError::InvalidScheme),
        },
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(
            extract_token_from_header(Some("Bearer archilog_abc_def")).unwrap(),
            Some("archilog_abc_def".to_string())
        );
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(extract_token_from_header(None).unwrap(), None);
    }

    #[test]
    fn test_other_scheme_rejected() {
        assert_eq!(
            extract_token_from_header(Some("Basic eC10b2tlbjp4")),
            Err(TokenExtractionError::InvalidScheme)
        );
    }
}
