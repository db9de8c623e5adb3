/// Result of validating an upload filename.
#[derive(Debug)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename is a path traversal pattern (`.` / `..`).
    PathTraversal,
    /// Filename contains null bytes.
    NullByte,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename contains control characters (CR, LF, etc.).
    ControlCharacter,
    /// Filename is longer than the 255-character bound.
    TooLong,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::PathTraversal => "Invalid filename: '.' and '..' are not allowed",
            Self::NullByte => "Invalid filename: null bytes are not allowed",
            Self::Hidden => "Invalid filename: hidden files (starting with '.') are not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::TooLong => "Invalid filename: at most 255 characters are allowed",
        }
    }
}

/// Validates an upload filename.
///
/// The filename becomes part of the object-backend key, so anything that
/// could not serve as a single path component is refused here, before any
/// quota or persistence logic runs.
pub fn validate_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    if trimmed.len() > 255 {
        return Err(FilenameError::TooLong);
    }

    if trimmed.contains('\0') {
        return Err(FilenameError::NullByte);
    }

    // Reject ASCII control characters to prevent
    // HTTP header injection (e.g. CRLF in Content-Disposition).
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if trimmed == "." || trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(validate_filename("report.pdf").is_ok());
        assert!(validate_filename("team photo.png").is_ok());
        assert!(validate_filename("design-v2_final.sketch").is_ok());
        assert!(validate_filename("  padded.txt  ").is_ok());
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(validate_filename("  notes.md ").unwrap(), "notes.md");
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(validate_filename(""), Err(FilenameError::Empty)));
        assert!(matches!(validate_filename("   "), Err(FilenameError::Empty)));
    }

    #[test]
    fn rejects_path_separators() {
        assert!(matches!(
            validate_filename("a/b.txt"),
            Err(FilenameError::ContainsPathSeparator)
        ));
        assert!(matches!(
            validate_filename("a\\b.txt"),
            Err(FilenameError::ContainsPathSeparator)
        ));
    }

    #[test]
    fn rejects_traversal_and_hidden() {
        assert!(matches!(
            validate_filename(".."),
            Err(FilenameError::PathTraversal)
        ));
        assert!(matches!(
            validate_filename("."),
            Err(FilenameError::PathTraversal)
        ));
        assert!(matches!(
            validate_filename(".env"),
            Err(FilenameError::Hidden)
        ));
    }

    #[test]
    fn allows_inner_double_dots() {
        assert!(validate_filename("archive..tar.gz").is_ok());
    }

    #[test]
    fn rejects_null_and_control_characters() {
        assert!(matches!(
            validate_filename("a\0b"),
            Err(FilenameError::NullByte)
        ));
        assert!(matches!(
            validate_filename("a\r\nb.txt"),
            Err(FilenameError::ControlCharacter)
        ));
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(256);
        assert!(matches!(
            validate_filename(&long),
            Err(FilenameError::TooLong)
        ));
    }
}
