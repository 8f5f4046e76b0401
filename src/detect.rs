//! Input format detection for annotation dumps.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Serialized form of a page-range annotation dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Plain JSON
    Json,
    /// Gzip-compressed JSON
    GzipJson,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFormat::Json => write!(f, "JSON"),
            InputFormat::GzipJson => write!(f, "JSON (gzip)"),
        }
    }
}

/// Gzip magic bytes.
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
/// UTF-8 byte order mark some exporters prepend.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Detect the input format from a file path.
///
/// # Example
/// ```no_run
/// use pagestruct::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("pages.json.gz").unwrap();
/// println!("Input: {}", format);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<InputFormat> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(64);
    BufReader::new(file).take(64).read_to_end(&mut header)?;
    detect_format_from_bytes(&header)
}

/// Detect the input format from the leading bytes of a file.
///
/// # Returns
/// * `Ok(InputFormat)` for gzip data or data whose first non-whitespace byte opens a JSON object
/// * `Err(Error::UnknownFormat)` otherwise
pub fn detect_format_from_bytes(data: &[u8]) -> Result<InputFormat> {
    if data.starts_with(GZIP_MAGIC) {
        return Ok(InputFormat::GzipJson);
    }

    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    match data.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') => Ok(InputFormat::Json),
        _ => Err(Error::UnknownFormat),
    }
}

/// Check if a file looks like a readable annotation dump.
pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_json() {
        let data = b"  \n{\"pages\": []}";
        assert_eq!(detect_format_from_bytes(data).unwrap(), InputFormat::Json);
    }

    #[test]
    fn test_detect_json_with_bom() {
        let data = b"\xEF\xBB\xBF{}";
        assert_eq!(detect_format_from_bytes(data).unwrap(), InputFormat::Json);
    }

    #[test]
    fn test_detect_gzip() {
        let data = [0x1f, 0x8b, 0x08, 0x00];
        assert_eq!(detect_format_from_bytes(&data).unwrap(), InputFormat::GzipJson);
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_format_from_bytes(b"%PDF-1.7");
        assert!(matches!(result, Err(Error::UnknownFormat)));

        let result = detect_format_from_bytes(b"");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }

    #[test]
    fn test_is_supported_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.json");
        std::fs::write(&path, "{\"pages\": []}").unwrap();
        assert!(is_supported(&path));
        assert!(!is_supported(dir.path().join("missing.json")));
    }
}
