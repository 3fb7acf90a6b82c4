//! The generic value of a leaf element,
//! as carried by documents and flat tag maps.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// The prefix of data URIs holding arbitrary binary content.
pub const URI_SCHEME_PREFIX_BINARY: &str = "data:application/octet-stream;base64,";

const MIME_BINARY: &str = "application/octet-stream";

/// The value of a leaf element once taken out of a data set.
///
/// A `Null` value stands for content which was absent,
/// left out by policy or could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DicomValue {
    /// no value
    #[default]
    Null,
    /// text in UTF-8
    String(String),
    /// raw bytes
    Binary(Vec<u8>),
}

impl DicomValue {
    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, DicomValue::Null)
    }

    /// Whether this value holds raw bytes.
    pub fn is_binary(&self) -> bool {
        matches!(self, DicomValue::Binary(_))
    }

    /// Obtain the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DicomValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Obtain the content of the value in bytes,
    /// or `None` for the null value.
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            DicomValue::Null => None,
            DicomValue::String(s) => Some(s.as_bytes()),
            DicomValue::Binary(b) => Some(b),
        }
    }

    /// Format a binary value as a data URI.
    ///
    /// ```
    /// # use dcmbridge_json::DicomValue;
    /// let value = DicomValue::Binary(b"DICM".to_vec());
    /// assert_eq!(
    ///     value.to_data_uri().as_deref(),
    ///     Some("data:application/octet-stream;base64,RElDTQ=="),
    /// );
    /// assert_eq!(DicomValue::from("DICM").to_data_uri(), None);
    /// ```
    pub fn to_data_uri(&self) -> Option<String> {
        match self {
            DicomValue::Binary(bytes) => Some(format_data_uri(MIME_BINARY, bytes)),
            _ => None,
        }
    }
}

impl From<&str> for DicomValue {
    fn from(value: &str) -> Self {
        DicomValue::String(value.to_string())
    }
}

impl From<String> for DicomValue {
    fn from(value: String) -> Self {
        DicomValue::String(value)
    }
}

impl From<Vec<u8>> for DicomValue {
    fn from(value: Vec<u8>) -> Self {
        DicomValue::Binary(value)
    }
}

/// Format bytes as a base64 data URI of the given MIME type.
pub fn format_data_uri(mime: &str, content: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(content))
}

/// Parse a base64 data URI into its MIME type and content.
///
/// Returns `None` if the text is not a well formed data URI.
pub fn parse_data_uri(text: &str) -> Option<(String, Vec<u8>)> {
    let rest = text.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    if mime.is_empty() || mime.contains(';') {
        return None;
    }
    if !payload
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
    {
        return None;
    }
    let content = STANDARD.decode(payload).ok()?;
    Some((mime.to_string(), content))
}
