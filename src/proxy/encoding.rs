//! Content-Encoding handling for the widget path.
//!
//! Only the widget handler decodes bodies; passthrough forwards compressed
//! bytes untouched.

use std::io::Read;

use axum::http::{header, HeaderMap};
use bytes::Bytes;
use flate2::read::GzDecoder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported content-encoding: {0}")]
    Unsupported(String),

    #[error("gzip decode failed: {0}")]
    Corrupt(#[from] std::io::Error),

    #[error("decoded body exceeds {0} bytes")]
    TooLarge(usize),
}

/// Body encoding declared by a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Other(String),
}

impl ContentEncoding {
    /// Read the normalized `Content-Encoding` of `headers`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = headers
            .get(header::CONTENT_ENCODING)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).trim().to_ascii_lowercase())
            .unwrap_or_default();
        match value.as_str() {
            "" | "identity" => ContentEncoding::Identity,
            "gzip" => ContentEncoding::Gzip,
            _ => ContentEncoding::Other(value),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, ContentEncoding::Identity)
    }

    /// Decode a fully buffered body, producing at most `limit` bytes.
    ///
    /// The limit only applies to decompressed output; identity bodies are
    /// returned as they are.
    pub fn decode(&self, body: Bytes, limit: usize) -> Result<Bytes, DecodeError> {
        match self {
            ContentEncoding::Identity => Ok(body),
            ContentEncoding::Gzip => {
                let mut decoded = Vec::new();
                GzDecoder::new(body.as_ref())
                    .take((limit as u64).saturating_add(1))
                    .read_to_end(&mut decoded)?;
                if decoded.len() > limit {
                    return Err(DecodeError::TooLarge(limit));
                }
                Ok(Bytes::from(decoded))
            }
            ContentEncoding::Other(name) => Err(DecodeError::Unsupported(name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn with_encoding(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_detection() {
        assert_eq!(ContentEncoding::from_headers(&HeaderMap::new()), ContentEncoding::Identity);
        assert_eq!(ContentEncoding::from_headers(&with_encoding("identity")), ContentEncoding::Identity);
        assert_eq!(ContentEncoding::from_headers(&with_encoding(" GZIP ")), ContentEncoding::Gzip);
        assert_eq!(
            ContentEncoding::from_headers(&with_encoding("br")),
            ContentEncoding::Other("br".into())
        );
    }

    #[test]
    fn test_gzip_decode() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<html>widget</html>").unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = ContentEncoding::Gzip.decode(Bytes::from(compressed), 1024).unwrap();
        assert_eq!(decoded, "<html>widget</html>");
    }

    #[test]
    fn test_corrupt_gzip() {
        let err = ContentEncoding::Gzip
            .decode(Bytes::from_static(b"definitely not gzip"), 1024)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Corrupt(_)));
    }

    #[test]
    fn test_unsupported() {
        let err = ContentEncoding::Other("br".into())
            .decode(Bytes::from_static(b"x"), 1024)
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported content-encoding: br");
    }

    #[test]
    fn test_decoded_size_is_bounded() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&vec![b'a'; 64 * 1024]).unwrap();
        let compressed = Bytes::from(encoder.finish().unwrap());
        assert!(compressed.len() < 1024);

        let err = ContentEncoding::Gzip.decode(compressed.clone(), 4096).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge(4096)));

        let exact = ContentEncoding::Gzip.decode(compressed, 64 * 1024).unwrap();
        assert_eq!(exact.len(), 64 * 1024);
    }
}
