//! Byte decoding with charset detection.
//!
//! Uploaded files arrive as bytes. Decoding tries an ordered list of named
//! strategies and keeps the first one that succeeds.

use encoding_rs::Encoding;

use crate::error::CsvError;

/// Text decoded from raw bytes, with the charset that was used.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: String,
}

/// Ways of turning bytes into text, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Strict UTF-8 (BOM stripped).
    Utf8,
    /// Charset reported by `chardet`, decoded without replacement characters.
    Detected,
    /// Windows-1252, which maps every byte and therefore never fails.
    Windows1252,
}

impl DecodeStrategy {
    pub const ORDER: [DecodeStrategy; 3] = [
        DecodeStrategy::Utf8,
        DecodeStrategy::Detected,
        DecodeStrategy::Windows1252,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DecodeStrategy::Utf8 => "utf-8",
            DecodeStrategy::Detected => "detected",
            DecodeStrategy::Windows1252 => "windows-1252",
        }
    }

    fn attempt(&self, bytes: &[u8]) -> Result<Decoded, String> {
        match self {
            DecodeStrategy::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                std::str::from_utf8(bytes)
                    .map(|s| Decoded {
                        text: s.to_string(),
                        encoding: "utf-8".to_string(),
                    })
                    .map_err(|e| e.to_string())
            }
            DecodeStrategy::Detected => {
                let label = detect_encoding(bytes);
                let encoding = Encoding::for_label(label.as_bytes())
                    .ok_or_else(|| format!("unknown charset '{}'", label))?;
                let (text, _, had_errors) = encoding.decode(bytes);
                if had_errors {
                    return Err(format!("invalid {} sequence", label));
                }
                Ok(Decoded {
                    text: text.into_owned(),
                    encoding: label,
                })
            }
            DecodeStrategy::Windows1252 => {
                let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
                Ok(Decoded {
                    text: text.into_owned(),
                    encoding: "windows-1252".to_string(),
                })
            }
        }
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "" => "utf-8".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes by trying each [`DecodeStrategy`] in order.
pub fn decode_bytes(bytes: &[u8]) -> Result<Decoded, CsvError> {
    let mut failures = Vec::new();

    for strategy in DecodeStrategy::ORDER {
        match strategy.attempt(bytes) {
            Ok(decoded) => return Ok(decoded),
            Err(reason) => failures.push(format!("{}: {}", strategy.name(), reason)),
        }
    }

    Err(CsvError::EncodingError(failures.join("; ")))
}
