//! Source encoding detection and write-back encoding.

use crate::error::{Result, VaultError};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use std::path::Path;

/// How a note was stored on disk and how it will be written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceEncoding {
    /// Encoding used when writing the note back.
    pub encoding: &'static Encoding,
    /// Whether the file started with a UTF-8 byte order mark.
    pub bom: bool,
    /// The file was converted to the canonical encoding (UTF-8) at load
    /// time, so the first commit rewrites it in UTF-8.
    pub reencoded: bool,
}

impl SourceEncoding {
    pub fn utf8() -> Self {
        Self {
            encoding: UTF_8,
            bom: false,
            reencoded: false,
        }
    }

    /// Name of the encoding used for write-back.
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

impl Default for SourceEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Decode a note's bytes.
///
/// - UTF-8, with or without BOM, is kept as is.
/// - UTF-16 (detected by BOM) is decoded and flagged as re-encoded.
/// - Anything else that is not valid UTF-8 is read as Windows-1252.
///
/// Binary content (NUL bytes) and malformed UTF-16 are rejected.
pub fn decode(bytes: &[u8], path: &Path) -> Result<(String, SourceEncoding)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let body = &bytes[bom_len..];
        if encoding == UTF_8 {
            let text = utf8_text(body, path)?;
            return Ok((
                text,
                SourceEncoding {
                    encoding: UTF_8,
                    bom: true,
                    reencoded: false,
                },
            ));
        }

        let (text, had_errors) = encoding.decode_without_bom_handling(body);
        if had_errors {
            return Err(encoding_error(path, format!("malformed {} content", encoding.name())));
        }
        reject_binary(&text, path)?;
        return Ok((
            text.into_owned(),
            SourceEncoding {
                encoding: UTF_8,
                bom: false,
                reencoded: true,
            },
        ));
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        reject_binary(text, path)?;
        return Ok((text.to_string(), SourceEncoding::utf8()));
    }

    if bytes.contains(&0) {
        return Err(encoding_error(path, "binary content".to_string()));
    }
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    tracing::debug!(path = %path.display(), "decoded as windows-1252");
    Ok((
        text.into_owned(),
        SourceEncoding {
            encoding: WINDOWS_1252,
            bom: false,
            reencoded: false,
        },
    ))
}

/// Encode text for writing back in the note's resolved encoding.
pub fn encode(text: &str, source: &SourceEncoding, path: &Path) -> Result<Vec<u8>> {
    if source.encoding == UTF_8 {
        let mut out = Vec::with_capacity(text.len() + 3);
        if source.bom {
            out.extend_from_slice(b"\xEF\xBB\xBF");
        }
        out.extend_from_slice(text.as_bytes());
        return Ok(out);
    }

    let (bytes, _, had_unmappable) = source.encoding.encode(text);
    if had_unmappable {
        return Err(encoding_error(
            path,
            format!("text cannot be represented in {}", source.encoding.name()),
        ));
    }
    Ok(bytes.into_owned())
}

fn utf8_text(bytes: &[u8], path: &Path) -> Result<String> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| encoding_error(path, format!("invalid UTF-8 after BOM: {}", e)))?;
    reject_binary(text, path)?;
    Ok(text.to_string())
}

fn reject_binary(text: &str, path: &Path) -> Result<()> {
    if text.contains('\0') {
        return Err(encoding_error(path, "binary content".to_string()));
    }
    Ok(())
}

fn encoding_error(path: &Path, message: String) -> VaultError {
    VaultError::Encoding {
        path: path.to_path_buf(),
        message,
    }
}
