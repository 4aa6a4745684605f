//! Input loading: files or stdin, text decoding, and scraped-table JSON.
//!
//! The `-` path reads from standard input. Text is decoded with `encoding_rs`
//! and defaults to UTF-8; a leading byte-order mark is dropped.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::tabular::TableCandidate;

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if is_dash(path) {
        std::io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .context("Reading standard input")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut buf)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(buf)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = read_bytes(path)?;
    decode_bytes(&bytes, encoding).with_context(|| format!("Decoding {path:?}"))
}

/// Reads the scraper output: a JSON array of `{headers, rows}` tables.
pub fn read_table_candidates(path: &Path) -> Result<Vec<TableCandidate>> {
    if is_dash(path) {
        let bytes = read_bytes(path)?;
        return serde_json::from_slice(&bytes).context("Parsing table candidates from stdin");
    }
    let file = File::open(path).with_context(|| format!("Opening tables file {path:?}"))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing table candidates from {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn resolve_encoding_defaults_to_utf8() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(resolve_encoding(Some(" latin1 ")).unwrap(), WINDOWS_1252);
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn decode_bytes_handles_legacy_encodings_and_bom() {
        assert_eq!(decode_bytes(b"Caf\xe9", WINDOWS_1252).unwrap(), "Café");
        assert_eq!(decode_bytes(b"\xef\xbb\xbfName", UTF_8).unwrap(), "Name");
        assert!(decode_bytes(b"ab\x80c", UTF_8).is_err());
    }
}
