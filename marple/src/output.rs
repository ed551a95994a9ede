//! Serialization of reports to stdout, JSON files and CSV files.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::MarpleError;
use crate::report::{ReportDocument, ReportEntry};

const CSV_HEADER: [&str; 4] = ["source", "url", "title", "junk_score"];

/// Serializes a document with a four-space indent. Non-ASCII text is kept
/// as-is.
pub fn to_pretty_json(document: &ReportDocument) -> Result<String, MarpleError> {
    let mut buf = Vec::new();
    write_pretty(&mut buf, document)?;
    String::from_utf8(buf).map_err(|e| {
        MarpleError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn write_pretty<W: Write, T: Serialize>(writer: W, value: &T) -> Result<(), serde_json::Error> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    value.serialize(&mut serializer)
}

/// Prints the document to a writer, followed by a newline.
pub fn write_json<W: Write>(mut writer: W, document: &ReportDocument) -> Result<(), MarpleError> {
    write_pretty(&mut writer, document)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes the document to `path` and returns the resolved absolute path.
pub fn write_json_file(path: impl AsRef<Path>, document: &ReportDocument) -> Result<PathBuf, MarpleError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| MarpleError::output(path, e))?;
    write_document(path, BufWriter::new(file), document)?;
    resolve(path)
}

/// Writes and flushes the document, attributing IO failures to `path`.
fn write_document<W: Write>(path: &Path, mut writer: W, document: &ReportDocument) -> Result<(), MarpleError> {
    write_pretty(&mut writer, document).map_err(|e| {
        if e.is_io() {
            MarpleError::output(path, e.into())
        } else {
            MarpleError::Serialization(e)
        }
    })?;
    writer.flush().map_err(|e| MarpleError::output(path, e))
}

/// Writes the profile results as CSV and returns the resolved path.
pub fn write_csv_file(path: impl AsRef<Path>, entries: &[ReportEntry]) -> Result<PathBuf, MarpleError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| MarpleError::output(path, e))?;
    let mut writer = BufWriter::new(file);
    write_csv(&mut writer, entries)
        .and_then(|()| writer.flush())
        .map_err(|e| MarpleError::output(path, e))?;
    resolve(path)
}

/// Writes CSV rows with a header line.
pub fn write_csv<W: Write>(mut writer: W, entries: &[ReportEntry]) -> std::io::Result<()> {
    writeln!(writer, "{}", CSV_HEADER.join(","))?;
    for entry in entries {
        let score = entry.junk_score.to_string();
        let row = [
            csv_field(&entry.source),
            csv_field(&entry.url),
            csv_field(&entry.title),
            score,
        ];
        writeln!(writer, "{}", row.join(","))?;
    }
    writer.flush()
}

/// Quotes a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn resolve(path: &Path) -> Result<PathBuf, MarpleError> {
    std::fs::canonicalize(path).map_err(|e| MarpleError::output(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportStatus;
    use pretty_assertions::assert_eq;

    fn document() -> ReportDocument {
        ReportDocument {
            username: "алиса".to_string(),
            results: vec![ReportEntry {
                source: "bing".to_string(),
                url: "https://example.com/alice".to_string(),
                title: "Alice, \"the\" one".to_string(),
                junk_score: 0,
            }],
            pdf_results: Vec::new(),
            status: ReportStatus {
                total_collected_count: 1,
                unique_count: 1,
                displayed_count: 1,
                pdf_count: 0,
            },
        }
    }

    #[test]
    fn test_pretty_json_indent_and_unicode() {
        let json = to_pretty_json(&document()).unwrap();
        assert!(json.starts_with("{\n    \"username\": \"алиса\",\n    \"results\": [\n        {"));
        assert!(json.contains("\"pdf_results\": [],"));
        assert!(!json.contains("\\u"));
    }

    #[test]
    fn test_write_json_adds_newline() {
        let mut buf = Vec::new();
        write_json(&mut buf, &document()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));
        let parsed: ReportDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, document());
    }

    #[test]
    fn test_write_json_file_returns_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");

        let resolved = write_json_file(&path, &document()).unwrap();
        assert!(resolved.is_absolute());

        let text = std::fs::read_to_string(&resolved).unwrap();
        let parsed: ReportDocument = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, document());
    }

    #[test]
    fn test_write_json_file_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("result.json");

        let err = write_json_file(&path, &document()).unwrap_err();
        assert!(matches!(err, MarpleError::Output { .. }));
        assert!(err.to_string().contains("result.json"));
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_names_target_path() {
        let path = Path::new("/tmp/marple/result.json");
        let err = write_document(path, FullDisk, &document()).unwrap_err();
        match err {
            MarpleError::Output { ref path, .. } => assert_eq!(path, Path::new("/tmp/marple/result.json")),
            ref other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("result.json"));
    }

    #[test]
    fn test_csv_quoting() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &document().results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "source,url,title,junk_score\nbing,https://example.com/alice,\"Alice, \"\"the\"\" one\",0\n"
        );
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.csv");
        let resolved = write_csv_file(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(resolved).unwrap(),
            "source,url,title,junk_score\n"
        );
    }
}
