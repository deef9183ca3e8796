//! Append-only CSV files shared by the corpus and index ledgers

use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::warn;

use super::StorageError;

type Result<T> = std::result::Result<T, StorageError>;

/// Append `rows` to the ledger at `path` as one durable write
///
/// The whole batch is encoded in memory first, then written with a single call and
/// synced, so a crash leaves either the complete batch or a torn tail that
/// `repair_torn_tail` removes on the next open. The header is written only when the
/// file is new or empty.
pub(crate) fn append_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<usize> {
    if rows.is_empty() {
        return Ok(0);
    }
    ensure_parent(path)?;

    let existing_len = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };

    let buffer = encode(header, rows, existing_len == 0)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&buffer)?;
    file.sync_data()?;
    Ok(rows.len())
}

/// Replace the file at `path` with exactly `rows`, via a temporary file and rename
pub(crate) fn write_rows<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<usize> {
    ensure_parent(path)?;

    let buffer = encode(header, rows, true)?;
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    let mut file = File::create(tmp_path)?;
    file.write_all(&buffer)?;
    file.sync_data()?;
    fs::rename(tmp_path, path)?;
    Ok(rows.len())
}

/// Read every well-formed row; malformed rows are logged and skipped
pub(crate) fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!(
                "Skipping malformed row {} of {}: {}",
                i + 2,
                path.display(),
                e
            ),
        }
    }
    Ok(rows)
}

/// Truncate a final row left without its newline by an interrupted append
///
/// Every append ends on a newline, so a missing one always marks a partial write, even
/// when the cut row still parses. Returns whether the file was changed.
pub(crate) fn repair_torn_tail(path: &Path) -> Result<bool> {
    if !path.exists() || ends_with_newline(path)? {
        return Ok(false);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)?;
    let mut record = csv::ByteRecord::new();
    let mut last_start = 0;
    loop {
        let start = reader.position().byte();
        match reader.read_byte_record(&mut record) {
            Ok(true) => last_start = start,
            Ok(false) => break,
            Err(_) => {
                last_start = start;
                break;
            }
        }
    }

    warn!(
        "Removing torn final row of {} at byte {}",
        path.display(),
        last_start
    );
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(last_start)?;
    file.sync_data()?;
    Ok(true)
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn encode<T: Serialize>(header: &[&str], rows: &[T], with_header: bool) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if with_header {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        url: String,
        text: String,
    }

    fn row(url: &str, text: &str) -> Row {
        Row {
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/ledger.csv");

        append_rows(&path, &["url", "text"], &[row("a", "one")]).unwrap();
        append_rows(&path, &["url", "text"], &[row("b", "two")]).unwrap();
        assert_eq!(append_rows::<Row>(&path, &["url", "text"], &[]).unwrap(), 0);

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("url,text").count(), 1);
        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(rows, vec![row("a", "one"), row("b", "two")]);
    }

    #[test]
    fn test_embedded_delimiters_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let tricky = row("a", "line one,\n\"quoted\" line two");

        append_rows(&path, &["url", "text"], &[tricky]).unwrap();
        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(rows[0].text, "line one,\n\"quoted\" line two");
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Row> = read_rows(&dir.path().join("absent.csv")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_repair_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        append_rows(&path, &["url", "text"], &[row("a", "one"), row("b", "two")]).unwrap();
        let intact = fs::read(&path).unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"c,\"half of a quoted\nfield").unwrap();
        drop(file);

        assert!(repair_torn_tail(&path).unwrap());
        assert_eq!(fs::read(&path).unwrap(), intact);
        assert!(!repair_torn_tail(&path).unwrap());

        append_rows(&path, &["url", "text"], &[row("c", "three")]).unwrap();
        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], row("c", "three"));
    }

    #[test]
    fn test_parseable_row_without_newline_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "url,text\na,one\nb,two thr").unwrap();

        assert!(repair_torn_tail(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "url,text\na,one\n");

        append_rows(&path, &["url", "text"], &[row("c", "three")]).unwrap();
        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(rows, vec![row("a", "one"), row("c", "three")]);
    }

    #[test]
    fn test_write_rows_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.csv");
        append_rows(&path, &["url", "text"], &[row("a", "one"), row("b", "two")]).unwrap();

        write_rows(&path, &["url", "text"], &[row("z", "only")]).unwrap();
        let rows: Vec<Row> = read_rows(&path).unwrap();
        assert_eq!(rows, vec![row("z", "only")]);
    }
}
