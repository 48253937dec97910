use log::warn;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::DataFormat;
use crate::error::Result;

/// A label as it appears in the source file, before normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawLabel {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawLabel {
    pub fn is_text(&self) -> bool {
        matches!(self, RawLabel::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecord {
    pub text: String,
    pub label: RawLabel,
}

pub fn load_records<P: AsRef<Path>>(path: P, format: DataFormat) -> Result<Vec<RawRecord>> {
    match format {
        DataFormat::Jsonl => {
            let file = File::open(path)?;
            read_jsonl(BufReader::new(file))
        }
        DataFormat::Csv => load_csv(path),
    }
}

/// One JSON object per line. Lines that are not valid UTF-8 or do not parse into
/// `{text, label}` are skipped with a warning.
pub fn read_jsonl<R: BufRead>(mut reader: R) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        match serde_json::from_slice::<RawRecord>(&buf) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping malformed line {}: {}", line_no, e),
        }
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    text: String,
    label: String,
}

/// Reads the `text` and `label` columns. A label column where every value
/// parses as a number yields numeric labels; otherwise all labels are strings.
fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<CsvRow>, csv::Error>>()?;

    let numeric = rows.iter().all(|row| row.label.trim().parse::<f64>().is_ok());

    Ok(rows
        .into_iter()
        .map(|row| {
            let label = if numeric {
                let value = row.label.trim();
                match value.parse::<i64>() {
                    Ok(n) => RawLabel::Integer(n),
                    Err(_) => RawLabel::Float(value.parse::<f64>().unwrap_or_default()),
                }
            } else {
                RawLabel::Text(row.label)
            };
            RawRecord { text: row.text, label }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn jsonl_skips_bad_lines_and_keeps_order() {
        let input = concat!(
            "{\"text\": \"great film\", \"label\": \"pos\"}\n",
            "not json at all\n",
            "{\"text\": \"missing label\"}\n",
            "{\"text\": \"dull\", \"label\": 0}\n",
            "{\"text\": \"fine\", \"label\": 1.0}\n",
        );
        let records = read_jsonl(Cursor::new(input)).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text, "great film");
        assert_eq!(records[0].label, RawLabel::Text("pos".to_string()));
        assert_eq!(records[1].label, RawLabel::Integer(0));
        assert_eq!(records[2].label, RawLabel::Float(1.0));
    }

    #[test]
    fn jsonl_skips_lines_that_are_not_utf8() {
        let mut input = b"{\"text\": \"first\", \"label\": 1}\n".to_vec();
        input.extend_from_slice(b"{\"text\": \"bad \xff\", \"label\": 0}\n");
        input.extend_from_slice(b"{\"text\": \"last\", \"label\": 0}\n");

        let records = read_jsonl(Cursor::new(input)).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "first");
        assert_eq!(records[1].text, "last");
    }

    #[test]
    fn jsonl_of_only_garbage_is_empty_not_an_error() {
        let records = read_jsonl(Cursor::new("{\n}\n[]\n")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn csv_numeric_column_gives_numeric_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "id,text,label\n1,\"hello, world\",1\n2,bye,0\n").unwrap();

        let records = load_records(&path, DataFormat::Csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "hello, world");
        assert_eq!(records[0].label, RawLabel::Integer(1));
        assert_eq!(records[1].label, RawLabel::Integer(0));
    }

    #[test]
    fn csv_mixed_column_gives_text_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "text,label\na,1\nb,spam\n").unwrap();

        let records = load_records(&path, DataFormat::Csv).unwrap();
        assert!(records.iter().all(|r| r.label.is_text()));
    }

    #[test]
    fn csv_without_label_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "text,category\na,x\n").unwrap();

        assert!(load_records(&path, DataFormat::Csv).is_err());
    }
}
