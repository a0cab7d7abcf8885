//! JSON/CSV persistence of records and captures, and URL list loading.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::models::{CapturedMedia, Record};

/// UTF-8 byte order mark, so spreadsheet tools detect the encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const CSV_COLUMNS: [&str; 5] = ["entityName", "entityCode", "title", "timestamp", "detailUrl"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Write records as pretty-printed JSON.
pub fn write_records_json(path: &Path, records: &[Record]) -> Result<(), ExportError> {
    write_json(path, records)
}

/// Write records as CSV with a BOM.
pub fn write_records_csv(path: &Path, records: &[Record]) -> Result<(), ExportError> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(CSV_COLUMNS)?;
    for r in records {
        writer.write_record([
            r.entity_name_str(),
            r.entity_code_str(),
            r.title_str(),
            r.timestamp.as_str(),
            r.detail_url_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write captured media as pretty-printed JSON.
pub fn write_captures_json(path: &Path, media: &[CapturedMedia]) -> Result<(), ExportError> {
    write_json(path, media)
}

/// Read captured media saved by [`write_captures_json`].
pub fn read_captures_json(path: &Path) -> Result<Vec<CapturedMedia>, ExportError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let mut file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut file, value)?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

/// Load URLs from a file: one per line, blank lines and `#` comments skipped.
pub fn load_url_file(path: &Path) -> Result<Vec<String>, ExportError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Split inline URL input on commas and newlines.
pub fn split_url_list(input: &str) -> Vec<String> {
    input
        .split([',', '\n'])
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransportType;

    fn record() -> Record {
        Record {
            title: Some("2023年度业绩说明会".to_string()),
            detail_url: Some("https://rs.p5w.net/html/1.shtml".to_string()),
            timestamp: "2024-05-10 15:00~17:00".to_string(),
            entity_name: Some("毅昌科技".to_string()),
            entity_code: Some("002420".to_string()),
        }
    }

    #[test]
    fn test_records_csv_has_bom_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        write_records_csv(&path, &[record(), Record::default()]).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("entityName,entityCode,title,timestamp,detailUrl")
        );
        assert_eq!(
            lines.next(),
            Some("毅昌科技,002420,2023年度业绩说明会,2024-05-10 15:00~17:00,https://rs.p5w.net/html/1.shtml")
        );
        assert_eq!(lines.next(), Some(",,,,"));
    }

    #[test]
    fn test_records_json_keeps_non_ascii_and_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        write_records_json(&path, &[record()]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"entityCode\": \"002420\""));
        assert!(text.contains("毅昌科技"));
        assert!(text.contains("\"detailUrl\""));
    }

    #[test]
    fn test_captures_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captured.json");
        let media = CapturedMedia {
            media_url: "https://cdn/x.m3u8".to_string(),
            transport_type: TransportType::Manifest,
            referer: Some("https://rs.p5w.net/".to_string()),
            origin: None,
            user_agent: None,
            page_url: "https://rs.p5w.net/html/1.shtml".to_string(),
            page_title: "说明会".to_string(),
        };
        write_captures_json(&path, std::slice::from_ref(&media)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"transportType\": \"manifest\""));
        assert!(!text.contains("userAgent"));
        assert_eq!(read_captures_json(&path).unwrap(), vec![media]);
    }

    #[test]
    fn test_url_file_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(
            &path,
            "# targets\nhttps://a.example/1\n\n   https://a.example/2  \n#https://skip\n",
        )
        .unwrap();
        assert_eq!(
            load_url_file(&path).unwrap(),
            vec!["https://a.example/1", "https://a.example/2"]
        );
    }

    #[test]
    fn test_split_url_list() {
        assert_eq!(
            split_url_list("https://a/1, https://a/2,\nhttps://a/3,,"),
            vec!["https://a/1", "https://a/2", "https://a/3"]
        );
        assert!(split_url_list(" , \n").is_empty());
    }
}
