use crate::adapters::delimited::{decode_fields, encode_line, header_line, DELIMITER};
use crate::domain::model::{ColumnLayout, UserRecord};
use crate::domain::ports::{ItemReader, ItemWriter};
use crate::utils::error::{BatchError, Result};
use async_trait::async_trait;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// 輸入檔第一行一律視為標題，不檢查內容
pub const INPUT_LINES_TO_SKIP: u64 = 1;

/// Streams records out of a comma-delimited file one line at a time.
///
/// The leading lines are skipped as raw text, blank ones included, before
/// any parsing. Blank lines after that produce no record.
pub struct CsvFileReader {
    reader: csv::Reader<BufReader<File>>,
    layout: ColumnLayout,
    row: csv::StringRecord,
}

impl CsvFileReader {
    /// Opens `path` and discards its header line.
    pub fn open(path: impl AsRef<Path>, layout: ColumnLayout) -> Result<Self> {
        Self::open_skipping(path, layout, INPUT_LINES_TO_SKIP)
    }

    pub fn open_skipping(path: impl AsRef<Path>, layout: ColumnLayout, lines_to_skip: u64) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            BatchError::input_format(format!("cannot open input file {}: {}", path.display(), e))
        })?;

        let mut input = BufReader::new(file);
        let mut discarded = Vec::new();
        for _ in 0..lines_to_skip {
            discarded.clear();
            if input.read_until(b'\n', &mut discarded)? == 0 {
                break;
            }
        }

        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(DELIMITER)
            .from_reader(input);

        tracing::debug!(
            "📂 Opened input file {} ({} header line(s) skipped)",
            path.display(),
            lines_to_skip
        );

        Ok(Self {
            reader,
            layout,
            row: csv::StringRecord::new(),
        })
    }
}

#[async_trait]
impl ItemReader<UserRecord> for CsvFileReader {
    async fn read(&mut self) -> Result<Option<UserRecord>> {
        match self.reader.read_record(&mut self.row) {
            Ok(true) => decode_fields(self.row.iter(), &self.layout).map(Some),
            Ok(false) => Ok(None),
            Err(e) => Err(BatchError::input_format(format!("malformed input record: {}", e))),
        }
    }
}

/// Writes records as delimited lines behind a fixed header line.
///
/// The file is truncated and the header written as soon as the writer is
/// created, so an empty table still yields a header-only file.
pub struct CsvFileWriter {
    writer: Mutex<BufWriter<File>>,
    layout: ColumnLayout,
    path: PathBuf,
}

impl CsvFileWriter {
    pub fn create(path: impl AsRef<Path>, header: &[&str], layout: ColumnLayout) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", header_line(header))?;

        tracing::debug!("📝 Created output file {}", path.display());

        Ok(Self {
            writer: Mutex::new(writer),
            layout,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ItemWriter<UserRecord> for CsvFileWriter {
    async fn write(&self, item: UserRecord) -> Result<()> {
        let line = encode_line(&item, &self.layout);
        let mut writer = self.writer.lock().await;
        writeln!(writer, "{}", line)?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.writer.lock().await.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::EXPORT_HEADER;
    use tempfile::{NamedTempFile, TempDir};

    fn input_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_reader_skips_header_unconditionally() {
        let file = input_file("not,a,real,header\n,u1,Ann,Lee,F,ann@x.com,555,1990-01-01,Eng\n,u2,Bob\n");
        let mut reader = CsvFileReader::open(file.path(), ColumnLayout::standard()).unwrap();

        let first = reader.read().await.unwrap().unwrap();
        assert_eq!(first.user_id, "u1");
        assert_eq!(first.job_title, "Eng");

        let second = reader.read().await.unwrap().unwrap();
        assert_eq!(second.first_name, "Bob");
        assert_eq!(second.email, "");

        assert!(reader.read().await.unwrap().is_none());
        assert!(reader.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_header_only_file_is_empty() {
        let file = input_file("id,userId,firstName\n");
        let mut reader = CsvFileReader::open(file.path(), ColumnLayout::standard()).unwrap();
        assert!(reader.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reader_does_not_interpret_quotes() {
        let file = input_file("h\n,u1,\"Ann,Lee\",F\n");
        let mut reader = CsvFileReader::open(file.path(), ColumnLayout::standard()).unwrap();
        let record = reader.read().await.unwrap().unwrap();
        assert_eq!(record.first_name, "\"Ann");
        assert_eq!(record.last_name, "Lee\"");
        assert_eq!(record.sex, "F");
    }

    #[tokio::test]
    async fn test_reader_without_skip_decodes_first_line() {
        let file = input_file("7,u7,Gus\n");
        let mut reader = CsvFileReader::open_skipping(file.path(), ColumnLayout::standard(), 0).unwrap();
        let record = reader.read().await.unwrap().unwrap();
        assert_eq!(record.id, Some(7));
        assert_eq!(record.first_name, "Gus");
    }

    #[tokio::test]
    async fn test_reader_blank_first_line_counts_as_skipped() {
        let file = input_file("\n,u1,Ann\n\n,u2,Bob\n");
        let mut reader = CsvFileReader::open(file.path(), ColumnLayout::standard()).unwrap();

        assert_eq!(reader.read().await.unwrap().unwrap().user_id, "u1");
        assert_eq!(reader.read().await.unwrap().unwrap().user_id, "u2");
        assert!(reader.read().await.unwrap().is_none());
    }

    #[test]
    fn test_reader_missing_file_is_input_format_error() {
        let result = CsvFileReader::open("/definitely/not/here.csv", ColumnLayout::standard());
        assert!(matches!(result, Err(BatchError::InputFormat { .. })));
    }

    #[tokio::test]
    async fn test_writer_writes_header_then_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let writer = CsvFileWriter::create(&path, &EXPORT_HEADER, ColumnLayout::standard()).unwrap();
        writer
            .write(UserRecord {
                id: Some(1),
                user_id: "u1".to_string(),
                first_name: "Ann".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        writer.flush().await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(
            content,
            "id,User Id,First Name,Last Name,Sex,Email,Phone,Date of Birth,Job Title\n1,u1,Ann,,,,,,\n"
        );
    }

    #[tokio::test]
    async fn test_writer_header_only_when_nothing_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");

        let writer = CsvFileWriter::create(&path, &EXPORT_HEADER, ColumnLayout::standard()).unwrap();
        writer.flush().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
