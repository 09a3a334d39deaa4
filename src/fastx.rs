//src/fastx.rs

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::errors::{Error, Result};
use crate::types::ReadRecord;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b, 0x08];
const BZIP2_MAGIC: &[u8] = b"BZh";
const ZIP_MAGIC: &[u8] = &[0x50, 0x4b, 0x03, 0x04];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Plain,
    Gzip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

impl SequenceFormat {
    fn sigil(self) -> char {
        match self {
            SequenceFormat::Fasta => '>',
            SequenceFormat::Fastq => '@',
        }
    }
}

/// Classifies compression from the leading bytes. bzip2 and zip are
/// recognised only so they can be refused by name.
pub fn detect_compression(path: &Path, prefix: &[u8]) -> Result<Compression> {
    if prefix.starts_with(GZIP_MAGIC) {
        Ok(Compression::Gzip)
    } else if prefix.starts_with(BZIP2_MAGIC) {
        Err(Error::UnsupportedCompression {
            path: path.to_path_buf(),
            format: "bzip2",
        })
    } else if prefix.starts_with(ZIP_MAGIC) {
        Err(Error::UnsupportedCompression {
            path: path.to_path_buf(),
            format: "zip",
        })
    } else {
        Ok(Compression::Plain)
    }
}

/// Single-pass reader over FASTA or FASTQ records, plain or gzipped.
pub struct FastxReader {
    path: PathBuf,
    reader: Box<dyn BufRead>,
    format: SequenceFormat,
    compression: Compression,
    /// FASTA header already read while collecting the previous record's body.
    pending_header: Option<String>,
    line_no: usize,
    line: String,
    finished: bool,
}

impl FastxReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut raw = BufReader::new(file);

        let prefix = raw.fill_buf().map_err(|e| Error::io(path, e))?;
        let compression = detect_compression(path, prefix)?;

        let mut reader: Box<dyn BufRead> = match compression {
            Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(raw))),
            Compression::Plain => Box::new(raw),
        };

        let first = reader
            .fill_buf()
            .map_err(|e| Error::io(path, e))?
            .first()
            .copied();
        let format = match first {
            Some(b'>') => SequenceFormat::Fasta,
            Some(b'@') => SequenceFormat::Fastq,
            _ => {
                return Err(Error::UnknownFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        log::debug!("{} looks like {:?} ({:?})", path.display(), format, compression);
        Ok(Self::from_parts(path.to_path_buf(), reader, format, compression))
    }

    /// Builds a reader over an already-classified stream.
    pub fn from_reader<R: Read + 'static>(reader: R, format: SequenceFormat) -> Self {
        Self::from_parts(
            PathBuf::from("<stream>"),
            Box::new(BufReader::new(reader)),
            format,
            Compression::Plain,
        )
    }

    fn from_parts(
        path: PathBuf,
        reader: Box<dyn BufRead>,
        format: SequenceFormat,
        compression: Compression,
    ) -> Self {
        Self {
            path,
            reader,
            format,
            compression,
            pending_header: None,
            line_no: 0,
            line: String::new(),
            finished: false,
        }
    }

    pub fn format(&self) -> SequenceFormat {
        self.format
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Next line without its line terminator, `None` at EOF.
    fn next_line(&mut self) -> Result<Option<String>> {
        self.line.clear();
        let n = self
            .reader
            .read_line(&mut self.line)
            .map_err(|e| Error::io(&self.path, e))?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(self.line.trim_end_matches(&['\n', '\r'][..]).to_string()))
    }

    fn next_non_blank(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.next_line()? {
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn parse_header(&self, line: &str) -> Result<(String, Option<String>)> {
        let malformed = || Error::MalformedHeader {
            line: self.line_no,
            header: line.to_string(),
        };
        let body = line.strip_prefix(self.format.sigil()).ok_or_else(malformed)?;
        let body = body.trim();
        if body.is_empty() {
            return Err(malformed());
        }

        match body.split_once(char::is_whitespace) {
            Some((id, comment)) => Ok((id.to_string(), Some(comment.to_string()))),
            None => Ok((body.to_string(), None)),
        }
    }

    fn next_fasta(&mut self) -> Result<Option<ReadRecord>> {
        let header = match self.pending_header.take() {
            Some(h) => h,
            None => match self.next_non_blank()? {
                Some(h) => h,
                None => return Ok(None),
            },
        };
        let (original_id, comment) = self.parse_header(&header)?;

        let mut sequence = String::new();
        while let Some(line) = self.next_line()? {
            if line.starts_with('>') {
                self.pending_header = Some(line);
                break;
            }
            let body = line.trim();
            if body.contains('>') {
                return Err(Error::MalformedHeader {
                    line: self.line_no,
                    header: line,
                });
            }
            sequence.push_str(body);
        }

        Ok(Some(ReadRecord {
            original_id,
            comment,
            sequence,
        }))
    }

    fn next_fastq(&mut self) -> Result<Option<ReadRecord>> {
        let header = match self.next_non_blank()? {
            Some(h) => h,
            None => return Ok(None),
        };
        let (original_id, comment) = self.parse_header(&header)?;

        let truncated = |missing| Error::TruncatedRecord {
            read: original_id.clone(),
            missing,
        };
        let sequence = self.next_line()?.ok_or_else(|| truncated("sequence"))?;
        // Separator and quality are consumed without validation.
        self.next_line()?.ok_or_else(|| truncated("separator"))?;
        self.next_line()?.ok_or_else(|| truncated("quality"))?;

        Ok(Some(ReadRecord {
            original_id,
            comment,
            sequence: sequence.trim().to_string(),
        }))
    }
}

impl Iterator for FastxReader {
    type Item = Result<ReadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let record = match self.format {
            SequenceFormat::Fasta => self.next_fasta(),
            SequenceFormat::Fastq => self.next_fastq(),
        };
        match record {
            Ok(Some(r)) => Some(Ok(r)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                // No partial-success mode: stop after the first error.
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression as GzLevel;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn collect(reader: FastxReader) -> Vec<ReadRecord> {
        reader.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn reads_fasta_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "reads.fasta",
            b">read1 runid=abc ch=12\nACGT\n>read2\nGGCC\n",
        );
        let reader = FastxReader::open(&path).unwrap();
        assert_eq!(reader.format(), SequenceFormat::Fasta);
        assert_eq!(reader.compression(), Compression::Plain);

        let records = collect(reader);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original_id, "read1");
        assert_eq!(records[0].comment.as_deref(), Some("runid=abc ch=12"));
        assert_eq!(records[0].sequence, "ACGT");
        assert_eq!(records[1].original_id, "read2");
        assert_eq!(records[1].comment, None);
    }

    #[test]
    fn joins_multiline_fasta() {
        let reader = FastxReader::from_reader(
            &b">a\nACG\nTTA\n\n>b desc\nGG\n"[..],
            SequenceFormat::Fasta,
        );
        let records = collect(reader);
        assert_eq!(records[0].sequence, "ACGTTA");
        assert_eq!(records[1].sequence, "GG");
        assert_eq!(records[1].comment.as_deref(), Some("desc"));
    }

    #[test]
    fn reads_fastq_ignoring_quality_length() {
        let reader = FastxReader::from_reader(
            &b"@r1 c\nACGTACGT\n+\nII\n@r2\nTT\n+r2\n!!\n"[..],
            SequenceFormat::Fastq,
        );
        let records = collect(reader);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, "ACGTACGT");
        assert_eq!(records[1].original_id, "r2");
    }

    #[test]
    fn reads_gzipped_fastq() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        let path = write_file(dir.path(), "reads.fq.gz", &encoder.finish().unwrap());

        let reader = FastxReader::open(&path).unwrap();
        assert_eq!(reader.format(), SequenceFormat::Fastq);
        assert_eq!(reader.compression(), Compression::Gzip);
        assert_eq!(collect(reader)[0].sequence, "ACGT");
    }

    #[test]
    fn rejects_bzip2_and_zip() {
        let dir = tempfile::tempdir().unwrap();
        let bz = write_file(dir.path(), "reads.bz2", b"BZh91AY&SY");
        let zip = write_file(dir.path(), "reads.zip", &[0x50, 0x4b, 0x03, 0x04, 0, 0]);

        assert!(matches!(
            FastxReader::open(&bz),
            Err(Error::UnsupportedCompression { format: "bzip2", .. })
        ));
        assert!(matches!(
            FastxReader::open(&zip),
            Err(Error::UnsupportedCompression { format: "zip", .. })
        ));
    }

    #[test]
    fn rejects_unknown_leading_character() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "reads.txt", b"ACGT\n");
        assert!(matches!(FastxReader::open(&path), Err(Error::UnknownFormat { .. })));

        let empty = write_file(dir.path(), "empty.fasta", b"");
        assert!(matches!(FastxReader::open(&empty), Err(Error::UnknownFormat { .. })));
    }

    #[test]
    fn empty_identifier_is_fatal() {
        let mut reader = FastxReader::from_reader(&b">  \nACGT\n"[..], SequenceFormat::Fasta);
        assert!(matches!(reader.next(), Some(Err(Error::MalformedHeader { line: 1, .. }))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn indented_fasta_header_is_fatal() {
        let mut reader =
            FastxReader::from_reader(&b">a\nACGT\n >b\nGG\n"[..], SequenceFormat::Fasta);
        assert!(matches!(
            reader.next(),
            Some(Err(Error::MalformedHeader { line: 3, ref header })) if header == " >b"
        ));
        assert!(reader.next().is_none());
    }

    #[test]
    fn wrong_sigil_mid_file_is_fatal() {
        let mut reader = FastxReader::from_reader(
            &b"@r1\nAC\n+\nII\nr2\nAC\n+\nII\n"[..],
            SequenceFormat::Fastq,
        );
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(Error::MalformedHeader { line: 5, .. }))));
    }

    #[test]
    fn truncated_fastq_is_fatal() {
        let mut reader = FastxReader::from_reader(&b"@r1\nACGT\n+\n"[..], SequenceFormat::Fastq);
        assert!(matches!(
            reader.next(),
            Some(Err(Error::TruncatedRecord { missing: "quality", .. }))
        ));
    }
}
