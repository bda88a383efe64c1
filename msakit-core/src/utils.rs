use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::errors::Result;

/// True if the path ends in `.gz`.
pub fn is_gzipped(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("gz"))
}

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let file: Box<dyn Read> = match is_gzipped(path) {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    Ok(BufReader::new(file))
}

/// A plain or gzip-compressing output stream.
///
/// Call [`DynamicWriter::finish`] when done: a gzip stream is only complete
/// once its trailer is written, and dropping the writer would swallow any
/// error from that last write.
pub enum DynamicWriter<W: Write = BufWriter<File>> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> DynamicWriter<W> {
    /// Flush everything, writing the gzip trailer if compressing.
    pub fn finish(self) -> Result<()> {
        match self {
            DynamicWriter::Plain(mut inner) => inner.flush()?,
            DynamicWriter::Gzip(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}

impl<W: Write> Write for DynamicWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            DynamicWriter::Plain(inner) => inner.write(buf),
            DynamicWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            DynamicWriter::Plain(inner) => inner.flush(),
            DynamicWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}

///
/// Get a writer for a file, compressing with gzip when the path ends in `.gz`.
///
/// Parent directories are created as needed.
///
pub fn get_dynamic_writer(path: &Path) -> Result<DynamicWriter> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = BufWriter::new(File::create(path)?);
    let writer = match is_gzipped(path) {
        true => DynamicWriter::Gzip(GzEncoder::new(file, Compression::default())),
        false => DynamicWriter::Plain(file),
    };

    Ok(writer)
}

/// Strip a trailing `.gz` and return the remaining extension, lowercased.
///
/// `aln.afa.gz` and `aln.afa` both give `Some("afa")`.
pub fn base_extension(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let base = file_name.strip_suffix(".gz").unwrap_or(file_name);
    Path::new(base)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::BufRead;
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::tempdir;

    #[rstest]
    #[case("aln.afa", Some("afa"))]
    #[case("aln.AFA.gz", Some("afa"))]
    #[case("dir/aln.pb.gz", Some("pb"))]
    #[case("noext", None)]
    #[case("noext.gz", None)]
    fn test_base_extension(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(
            base_extension(&PathBuf::from(path)),
            expected.map(|s| s.to_string())
        );
    }

    #[rstest]
    #[case("plain.txt")]
    #[case("nested/compressed.txt.gz")]
    fn test_dynamic_writer_then_reader(#[case] name: &str) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);

        let mut writer = get_dynamic_writer(&path).unwrap();
        writeln!(writer, ">seq1").unwrap();
        writeln!(writer, "ACGT").unwrap();
        writer.finish().unwrap();

        let reader = get_dynamic_reader(&path).unwrap();
        let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec![">seq1".to_string(), "ACGT".to_string()]);
    }

    /// Accepts `room` bytes, then reports a full device.
    struct FullAfter {
        room: usize,
    }

    impl Write for FullAfter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.room == 0 {
                return Err(std::io::Error::other("no space left on device"));
            }
            let n = buf.len().min(self.room);
            self.room -= n;
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_finish_reports_gzip_trailer_failure() {
        // room for the gzip header only
        let mut writer = DynamicWriter::Gzip(GzEncoder::new(
            FullAfter { room: 16 },
            Compression::default(),
        ));
        writer.write_all(b"ACGT").unwrap();
        let err = writer.finish().unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Io);
    }

    #[test]
    fn test_finish_plain() {
        let writer = DynamicWriter::Plain(Vec::new());
        assert!(writer.finish().is_ok());
    }
}
