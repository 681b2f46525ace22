use anyhow::{Context as _, Result};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

/// A report output backed by a file.
///
/// The file is created (or truncated) when the sink is opened and is
/// flushed and closed when the sink is dropped, also when the run ends
/// early because of an error elsewhere. [`FileSink::close`] does the same
/// but returns the flush error instead of logging it.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create the report file, and its parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create report directory {}", parent.display())
            })?;
        }

        let file = File::create(&path)
            .with_context(|| format!("Failed to create report file {}", path.display()))?;

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the file.
    pub fn close(mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let file = writer
            .into_inner()
            .map_err(|error| error.into_error())
            .with_context(|| format!("Failed to flush report file {}", self.path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync report file {}", self.path.display()))
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("report file already closed"))
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take()
            && let Err(error) = writer.flush()
        {
            tracing::error!(path = %self.path.display(), %error, "failed to flush report file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn dropping_flushes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("drop.txt");
        {
            let mut sink = FileSink::create(&path).unwrap();
            sink.write_all(b"1\t42.0000\n").unwrap();
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "1\t42.0000\n");
    }

    #[test]
    fn close_flushes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("close.txt");
        let mut sink = FileSink::create(&path).unwrap();
        assert_eq!(sink.path(), path.as_path());
        sink.write_all(b"12.0000 1\n").unwrap();
        sink.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "12.0000 1\n");
    }

    #[test]
    fn creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reports").join("run-1").join("stats.txt");
        FileSink::create(&path).unwrap().close().unwrap();

        assert!(path.is_file());
    }

    #[test]
    fn create_fails_on_a_directory() {
        let temp = TempDir::new().unwrap();

        let error = FileSink::create(temp.path()).unwrap_err();
        assert!(error.to_string().starts_with("Failed to create report file"));
    }
}
