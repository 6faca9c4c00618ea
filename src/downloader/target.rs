use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TEMP_PREFIX: &str = "rangefetch-";
const TEMP_SUFFIX: &str = ".tmp";

/// Destination file sized to the full resource length up front.
///
/// Workers share one handle and only ever issue positioned writes, so there
/// is no shared cursor and no lock. Writes outside `[0, len)` are rejected.
#[derive(Debug)]
pub struct TargetFile {
    path: PathBuf,
    file: Arc<File>,
    len: u64,
}

impl TargetFile {
    /// Opens `destination` (or a fresh temp file) and sets its length to `len`.
    pub async fn allocate(destination: Option<&Path>, len: u64) -> io::Result<Self> {
        let destination = destination.map(Path::to_path_buf);
        tokio::task::spawn_blocking(move || Self::allocate_blocking(destination, len))
            .await
            .map_err(io::Error::other)?
    }

    fn allocate_blocking(destination: Option<PathBuf>, len: u64) -> io::Result<Self> {
        let (file, path) = match destination {
            Some(path) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&path)?;
                (file, path)
            }
            None => tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .suffix(TEMP_SUFFIX)
                .tempfile()?
                .keep()?,
        };
        file.set_len(len)?;

        Ok(Self {
            path,
            file: Arc::new(file),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    /// Writes all of `data` at `offset` on the blocking pool.
    pub async fn write_at<B>(&self, offset: u64, data: B) -> io::Result<()>
    where
        B: AsRef<[u8]> + Send + 'static,
    {
        let end = offset.checked_add(data.as_ref().len() as u64);
        if end.is_none_or(|end| end > self.len) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "write of {} bytes at offset {} exceeds file length {}",
                    data.as_ref().len(),
                    offset,
                    self.len
                ),
            ));
        }

        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || write_all_at(&file, data.as_ref(), offset))
            .await
            .map_err(io::Error::other)?
    }
}

#[cfg(unix)]
fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &File, mut buf: &[u8], mut offset: u64) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
            Ok(n) => {
                buf = &buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
