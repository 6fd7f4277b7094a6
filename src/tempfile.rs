use std::borrow::Borrow;
use std::fmt::{Debug, Formatter};
use std::future::poll_fn;
use std::io::{self, IoSlice, SeekFrom};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::fs::{File, OpenOptions};
use tokio::io::{
    AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt, ReadBuf,
};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

#[cfg(not(feature = "uuid"))]
use crate::random_name::RandomName;
use crate::Error;
#[cfg(feature = "uuid")]
use uuid::Uuid;

const FILE_PREFIX: &str = "rtmp_";
const FILE_SUFFIX: &str = ".tmp";

/// A uniquely named temporary file that rewinds to its start on the first read
/// and is deleted when closed.
///
/// Reads, writes and seeks share one cursor and are serialized by a lock owned
/// by this instance, so a `TemporaryFile` can be shared between tasks behind an
/// [`Arc`](std::sync::Arc). Consuming the file with [`close`](TemporaryFile::close)
/// reports deletion errors; dropping it deletes the file on a best-effort basis.
pub struct TemporaryFile {
    /// The open handle and positioning state, guarded for `&self` access.
    cursor: ManuallyDrop<Mutex<Cursor>>,

    /// The path of the backing file.
    path: PathBuf,

    /// Cleared by [`TemporaryFile::close`] once it has taken over the handle.
    /// While set, dropping the instance deletes the backing file.
    armed: bool,
}

/// The file handle together with the "has positioned" state.
struct Cursor {
    file: File,
    position: Position,
}

/// Tracks whether the next read must rewind first.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Position {
    /// Neither a read nor a seek happened yet; the first read rewinds.
    Unpositioned,
    /// The implicit rewind was started but has not completed.
    Rewinding,
    /// A read or seek happened; reads continue from the cursor.
    Positioned,
}

impl Cursor {
    fn new(file: File) -> Self {
        Self {
            file,
            position: Position::Unpositioned,
        }
    }

    /// Seeks to the start if no positioning operation happened yet.
    fn poll_rewind(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        loop {
            match self.position {
                Position::Positioned => return Poll::Ready(Ok(())),
                Position::Unpositioned => {
                    // tokio rejects a seek while a write is still in flight.
                    ready!(Pin::new(&mut self.file).poll_complete(cx))?;
                    Pin::new(&mut self.file).start_seek(SeekFrom::Start(0))?;
                    self.position = Position::Rewinding;
                }
                Position::Rewinding => {
                    let result = ready!(Pin::new(&mut self.file).poll_complete(cx));
                    if let Err(e) = result {
                        self.position = Position::Unpositioned;
                        return Poll::Ready(Err(e));
                    }
                    trace!("rewound temporary file before first read");
                    self.position = Position::Positioned;
                }
            }
        }
    }

    async fn rewind_once(&mut self) -> io::Result<()> {
        poll_fn(|cx| self.poll_rewind(cx)).await
    }
}

impl TemporaryFile {
    /// Creates a new, empty temporary file in the default location.
    ///
    /// ## Example
    ///
    /// ```
    /// # use rewind_tempfile::{TemporaryFile, Error};
    /// # use tokio::fs;
    /// # let _ = tokio_test::block_on(async {
    /// let file = TemporaryFile::new().await?;
    ///
    /// // The file exists.
    /// let file_path = file.file_path().to_path_buf();
    /// assert!(fs::metadata(&file_path).await.is_ok());
    ///
    /// // Deletes the file.
    /// file.close().await?;
    ///
    /// // The file was removed.
    /// assert!(fs::metadata(file_path).await.is_err());
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn new() -> Result<Self, Error> {
        Self::new_in(Self::default_dir()).await
    }

    /// Creates a new, empty temporary file in the specified directory.
    ///
    /// ## Crate Features
    ///
    /// * `uuid` - When the `uuid` crate feature is enabled, a random UUIDv4 is used to
    ///   generate the temporary file name.
    ///
    /// ## Arguments
    ///
    /// * `dir` - The directory to create the file in.
    pub async fn new_in<P: Borrow<Path>>(dir: P) -> Result<Self, Error> {
        #[cfg(feature = "uuid")]
        {
            let id = Uuid::new_v4();
            Self::new_with_uuid_in(id, dir).await
        }

        #[cfg(not(feature = "uuid"))]
        {
            let name = RandomName::new(FILE_PREFIX, FILE_SUFFIX);
            Self::new_with_name_in(name, dir).await
        }
    }

    /// Creates a new, empty temporary file in the default location,
    /// using `uuid` to build the file name.
    #[cfg_attr(docsrs, doc(cfg(feature = "uuid")))]
    #[cfg(feature = "uuid")]
    pub async fn new_with_uuid(uuid: Uuid) -> Result<Self, Error> {
        Self::new_with_uuid_in(uuid, Self::default_dir()).await
    }

    /// Creates a new, empty temporary file in the specified directory,
    /// using `uuid` to build the file name.
    ///
    /// ## Arguments
    ///
    /// * `uuid` - A UUID to use as the unique part of the file name.
    /// * `dir` - The directory to create the file in.
    #[cfg_attr(docsrs, doc(cfg(feature = "uuid")))]
    #[cfg(feature = "uuid")]
    pub async fn new_with_uuid_in<P: Borrow<Path>>(uuid: Uuid, dir: P) -> Result<Self, Error> {
        let file_name = format!("{}{}{}", FILE_PREFIX, uuid, FILE_SUFFIX);
        Self::new_with_name_in(file_name, dir).await
    }

    /// Creates a new, empty temporary file with the given name.
    ///
    /// The file must not exist yet; an existing file is never adopted.
    ///
    /// ## Arguments
    ///
    /// * `name` - The file name to use.
    /// * `dir` - The directory to create the file in.
    ///
    /// ## Example
    ///
    /// ```
    /// # use rewind_tempfile::{TemporaryFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let dir = std::env::temp_dir();
    /// let name = format!("rtmp_doc_{}.tmp", std::process::id());
    /// let file = TemporaryFile::new_with_name_in(&name, dir.as_path()).await?;
    ///
    /// // A second file with the same name cannot be created.
    /// let clash = TemporaryFile::new_with_name_in(&name, dir.as_path()).await;
    /// assert!(matches!(clash, Err(Error::Creation(_))));
    ///
    /// file.close().await?;
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn new_with_name_in<N: AsRef<str>, P: Borrow<Path>>(
        name: N,
        dir: P,
    ) -> Result<Self, Error> {
        let dir = dir.borrow();
        if !dir.is_dir() {
            return Err(Error::InvalidDirectory);
        }
        Self::create(dir.join(name.as_ref())).await
    }

    /// Creates a temporary file in the default location holding every byte of `reader`.
    ///
    /// The cursor is left at the start of the file.
    ///
    /// ## Example
    ///
    /// ```
    /// # use rewind_tempfile::{TemporaryFile, Error};
    /// # let _ = tokio_test::block_on(async {
    /// let file = TemporaryFile::from_reader(&b"hello world!"[..]).await?;
    ///
    /// let mut body = Vec::new();
    /// file.read_to_end(&mut body).await?;
    /// assert_eq!(body, b"hello world!");
    ///
    /// file.close().await?;
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn from_reader<R: AsyncRead + Unpin>(reader: R) -> Result<Self, Error> {
        Self::from_reader_in(reader, Self::default_dir()).await
    }

    /// Creates a temporary file in `dir` holding every byte of `reader`.
    ///
    /// If the source cannot be copied, the partially written file is removed
    /// before the error is returned.
    pub async fn from_reader_in<R: AsyncRead + Unpin, P: Borrow<Path>>(
        reader: R,
        dir: P,
    ) -> Result<Self, Error> {
        let mut file = Self::new_in(dir).await?;
        file.fill_from(reader).await?;
        Ok(file)
    }

    /// Returns the path of the backing file.
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    /// Reads into `buf` from the current cursor, returning the number of bytes read.
    ///
    /// If neither a read nor a seek happened since construction, the cursor is moved
    /// to the start of the file first. `Ok(0)` signals the end of the stream.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut cursor = self.cursor.lock().await;
        cursor.rewind_once().await.map_err(Error::Seek)?;
        cursor.file.read(buf).await.map_err(Error::Read)
    }

    /// Reads all bytes until the end of the stream and appends them to `buf`.
    ///
    /// Rewinds on the first read, like [`read`](TemporaryFile::read).
    pub async fn read_to_end(&self, buf: &mut Vec<u8>) -> Result<usize, Error> {
        let mut cursor = self.cursor.lock().await;
        cursor.rewind_once().await.map_err(Error::Seek)?;
        cursor.file.read_to_end(buf).await.map_err(Error::Read)
    }

    /// Writes `buf` at the current cursor, returning the number of bytes written.
    ///
    /// Writing does not count as positioning: a read following construction and
    /// any number of writes still starts at the beginning of the file.
    pub async fn write(&self, buf: &[u8]) -> Result<usize, Error> {
        let mut cursor = self.cursor.lock().await;
        cursor.file.write(buf).await.map_err(Error::Write)
    }

    /// Writes all of `buf` at the current cursor.
    pub async fn write_all(&self, buf: &[u8]) -> Result<(), Error> {
        let mut cursor = self.cursor.lock().await;
        cursor.file.write_all(buf).await.map_err(Error::Write)
    }

    /// Waits for pending writes to reach the file.
    pub async fn flush(&self) -> Result<(), Error> {
        let mut cursor = self.cursor.lock().await;
        cursor.file.flush().await.map_err(Error::Write)
    }

    /// Moves the cursor and returns the new offset from the start of the file.
    ///
    /// Any seek disables the implicit rewind of the first read.
    ///
    /// ## Example
    ///
    /// ```
    /// # use rewind_tempfile::{TemporaryFile, Error};
    /// # use std::io::SeekFrom;
    /// # let _ = tokio_test::block_on(async {
    /// let file = TemporaryFile::from_reader(&b"hello world!"[..]).await?;
    /// file.seek(SeekFrom::End(-1)).await?;
    ///
    /// let mut buf = [0u8; 1];
    /// assert_eq!(file.read(&mut buf).await?, 1);
    /// assert_eq!(&buf, b"!");
    /// # file.close().await?;
    /// # Ok::<(), Error>(())
    /// # });
    /// ```
    pub async fn seek(&self, pos: SeekFrom) -> Result<u64, Error> {
        let mut cursor = self.cursor.lock().await;
        cursor.position = Position::Positioned;
        cursor.file.seek(pos).await.map_err(Error::Seek)
    }

    /// Moves the cursor to the start of the file.
    pub async fn rewind(&self) -> Result<(), Error> {
        self.seek(SeekFrom::Start(0)).await.map(|_| ())
    }

    /// Returns the size of the backing file in bytes, including pending writes.
    pub async fn len(&self) -> Result<u64, Error> {
        let mut cursor = self.cursor.lock().await;
        cursor.file.flush().await.map_err(Error::Write)?;
        let metadata = cursor.file.metadata().await.map_err(Error::Read)?;
        Ok(metadata.len())
    }

    /// Determines whether the backing file is empty.
    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    /// Closes the file handle and deletes the backing file.
    ///
    /// If closing fails, [`Error::Close`] is returned and the file is left on disk.
    /// If the handle was closed but the file could not be removed, [`Error::Delete`]
    /// is returned.
    pub async fn close(mut self) -> Result<(), Error> {
        self.armed = false;

        // SAFETY: `armed` is cleared, so `Drop` no longer touches the cursor.
        let cursor = unsafe { ManuallyDrop::take(&mut self.cursor) }.into_inner();
        let path = std::mem::take(&mut self.path);
        drop(self);

        let mut file = cursor.file;
        file.flush().await.map_err(Error::Close)?;

        // Waits for in-flight operations, so the descriptor is released right here.
        drop(file.into_std().await);

        tokio::fs::remove_file(&path).await.map_err(Error::Delete)?;
        debug!(path = %path.display(), "closed and deleted temporary file");
        Ok(())
    }

    async fn create(path: PathBuf) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(Error::Creation)?;

        debug!(path = %path.display(), "created temporary file");
        Ok(Self {
            cursor: ManuallyDrop::new(Mutex::new(Cursor::new(file))),
            path,
            armed: true,
        })
    }

    async fn fill_from<R: AsyncRead + Unpin>(&mut self, mut reader: R) -> Result<(), Error> {
        let cursor = self.cursor.get_mut();
        let copied = tokio::io::copy(&mut reader, &mut cursor.file)
            .await
            .map_err(Error::Copy)?;
        cursor.file.flush().await.map_err(Error::Copy)?;
        cursor
            .file
            .seek(SeekFrom::Start(0))
            .await
            .map_err(Error::Seek)?;

        debug!(path = %self.path.display(), bytes = copied, "filled temporary file from source");
        Ok(())
    }

    /// Gets the default temporary file directory.
    #[inline(always)]
    fn default_dir() -> PathBuf {
        std::env::temp_dir()
    }
}

/// Closes the handle and deletes the file unless [`TemporaryFile::close`] already did.
impl Drop for TemporaryFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        // Closing the file handle first, as otherwise the file might not be deleted.
        drop(unsafe { ManuallyDrop::take(&mut self.cursor) });

        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "deleted temporary file on drop"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to delete temporary file on drop"
            ),
        }
    }
}

impl Debug for TemporaryFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.path)
    }
}

/// Forwarding AsyncWrite to the embedded File
impl AsyncWrite for TemporaryFile {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        let cursor = self.get_mut().cursor.get_mut();
        Pin::new(&mut cursor.file).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let cursor = self.get_mut().cursor.get_mut();
        Pin::new(&mut cursor.file).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        let cursor = self.get_mut().cursor.get_mut();
        Pin::new(&mut cursor.file).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[IoSlice<'_>],
    ) -> Poll<Result<usize, io::Error>> {
        let cursor = self.get_mut().cursor.get_mut();
        Pin::new(&mut cursor.file).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        false
    }
}

/// Reads from the embedded File, rewinding first if nothing was positioned yet.
impl AsyncRead for TemporaryFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let cursor = self.get_mut().cursor.get_mut();
        ready!(cursor.poll_rewind(cx))?;
        Pin::new(&mut cursor.file).poll_read(cx, buf)
    }
}

/// Forwarding AsyncSeek to the embedded File; every seek counts as positioning.
impl AsyncSeek for TemporaryFile {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let cursor = self.get_mut().cursor.get_mut();
        cursor.position = Position::Positioned;
        Pin::new(&mut cursor.file).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        let cursor = self.get_mut().cursor.get_mut();
        Pin::new(&mut cursor.file).poll_complete(cx)
    }
}
