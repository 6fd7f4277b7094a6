use rewind_tempfile::{Error, TemporaryFile};
use std::io::SeekFrom;

#[tokio::test]
async fn from_reader_reads_back_source() {
    let file = TemporaryFile::from_reader(&b"test"[..]).await.unwrap();

    let mut body = Vec::new();
    file.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"test");

    let path = file.file_path().to_path_buf();
    assert!(path.is_file());
    file.close().await.unwrap();

    // File is now deleted.
    assert!(tokio::fs::metadata(&path).await.is_err());
}

#[tokio::test]
async fn from_empty_reader_is_empty() {
    let file = TemporaryFile::from_reader(&b""[..]).await.unwrap();
    assert!(file.is_empty().await.unwrap());

    let mut buf = [0u8; 8];
    assert_eq!(file.read(&mut buf).await.unwrap(), 0);
    file.close().await.unwrap();
}

#[tokio::test]
async fn written_data_is_read_from_the_start() {
    let file = TemporaryFile::new().await.unwrap();
    assert_eq!(file.write(b"test").await.unwrap(), 4);

    let mut body = Vec::new();
    file.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"test");

    // Repeated rewinds yield the same content.
    for _ in 0..3 {
        file.seek(SeekFrom::Start(0)).await.unwrap();
        let mut body = Vec::new();
        file.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"test");
    }

    let path = file.file_path().to_path_buf();
    file.close().await.unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn seek_reads_from_requested_position() {
    let file = TemporaryFile::new().await.unwrap();
    file.write_all(b"hello world!").await.unwrap();

    let mut buf = [0u8; 6];
    assert_eq!(file.seek(SeekFrom::Start(6)).await.unwrap(), 6);
    assert_eq!(file.read(&mut buf).await.unwrap(), 6);
    assert_eq!(&buf, b"world!");

    let mut buf = [0u8; 1];
    assert_eq!(file.seek(SeekFrom::End(-1)).await.unwrap(), 11);
    assert_eq!(file.read(&mut buf).await.unwrap(), 1);
    assert_eq!(&buf, b"!");

    file.rewind().await.unwrap();
    let mut body = Vec::new();
    file.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"hello world!");

    file.close().await.unwrap();
}

#[tokio::test]
async fn read_after_seek_does_not_rewind() {
    let file = TemporaryFile::new().await.unwrap();
    file.write_all(b"abc").await.unwrap();

    // The cursor stays at the end of the written data.
    file.seek(SeekFrom::Current(0)).await.unwrap();
    let mut buf = [0u8; 3];
    assert_eq!(file.read(&mut buf).await.unwrap(), 0);

    file.close().await.unwrap();
}

#[tokio::test]
async fn only_the_first_read_rewinds() {
    let file = TemporaryFile::new().await.unwrap();
    file.write_all(b"ab").await.unwrap();

    let mut body = Vec::new();
    file.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"ab");

    // Appends at the cursor; the next read continues after it.
    file.write_all(b"cd").await.unwrap();
    let mut buf = [0u8; 2];
    assert_eq!(file.read(&mut buf).await.unwrap(), 0);

    file.rewind().await.unwrap();
    let mut body = Vec::new();
    file.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"abcd");
    assert_eq!(file.len().await.unwrap(), 4);

    file.close().await.unwrap();
}

#[tokio::test]
async fn negative_seek_fails() {
    let file = TemporaryFile::from_reader(&b"abc"[..]).await.unwrap();
    let result = file.seek(SeekFrom::End(-10)).await;
    assert!(matches!(result, Err(Error::Seek(_))));
    file.close().await.unwrap();
}

#[tokio::test]
async fn file_is_deleted_when_dropping() {
    let path = {
        let file = TemporaryFile::new().await.unwrap();
        assert!(file.file_path().is_file());
        file.file_path().to_path_buf()
    };

    // File is now deleted.
    assert!(!path.is_file());
}

#[tokio::test]
async fn invalid_directory_is_rejected() {
    let file = TemporaryFile::new().await.unwrap();

    // A regular file is not a directory.
    let result = TemporaryFile::new_in(file.file_path()).await;
    assert!(matches!(result, Err(Error::InvalidDirectory)));

    let result = TemporaryFile::from_reader_in(&b"x"[..], file.file_path()).await;
    assert!(matches!(result, Err(Error::InvalidDirectory)));

    file.close().await.unwrap();
}

#[tokio::test]
async fn existing_file_is_not_adopted() {
    let file = TemporaryFile::new().await.unwrap();
    let name = file.file_path().file_name().unwrap().to_str().unwrap();
    let dir = file.file_path().parent().unwrap();

    match TemporaryFile::new_with_name_in(name, dir).await {
        Err(Error::Creation(e)) => assert_eq!(e.kind(), std::io::ErrorKind::AlreadyExists),
        other => panic!("expected a creation error, got {other:?}"),
    }

    // The original file is untouched.
    assert!(file.file_path().is_file());
    file.close().await.unwrap();
}

#[tokio::test]
async fn close_of_externally_removed_file_reports_delete_error() {
    let file = TemporaryFile::new().await.unwrap();
    std::fs::remove_file(file.file_path()).unwrap();

    let result = file.close().await;
    assert!(matches!(result, Err(Error::Delete(_))));
}
