//! Loading real files through LocalFile.

#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tome_config::LoaderSettings;
use tome_fs::{FileLoader, LoadError, LoadOptions, LocalFile, TextBuffer};

fn write_temp(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content).unwrap();
    file.flush().unwrap();
    file
}

#[tokio::test]
async fn test_load_local_utf8_file() {
    let temp = write_temp("local ✓ file\nsecond\n".as_bytes());
    let sink = Arc::new(Mutex::new(TextBuffer::new_with_path(temp.path().to_path_buf())));
    let file = Arc::new(LocalFile::new(temp.path()));
    let loader = FileLoader::for_file(&sink, &file);

    let summary = loader.load(LoadOptions::new()).await.unwrap();

    assert_eq!(summary.charset, "UTF-8");
    assert_eq!(sink.lock().text(), "local ✓ file\nsecond");
}

#[tokio::test]
async fn test_load_local_file_with_configured_limits() {
    let temp = write_temp(&vec![b'a'; 2048]);
    let sink = Arc::new(Mutex::new(TextBuffer::new()));
    let file = Arc::new(LocalFile::new(temp.path()));
    let mut loader = FileLoader::for_file(&sink, &file);

    loader.configure(&LoaderSettings { max_size: 1000, chunk_size: 64 }).unwrap();
    let err = loader.load(LoadOptions::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "The file is too big. Maximum 1.0 kB can be loaded.");

    loader.configure(&LoaderSettings { max_size: -1, chunk_size: 64 }).unwrap();
    let summary = loader.load(LoadOptions::new()).await.unwrap();
    assert_eq!(summary.bytes_read, 2048);
    assert_eq!(sink.lock().len(), 2048);
}

#[tokio::test]
async fn test_missing_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(Mutex::new(TextBuffer::new()));
    let file = Arc::new(LocalFile::new(dir.path().join("gone.txt")));
    let loader = FileLoader::for_file(&sink, &file);

    let err = loader.load(LoadOptions::new()).await.unwrap_err();
    assert!(matches!(err, LoadError::QueryFailed(e) if e.kind() == std::io::ErrorKind::NotFound));
}

#[tokio::test]
async fn test_local_windows_1252_file() {
    let temp = write_temp(b"\x93Caf\xe9\x94 \x96 na\xefve r\xe9sum\xe9 \x85\r\n");
    let sink = Arc::new(Mutex::new(TextBuffer::new()));
    let file = Arc::new(LocalFile::new(temp.path()));
    let loader = FileLoader::for_file(&sink, &file);

    let summary = loader.load(LoadOptions::new()).await.unwrap();

    assert_eq!(summary.charset, "windows-1252");
    assert_eq!(sink.lock().text(), "“Café” – naïve résumé …");
}
