//! Local <-> remote transfers.

use std::sync::Arc;

use adsfs_client::{
    AdsErrorCode, AdsFs, AdsFsError, ErrorKind, FsConfig, IndexGroup, LogicalRoot, MemoryTarget,
    WriteOptions,
};

const ROOT: LogicalRoot = LogicalRoot::Generic;

fn setup() -> (Arc<MemoryTarget>, AdsFs) {
    let target = Arc::new(MemoryTarget::new());
    let fs = AdsFs::from_arc(target.clone()).with_config(FsConfig::new().with_chunk_size(256));
    (target, fs)
}

#[tokio::test]
async fn test_upload_then_download() {
    let (target, fs) = setup();
    let dir = tempfile::tempdir().unwrap();
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 253) as u8).collect();
    let local = dir.path().join("Port_851.app");
    std::fs::write(&local, &data).unwrap();

    let sent = fs
        .upload_file_to_boot_folder(
            &local,
            "Plc/Port_851.app",
            WriteOptions::new().with_ensure_directory(true),
        )
        .await
        .unwrap();
    assert_eq!(sent, 1000);
    assert_eq!(target.file_contents(LogicalRoot::BootDir, "Plc/Port_851.app").unwrap(), data);

    let back = dir.path().join("back.app");
    let received = fs
        .download_file_from_boot_folder(&back, "Plc/Port_851.app")
        .await
        .unwrap();
    assert_eq!(received, 1000);
    assert_eq!(std::fs::read(&back).unwrap(), data);
    assert_eq!(target.open_file_handles(), 0);
}

#[tokio::test]
async fn test_upload_empty_file() {
    let (target, fs) = setup();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("empty.txt");
    std::fs::write(&local, b"").unwrap();

    let sent = fs
        .upload_file(&local, "empty.txt", WriteOptions::new(), ROOT)
        .await
        .unwrap();
    assert_eq!(sent, 0);
    assert_eq!(target.file_contents(ROOT, "empty.txt").unwrap(), b"");
}

#[tokio::test]
async fn test_upload_checks_extension_and_local_file() {
    let (target, fs) = setup();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("config.xml");
    std::fs::write(&local, b"<c/>").unwrap();

    let err = fs
        .upload_file(&local, "config.txt", WriteOptions::new(), ROOT)
        .await
        .unwrap_err();
    assert!(matches!(err, AdsFsError::ExtensionMismatch { .. }));

    let err = fs
        .upload_file(dir.path().join("missing.xml"), "config.xml", WriteOptions::new(), ROOT)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(target.calls().is_empty());
}

#[tokio::test]
async fn test_upload_respects_overwrite() {
    let (target, fs) = setup();
    target.put_file(ROOT, "a.bin", b"remote");
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("a.bin");
    std::fs::write(&local, b"local").unwrap();

    let err = fs
        .upload_file(&local, "a.bin", WriteOptions::new(), ROOT)
        .await
        .unwrap_err();
    assert!(matches!(err, AdsFsError::AlreadyExists(_)));
    assert_eq!(target.file_contents(ROOT, "a.bin").unwrap(), b"remote");

    fs.upload_file(&local, "a.bin", WriteOptions::new().with_overwrite(true), ROOT)
        .await
        .unwrap();
    assert_eq!(target.file_contents(ROOT, "a.bin").unwrap(), b"local");
}

#[tokio::test]
async fn test_download_refuses_existing_local_file() {
    let (target, fs) = setup();
    target.put_file(ROOT, "r.bin", b"remote");
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("r.bin");
    std::fs::write(&local, b"mine").unwrap();

    let err = fs.download_file(&local, "r.bin", ROOT).await.unwrap_err();
    assert!(matches!(err, AdsFsError::AlreadyExists(_)));
    assert_eq!(std::fs::read(&local).unwrap(), b"mine");
    assert!(target.calls().is_empty());
}

#[tokio::test]
async fn test_failed_download_removes_partial_file() {
    let (target, fs) = setup();
    target.put_file(ROOT, "r.bin", vec![7u8; 1000]);
    target.fail_nth(IndexGroup::FileRead, 2, AdsErrorCode::DEVICE_ERROR);
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("r.bin");

    let err = fs.download_file(&local, "r.bin", ROOT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Substrate);
    assert!(!local.exists());
    assert_eq!(target.open_file_handles(), 0);
}

#[tokio::test]
async fn test_download_of_missing_remote_file() {
    let (_target, fs) = setup();
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("none.bin");

    let err = fs.download_file(&local, "none.bin", ROOT).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(!local.exists());
}

#[tokio::test]
async fn test_upload_directory_mirrors_tree() {
    let (target, fs) = setup();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Plc/Sub")).unwrap();
    std::fs::create_dir(dir.path().join("Empty")).unwrap();
    std::fs::write(dir.path().join("CurrentConfig.xml"), b"<cfg/>").unwrap();
    std::fs::write(dir.path().join("Plc/Port_851.app"), b"app").unwrap();
    std::fs::write(dir.path().join("Plc/Sub/data.bin"), vec![1u8; 600]).unwrap();

    let uploaded = fs
        .upload_directory(dir.path(), "Boot", WriteOptions::new(), ROOT)
        .await
        .unwrap();
    assert_eq!(uploaded, 3);

    assert!(target.is_dir(ROOT, "Boot/Empty"));
    assert!(target.is_dir(ROOT, "Boot/Plc/Sub"));
    assert_eq!(target.file_contents(ROOT, "Boot/CurrentConfig.xml").unwrap(), b"<cfg/>");
    assert_eq!(target.file_contents(ROOT, "Boot/Plc/Port_851.app").unwrap(), b"app");
    assert_eq!(target.file_contents(ROOT, "Boot/Plc/Sub/data.bin").unwrap(), vec![1u8; 600]);
    assert_eq!(target.open_file_handles(), 0);
    assert_eq!(target.open_find_handles(), 0);

    // A second run only succeeds when overwriting; directories are reused.
    let err = fs
        .upload_directory(dir.path(), "Boot", WriteOptions::new(), ROOT)
        .await
        .unwrap_err();
    assert!(matches!(err, AdsFsError::AlreadyExists(_)));
    fs.upload_directory(dir.path(), "Boot", WriteOptions::new().with_overwrite(true), ROOT)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_directory_into_root() {
    let (target, fs) = setup();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let uploaded = fs
        .upload_directory(dir.path(), "", WriteOptions::new(), LogicalRoot::BootDir)
        .await
        .unwrap();
    assert_eq!(uploaded, 1);
    assert_eq!(target.file_contents(LogicalRoot::BootDir, "a.txt").unwrap(), b"a");
}

#[tokio::test]
async fn test_upload_directory_rejects_a_file() {
    let (_target, fs) = setup();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    std::fs::write(&file, b"x").unwrap();

    let err = fs
        .upload_directory(&file, "Boot", WriteOptions::new(), ROOT)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}
