use anyhow::Result;
use integration_tests::{gzip, payload, write_object};
use std::time::Duration;
use storage::{LocalDriver, Storage, StorageFileRead};
use storage_core::{
    BackendConfig, CloseOutcome, Compression, Error, OpenOutcome, StorageConfig, StreamState,
};
use tempfile::TempDir;

async fn read_chunks(file: &mut StorageFileRead) -> Result<Vec<bytes::Bytes>> {
    let mut chunks = Vec::new();
    while let Some(chunk) = file.read().await? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

#[tokio::test]
async fn test_ten_byte_object_in_four_byte_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    write_object(dir.path(), "data.bin", b"0123456789");

    let mut file = StorageFileRead::new("data.bin", false, 4, LocalDriver::new(dir.path()));
    assert_eq!(file.state(), StreamState::Created);
    assert_eq!(file.open().await?, OpenOutcome::Opened);

    let chunks = read_chunks(&mut file).await?;
    let sizes: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    assert!(file.read().await?.is_none());

    assert!(matches!(file.close().await, CloseOutcome::Released));
    assert!(matches!(file.close().await, CloseOutcome::AlreadyClosed));
    assert_eq!(file.state(), StreamState::Closed);
    Ok(())
}

#[tokio::test]
async fn test_missing_object_ignored() -> Result<()> {
    let dir = TempDir::new()?;
    let mut file = StorageFileRead::new("missing.bin", true, 4, LocalDriver::new(dir.path()));

    assert_eq!(file.open().await?, OpenOutcome::SkippedMissing);
    assert_eq!(file.state(), StreamState::Created);
    assert!(file.read().await?.is_none());
    assert!(matches!(file.close().await, CloseOutcome::NotOpened));
    Ok(())
}

#[tokio::test]
async fn test_missing_object_not_ignored() -> Result<()> {
    let dir = TempDir::new()?;
    let mut file = StorageFileRead::new("missing.bin", false, 4, LocalDriver::new(dir.path()));

    let err = file.open().await.unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(file.state(), StreamState::Created);
    assert!(file.read().await.unwrap_err().is_protocol());
    Ok(())
}

#[tokio::test]
async fn test_chunks_reassemble_original() -> Result<()> {
    let dir = TempDir::new()?;

    for size in [0usize, 1, 1000, 65_537] {
        let original = payload(size);
        let name = format!("objects/{}.bin", size);
        write_object(dir.path(), &name, &original);

        for buffer_size in [3usize, 512, 65_536] {
            let mut file =
                StorageFileRead::new(name.as_str(), false, buffer_size, LocalDriver::new(dir.path()));
            file.open().await?;

            let chunks = read_chunks(&mut file).await?;
            assert!(chunks
                .iter()
                .all(|c| !c.is_empty() && c.len() <= buffer_size));
            assert_eq!(chunks.concat(), original, "size={} buffer={}", size, buffer_size);
            assert!(file.read().await?.is_none());
            assert!(file.close().await.is_clean());
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_gzip_over_local_from_config_file() -> Result<()> {
    let dir = TempDir::new()?;
    let original = payload(200_000);
    write_object(dir.path(), "archive/segment.gz", &gzip(&original));

    let config = StorageConfig {
        backend: BackendConfig::Local {
            base_path: dir.path().to_string_lossy().to_string(),
        },
        buffer_size: 8192,
        ignore_missing: true,
        compression: Compression::Gzip,
    };
    let config_path = dir.path().join("storage.json");
    std::fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    let storage = Storage::from_config(StorageConfig::from_file(&config_path)?).await?;
    let data = storage.get("archive/segment.gz").await?.expect("object exists");
    assert_eq!(data.as_ref(), original.as_slice());

    assert!(storage.get("archive/missing.gz").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_stream_moves_between_tasks() -> Result<()> {
    let dir = TempDir::new()?;
    write_object(dir.path(), "base/PG_VERSION", b"16\n");
    let storage = Storage::local(dir.path().to_string_lossy().to_string());

    let opener = storage.clone();
    let mut file = tokio::spawn(async move { opener.open_read("base/PG_VERSION").await })
        .await??
        .expect("object exists");

    assert_eq!(file.state(), StreamState::Opened);
    assert_eq!(file.name(), "base/PG_VERSION");
    assert_eq!(file.buffer_size(), storage.config().buffer_size);

    let reader = tokio::spawn(async move {
        let data = read_chunks(&mut file).await?;
        let _ = file.close().await;
        anyhow::Ok(data.concat())
    });
    assert_eq!(reader.await??, b"16\n");
    Ok(())
}

#[tokio::test]
async fn test_independent_streams_concurrently() -> Result<()> {
    let dir = TempDir::new()?;
    let mut expected = Vec::new();
    for i in 0..8 {
        let data = payload(10_000 + i * 13);
        write_object(dir.path(), &format!("files/{}.bin", i), &data);
        expected.push(data);
    }
    let storage = Storage::local(dir.path().to_string_lossy().to_string());

    let mut handles = Vec::new();
    for i in 0..8 {
        let storage = storage.clone();
        handles.push(tokio::spawn(async move {
            let mut file = storage.new_read_with(format!("files/{}.bin", i), false, 1024);
            file.open().await?;
            let data = read_chunks(&mut file).await?.concat();
            let _ = file.close().await;
            anyhow::Ok(data)
        }));
    }

    for (handle, expected) in handles.into_iter().zip(expected) {
        assert_eq!(handle.await??, expected);
    }
    Ok(())
}

#[tokio::test]
async fn test_read_under_external_deadline() -> Result<()> {
    let dir = TempDir::new()?;
    write_object(dir.path(), "data.bin", b"0123456789");

    let mut file = StorageFileRead::new("data.bin", false, 4, LocalDriver::new(dir.path()));
    file.open().await?;

    let chunk = tokio::time::timeout(Duration::from_secs(5), file.read()).await??;
    assert_eq!(chunk.expect("first chunk").as_ref(), b"0123");
    Ok(())
}

#[tokio::test]
async fn test_display_identity() -> Result<()> {
    let dir = TempDir::new()?;
    let file = StorageFileRead::new("data.bin", false, 4, LocalDriver::new(dir.path()));

    assert_eq!(
        file.to_string(),
        "{name: \"data.bin\", ignore_missing: false, buffer_size: 4, state: created, driver: local}"
    );
    assert_eq!(
        file.driver_as::<LocalDriver>().map(|d| d.base_path().to_path_buf()),
        Some(dir.path().to_path_buf())
    );
    Ok(())
}

#[tokio::test]
async fn test_oversized_buffer_on_small_file() -> Result<()> {
    let dir = TempDir::new()?;
    write_object(dir.path(), "d.bin", b"0123456789");

    let mut file = StorageFileRead::new("d.bin", false, usize::MAX, LocalDriver::new(dir.path()));
    file.open().await?;

    let chunk = file.read().await?.expect("object has data");
    assert_eq!(chunk.as_ref(), b"0123456789");
    assert!(file.read().await?.is_none());
    assert!(file.close().await.is_clean());
    Ok(())
}
