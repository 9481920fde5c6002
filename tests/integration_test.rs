use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::sleep;

use dropzone::{
    Config, DiskFile, EntryId, FileSource, JsonFileStore, MemoryFile, MemoryRecordStore,
    QueueController, QueueEvent, RecordStore, SimulatorConfig, TransferSimulator, UploadEntry,
    UploadError, UploadStatus,
};

fn make_controller(failure_rate: f64, step_delay_ms: u64) -> QueueController {
    QueueController::new(TransferSimulator::new(SimulatorConfig {
        total_steps: 10,
        step_delay: Duration::from_millis(step_delay_ms),
        failure_rate,
    }))
}

fn png(name: &str, len: usize) -> Arc<dyn FileSource> {
    Arc::new(MemoryFile::new(name, "image/png", vec![0u8; len]))
}

#[tokio::test]
async fn test_add_files_preserves_order_and_rejects_invalid() {
    let controller = make_controller(0.0, 1);

    let results = controller
        .add_files(vec![
            png("a.png", 16),
            Arc::new(MemoryFile::new(
                "setup.exe",
                "application/x-msdownload",
                vec![0u8; 16],
            )),
            png("b.png", 32),
        ])
        .await;

    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(UploadError::UnsupportedType(_))));
    assert!(results[2].is_ok());

    // 被拒绝的文件不进队列，顺序保持不变
    let entries = controller.entries().await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "a.png");
    assert_eq!(entries[1].name, "b.png");
    assert!(entries.iter().all(|e| e.status == UploadStatus::Pending));

    // 图片有内联预览
    let preview = entries[0].preview.as_deref().unwrap();
    assert!(preview.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_add_files_does_not_touch_existing_entries() {
    let controller = make_controller(0.0, 1);

    let first = controller.add_files(vec![png("a.png", 16)]).await;
    let before = controller.entry(*first[0].as_ref().unwrap()).await.unwrap();

    controller.add_files(vec![png("b.png", 16)]).await;

    let after = controller.entry(before.id).await.unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.status, before.status);
    assert_eq!(after.attempt, before.attempt);
    assert_eq!(controller.entries().await.len(), 2);
}

#[tokio::test]
async fn test_upload_single_success() {
    let controller = make_controller(0.0, 1);
    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();

    let record = controller.upload_single(id).await.unwrap();

    let entry = controller.entry(id).await.unwrap();
    assert_eq!(entry.status, UploadStatus::Success);
    assert_eq!(entry.progress, 100);
    assert!(entry.uploaded_at.is_some());
    assert_eq!(entry.remote_url.as_ref(), Some(&record.url));
    assert!(entry.error_message.is_none());
}

#[tokio::test]
async fn test_upload_single_failure_sets_message() {
    let controller = make_controller(1.0, 1);
    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();

    let err = controller.upload_single(id).await.unwrap_err();
    assert!(matches!(err, UploadError::TransferFailed(_)));

    let entry = controller.entry(id).await.unwrap();
    assert_eq!(entry.status, UploadStatus::Error);
    let message = entry.error_message.unwrap();
    assert!(message.contains("Network error"));
}

#[tokio::test]
async fn test_upload_single_requires_pending() {
    let controller = make_controller(0.0, 1);
    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();

    controller.upload_single(id).await.unwrap();

    // 终态条目不能再上传
    let err = controller.upload_single(id).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidState(_)));

    let missing = controller.upload_single(EntryId::new()).await.unwrap_err();
    assert!(matches!(missing, UploadError::EntryNotFound(_)));
}

#[tokio::test]
async fn test_upload_all_is_sequential() {
    let controller = make_controller(0.0, 1);
    let mut events = controller.subscribe();

    controller
        .add_files(vec![png("a.png", 16), png("b.png", 16), png("c.png", 16)])
        .await;

    let report = controller.upload_all().await;
    assert_eq!(report.attempted, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.skipped, 0);

    // 事件流里任何时刻最多一个条目处于 Uploading
    let mut in_flight: Option<EntryId> = None;
    let mut batch_seen = false;
    while let Ok(event) = events.try_recv() {
        match event {
            QueueEvent::StatusChanged {
                id,
                new: UploadStatus::Uploading,
                ..
            } => {
                assert!(in_flight.is_none(), "two uploads in flight at once");
                in_flight = Some(id);
            }
            QueueEvent::StatusChanged { id, new, .. } if new.is_terminal() => {
                assert_eq!(in_flight, Some(id));
                in_flight = None;
            }
            QueueEvent::BatchFinished(r) => {
                assert_eq!(r, report);
                batch_seen = true;
            }
            _ => {}
        }
    }
    assert!(in_flight.is_none());
    assert!(batch_seen);
}

#[tokio::test]
async fn test_upload_all_survives_entry_failure() {
    let controller = make_controller(1.0, 1);
    controller
        .add_files(vec![png("a.png", 16), png("b.png", 16)])
        .await;

    let report = controller.upload_all().await;
    assert_eq!(report.attempted, 2);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 2);

    // 两个条目都被处理到了终态
    let entries = controller.entries().await;
    assert!(entries.iter().all(|e| e.status == UploadStatus::Error));
    assert!(entries.iter().all(|e| e.error_message.is_some()));
}

#[tokio::test]
async fn test_cancel_resets_entry_and_fences_late_callbacks() {
    // 每步 20ms，总时长约 220ms，中途取消
    let controller = make_controller(0.0, 20);
    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();

    let handle = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.upload_single(id).await })
    };

    sleep(Duration::from_millis(70)).await;
    controller.cancel_entry(id).await.unwrap();

    // 立即回到 Pending，进度清零
    let entry = controller.entry(id).await.unwrap();
    assert_eq!(entry.status, UploadStatus::Pending);
    assert_eq!(entry.progress, 0);
    assert!(entry.error_message.is_none());

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(UploadError::Cancelled)));

    // 等超过整个模拟时长，晚到的回调不会覆盖手动重置
    sleep(Duration::from_millis(300)).await;
    let entry = controller.entry(id).await.unwrap();
    assert_eq!(entry.status, UploadStatus::Pending);
    assert_eq!(entry.progress, 0);

    // 取消后的条目可以重新上传
    controller.upload_single(id).await.unwrap();
    let entry = controller.entry(id).await.unwrap();
    assert_eq!(entry.status, UploadStatus::Success);
    assert_eq!(entry.progress, 100);
}

#[tokio::test]
async fn test_clear_during_upload_discards_late_settle() {
    // clear_all 不取消进行中的传输，模拟器会跑完，
    // 但晚到的结清在围栏处落空
    let controller = make_controller(0.0, 20);
    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();

    let handle = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.upload_single(id).await })
    };

    sleep(Duration::from_millis(50)).await;
    controller.clear_all().await;
    assert!(controller.entries().await.is_empty());

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(UploadError::Cancelled)));
    assert!(controller.entries().await.is_empty());
}

#[tokio::test]
async fn test_cancel_requires_uploading() {
    let controller = make_controller(0.0, 1);
    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();

    let err = controller.cancel_entry(id).await.unwrap_err();
    assert!(matches!(err, UploadError::InvalidState(_)));
}

#[tokio::test]
async fn test_remove_entry() {
    let controller = make_controller(0.0, 1);
    let ids: Vec<EntryId> = controller
        .add_files(vec![png("a.png", 16), png("b.png", 16)])
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    controller.remove_entry(ids[0]).await.unwrap();
    let entries = controller.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, ids[1]);

    let err = controller.remove_entry(ids[0]).await.unwrap_err();
    assert!(matches!(err, UploadError::EntryNotFound(_)));
}

#[tokio::test]
async fn test_clear_all_regardless_of_status() {
    let controller = make_controller(0.0, 1);
    let ids: Vec<EntryId> = controller
        .add_files(vec![png("a.png", 16), png("b.png", 16)])
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    controller.upload_single(ids[0]).await.unwrap();

    controller.clear_all().await;
    assert!(controller.entries().await.is_empty());

    let stats = controller.stats().await;
    assert_eq!(stats.total, 0);
    assert_eq!(stats.total_size, 0);
}

#[tokio::test]
async fn test_stats_counts() {
    let controller = make_controller(0.0, 1);
    controller
        .add_files(vec![png("a.png", 10), png("b.png", 20), png("c.png", 30)])
        .await;

    let stats = controller.stats().await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.total_size, 60);

    controller.upload_all().await;

    let stats = controller.stats().await;
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.succeeded, 3);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_record_store_passthrough() {
    let store = Arc::new(MemoryRecordStore::new());
    let controller = make_controller(0.0, 1).with_record_store(store.clone());

    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();

    let records = store.list_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, UploadStatus::Pending);

    controller.upload_single(id).await.unwrap();
    let records = store.list_records().await.unwrap();
    assert_eq!(records[0].status, UploadStatus::Success);
    assert!(records[0].remote_url.is_some());

    controller.remove_entry(id).await.unwrap();
    assert!(store.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_json_file_store_restores_records() {
    let path = std::env::temp_dir().join(format!(
        "dropzone_store_{}.json",
        uuid::Uuid::new_v4()
    ));

    let entry = UploadEntry::new("saved.png", 64, "image/png");
    {
        let store = JsonFileStore::open(&path).await.unwrap();
        store.create_record(&entry).await.unwrap();
    }

    let store = JsonFileStore::open(&path).await.unwrap();
    let records = store.list_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, entry.id);
    assert_eq!(records[0].name, "saved.png");

    store.delete_record(entry.id).await.unwrap();
    assert!(store.list_records().await.unwrap().is_empty());

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_disk_file_can_be_queued_and_uploaded() {
    let path = std::env::temp_dir().join(format!("dropzone_{}.png", uuid::Uuid::new_v4()));
    tokio::fs::write(&path, vec![0x89u8, 0x50, 0x4e, 0x47])
        .await
        .unwrap();

    let file = DiskFile::open(&path).await.unwrap();
    assert_eq!(file.size(), 4);
    assert_eq!(file.mime_type(), "image/png");
    assert!(file.name().ends_with(".png"));

    let controller = make_controller(0.0, 1);
    let id = controller
        .add_files(vec![Arc::new(file)])
        .await
        .remove(0)
        .unwrap();

    let entry = controller.entry(id).await.unwrap();
    assert!(entry.preview.as_deref().unwrap().starts_with("data:image/png;base64,"));

    controller.upload_single(id).await.unwrap();
    assert_eq!(
        controller.entry(id).await.unwrap().status,
        UploadStatus::Success
    );

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_config_load_from_file() {
    let path = std::env::temp_dir().join(format!("dropzone_{}.toml", uuid::Uuid::new_v4()));
    tokio::fs::write(
        &path,
        "[simulator]\ntotal_steps = 5\nstep_delay_ms = 10\nfailure_rate = 0.25\n",
    )
    .await
    .unwrap();

    let config = Config::load(&path).await.unwrap();
    assert_eq!(config.simulator.total_steps, 5);
    assert_eq!(config.simulator.step_delay, Duration::from_millis(10));
    assert_eq!(config.simulator.failure_rate, 0.25);

    let _ = tokio::fs::remove_file(&path).await;
}

#[tokio::test]
async fn test_event_stream_yields_events() {
    let controller = make_controller(0.0, 1);
    let mut stream = controller.events();

    let id = controller
        .add_files(vec![png("a.png", 16)])
        .await
        .remove(0)
        .unwrap();
    controller.upload_single(id).await.unwrap();

    let mut saw_added = false;
    let mut saw_progress = false;

    loop {
        let event = tokio::time::timeout(Duration::from_millis(500), stream.next())
            .await
            .expect("event stream stalled")
            .expect("event stream closed");

        match event {
            QueueEvent::EntryAdded { id: added } => {
                assert_eq!(added, id);
                saw_added = true;
            }
            QueueEvent::Progress { .. } => saw_progress = true,
            QueueEvent::Completed { id: done, .. } => {
                assert_eq!(done, id);
                break;
            }
            _ => {}
        }
    }

    assert!(saw_added);
    assert!(saw_progress);
}
