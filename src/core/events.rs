use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{broadcast, mpsc};
use url::Url;

use super::types::{BatchReport, EntryId, UploadStatus};

/// 队列事件，展示层通过它驱动界面更新
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// 条目已加入队列
    EntryAdded { id: EntryId },
    /// 条目已移除
    EntryRemoved { id: EntryId },
    /// 状态变更
    StatusChanged {
        id: EntryId,
        old: UploadStatus,
        new: UploadStatus,
    },
    /// 进度更新
    Progress { id: EntryId, progress: u8 },
    /// 上传完成
    Completed { id: EntryId, url: Url },
    /// 上传失败
    Failed { id: EntryId, error: String },
    /// 上传被取消，条目回到 Pending
    Cancelled { id: EntryId },
    /// 队列被清空
    Cleared,
    /// 一次 upload_all 批次结束
    BatchFinished(BatchReport),
}

/// `Stream` adapter over the controller's broadcast channel. A forwarder
/// task drains the broadcast receiver into an unbounded mpsc so lagging
/// consumers only drop events instead of erroring.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<QueueEvent>,
}

impl EventStream {
    pub(crate) fn new(mut source: broadcast::Receiver<QueueEvent>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { rx }
    }
}

impl Stream for EventStream {
    type Item = QueueEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
