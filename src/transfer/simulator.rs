use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::core::{FileSource, Result, UploadError, UploadedRecord};

// 用于以毫秒序列化 Duration
fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

/// 模拟传输参数。步数、间隔和失败率是演示参数，不属于接口契约
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// 总步数
    pub total_steps: u32,
    /// 每步间隔
    #[serde(
        rename = "step_delay_ms",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub step_delay: Duration,
    /// 失败概率 0.0-1.0
    pub failure_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            total_steps: 10,
            step_delay: Duration::from_millis(200),
            failure_rate: 0.05,
        }
    }
}

/// 假网络传输。真实实现需要保留的只有接口形状：
/// 进度走回调通道，结果是带取消的异步结清
#[derive(Debug, Clone, Default)]
pub struct TransferSimulator {
    config: SimulatorConfig,
}

impl TransferSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// 按固定步长把进度从 0% 推到 100%，在 70% 那一步按配置概率失败。
    /// 取消信号在步间生效，之后不再发任何进度
    pub async fn run(
        &self,
        file: &dyn FileSource,
        progress_tx: mpsc::UnboundedSender<u8>,
        cancel: CancellationToken,
    ) -> Result<UploadedRecord> {
        let total_steps = self.config.total_steps.max(1);
        let failure_step = (total_steps as f64 * 0.7).floor() as u32;

        for step in 0..=total_steps {
            tokio::select! {
                _ = sleep(self.config.step_delay) => {}
                _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            }

            let progress = ((step as f64 / total_steps as f64) * 100.0).round() as u8;
            let _ = progress_tx.send(progress);

            if step == failure_step && rand::random::<f64>() < self.config.failure_rate {
                return Err(UploadError::TransferFailed("Network error".to_string()));
            }
        }

        let id = Uuid::new_v4();
        let url = Url::parse(&format!("https://files.dropzone.local/{id}"))
            .map_err(|err| UploadError::internal(format!("bad object url: {err}")))?;

        Ok(UploadedRecord {
            id,
            name: file.name().to_string(),
            size: file.size(),
            mime_type: file.mime_type().to_string(),
            uploaded_at: Utc::now(),
            url,
        })
    }
}
