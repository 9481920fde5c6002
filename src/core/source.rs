use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::errors::Result;

/// 文件输入抽象。拖放或文件选择得到的句柄都实现它：
/// 文件名、字节大小、MIME 类型和一个可读的字节源
#[async_trait]
pub trait FileSource: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn size(&self) -> u64;

    fn mime_type(&self) -> &str;

    /// Read the full contents of the file.
    async fn read_bytes(&self) -> std::io::Result<Bytes>;
}

/// 内存文件，等价于浏览器里的 File 对象
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    mime_type: String,
    data: Bytes,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn read_bytes(&self) -> std::io::Result<Bytes> {
        Ok(self.data.clone())
    }
}

/// 磁盘文件。大小在打开时读取，MIME 按扩展名推断
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
    size: u64,
    mime_type: String,
}

impl DiskFile {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("not a file: {}", path.display()),
            )
            .into());
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            path,
            name,
            size: metadata.len(),
            mime_type,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn read_bytes(&self) -> std::io::Result<Bytes> {
        let data = tokio::fs::read(&self.path).await?;
        Ok(Bytes::from(data))
    }
}
