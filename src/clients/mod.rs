pub mod drive;
pub mod gemini;

use crate::payload::ExtractedPayload;
use async_trait::async_trait;

pub use drive::DriveFileStore;
pub use gemini::GeminiExtractor;

/// 文件元数据
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub name: String,
    pub mime_type: String,
}

/// 文件存储协作方
///
/// 任何失败 (不存在 / 鉴权 / I/O) 一律返回 None:
/// 管线无法区分失败原因, 对本次请求视为不可恢复。
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn fetch(&self, file_id: &str) -> Option<(Vec<u8>, FileMeta)>;
}

/// AI 提取协作方, None 表示提取或解析失败, 必须在任何写入前中止请求
#[async_trait]
pub trait InvoiceExtractor: Send + Sync {
    async fn extract(&self, content: &[u8]) -> Option<ExtractedPayload>;
}
