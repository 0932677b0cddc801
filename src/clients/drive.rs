use crate::clients::{FileMeta, FileStore};
use crate::config::FileStoreConfig;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

/// Google Drive 文件客户端
///
/// 进程启动时构建一次, 注入使用 (不做隐藏单例)。只读访问。
pub struct DriveFileStore {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct DriveMeta {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "mimeType")]
    mime_type: String,
}

impl DriveFileStore {
    pub fn new(config: &FileStoreConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    /// 元数据 + 内容一次取回
    async fn download_with_validation(
        &self,
        file_id: &str,
    ) -> Result<(Vec<u8>, FileMeta), reqwest::Error> {
        // 元数据 (校验文件存在)
        let meta: DriveMeta = self
            .client
            .get(format!("{}/files/{}", self.base_url, file_id))
            .query(&[("fields", "name,mimeType")])
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // 内容 (同一客户端, 不重建连接)
        let content = self
            .client
            .get(format!("{}/files/{}", self.base_url, file_id))
            .query(&[("alt", "media")])
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok((
            content.to_vec(),
            FileMeta {
                name: meta.name,
                mime_type: meta.mime_type,
            },
        ))
    }
}

#[async_trait]
impl FileStore for DriveFileStore {
    async fn fetch(&self, file_id: &str) -> Option<(Vec<u8>, FileMeta)> {
        match self.download_with_validation(file_id).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Drive fetch failed for {}: {}", file_id, e);
                None
            }
        }
    }
}
