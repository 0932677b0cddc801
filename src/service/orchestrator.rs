use crate::clients::{FileStore, InvoiceExtractor};
use crate::db::queries;
use crate::error::IntakeError;
use crate::service::upsert::{DocumentUpsertEngine, UpsertOutcome};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// 单次入库请求
#[derive(Debug, Clone)]
pub struct IntakeRequest {
    pub file_id: String,
    pub file_name: String,
    /// 覆盖配置默认租户
    pub tenant: Option<String>,
    /// 外部单据 id, 给了就走 upsert 的 Found -> Updated 分支
    pub document_id: Option<String>,
}

/// 编排结果: 跳过或处理完成
#[derive(Debug)]
pub enum IntakeOutcome {
    Skipped { document_id: String },
    Processed {
        outcome: UpsertOutcome,
        processing_seconds: f64,
    },
}

/// 请求编排器
///
/// 顺序保证: 重复检查结果先于任何 AI / 写入开销生效 —
/// 这是防止重复处理的正确性要求, 不只是省钱。
/// 重复检查与文件下载并发 (各自独立会话), join 之后全程串行。
pub struct IntakeOrchestrator {
    pool: PgPool,
    engine: DocumentUpsertEngine,
    files: Arc<dyn FileStore>,
    extractor: Arc<dyn InvoiceExtractor>,
    default_tenant: String,
    extract_timeout: Duration,
}

impl IntakeOrchestrator {
    pub fn new(
        pool: PgPool,
        files: Arc<dyn FileStore>,
        extractor: Arc<dyn InvoiceExtractor>,
        default_tenant: String,
        extract_timeout: Duration,
    ) -> Self {
        Self {
            engine: DocumentUpsertEngine::new(pool.clone()),
            pool,
            files,
            extractor,
            default_tenant,
            extract_timeout,
        }
    }

    pub async fn process(&self, request: &IntakeRequest) -> Result<IntakeOutcome, IntakeError> {
        let request_start = Instant::now();
        info!("Processing file {}", request.file_id);

        // Step 1+2: 重复检查 + 文件下载, 恰好两路并发, join 后再继续
        let stage = Instant::now();
        let (duplicate, fetched) = tokio::join!(
            queries::find_document_by_file(&self.pool, &request.file_id),
            self.files.fetch(&request.file_id),
        );
        info!(
            "Step 1+2 - duplicate check + file fetch (parallel): {:.2}s",
            stage.elapsed().as_secs_f64()
        );

        // 重复命中: 不触发 AI 提取, 不触发任何写入
        if let Some(existing) = duplicate? {
            info!(
                "File {} already processed as document {}, skipping",
                request.file_id, existing.document_id
            );
            return Ok(IntakeOutcome::Skipped {
                document_id: existing.document_id,
            });
        }

        let Some((content, meta)) = fetched else {
            return Err(IntakeError::FileNotFound(request.file_id.clone()));
        };
        info!(
            "Fetched {} ({}, {} bytes)",
            meta.name,
            meta.mime_type,
            content.len()
        );

        // Step 3: AI 提取, 带超时 — 超时是可恢复的单请求失败
        let stage = Instant::now();
        let payload =
            match tokio::time::timeout(self.extract_timeout, self.extractor.extract(&content))
                .await
            {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    return Err(IntakeError::Extraction(
                        "extractor returned no payload".to_string(),
                    ))
                }
                Err(_) => {
                    return Err(IntakeError::Extraction(format!(
                        "timed out after {}s",
                        self.extract_timeout.as_secs()
                    )))
                }
            };
        info!("Step 3 - AI extraction: {:.2}s", stage.elapsed().as_secs_f64());

        // Step 4: upsert, 单事务
        let tenant = request.tenant.as_deref().unwrap_or(&self.default_tenant);
        let stage = Instant::now();
        let outcome = self
            .engine
            .upsert(
                &payload,
                &request.file_id,
                request.document_id.as_deref(),
                tenant,
            )
            .await?;
        info!("Step 4 - document upsert: {:.2}s", stage.elapsed().as_secs_f64());

        let processing_seconds = request_start.elapsed().as_secs_f64();
        info!(
            "TOTAL: {:.2}s for file {} ({} lines)",
            processing_seconds, request.file_id, outcome.lines_count
        );

        Ok(IntakeOutcome::Processed {
            outcome,
            processing_seconds,
        })
    }
}
