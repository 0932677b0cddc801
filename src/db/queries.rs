use crate::models::{CatalogItem, DocumentRef, Project};
use sqlx::PgPool;

/// 按租户加载产品目录 (每次调用全量加载, 不跨请求缓存)
pub async fn list_catalog_items(
    pool: &PgPool,
    tenant: &str,
) -> Result<Vec<CatalogItem>, sqlx::Error> {
    sqlx::query_as::<_, CatalogItem>(
        r#"
        SELECT "ItemID" AS item_id,
               "itCode" AS it_code,
               "itTitle" AS it_title
        FROM "bcItems"
        WHERE "DatabaseID" = $1
        "#
    )
    .bind(tenant)
    .fetch_all(pool)
    .await
}

/// 按租户加载项目列表
pub async fn list_projects(
    pool: &PgPool,
    tenant: &str,
) -> Result<Vec<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        r#"
        SELECT "ProjectID" AS project_id,
               "pjTitle" AS pj_title,
               "pjAddress" AS pj_address
        FROM "bcProjects"
        WHERE "DatabaseID" = $1
        "#
    )
    .bind(tenant)
    .fetch_all(pool)
    .await
}

/// 按外部单据 id 查询是否已存在 (决定 Created / Updated 模式)
pub async fn get_document(
    pool: &PgPool,
    tenant: &str,
    document_id: &str,
) -> Result<Option<DocumentRef>, sqlx::Error> {
    sqlx::query_as::<_, DocumentRef>(
        r#"
        SELECT "DocumentID" AS document_id
        FROM "fnDocuments"
        WHERE "DatabaseID" = $1
          AND "DocumentID" = $2
        "#
    )
    .bind(tenant)
    .bind(document_id)
    .fetch_optional(pool)
    .await
}

/// 重复守卫: 按文件引用查已处理单据
///
/// 纯读操作, 从池里拿独立连接, 与文件下载并发执行。
/// 同一文件引用的并发请求仍可能双双通过 — 见 DESIGN.md 的竞态记录。
pub async fn find_document_by_file(
    pool: &PgPool,
    file_ref: &str,
) -> Result<Option<DocumentRef>, sqlx::Error> {
    sqlx::query_as::<_, DocumentRef>(
        r#"
        SELECT "DocumentID" AS document_id
        FROM "fnDocuments"
        WHERE "doFile" = $1
        LIMIT 1
        "#
    )
    .bind(file_ref)
    .fetch_optional(pool)
    .await
}
