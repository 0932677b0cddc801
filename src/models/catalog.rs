use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 产品目录项 (bcItems)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CatalogItem {
    pub item_id: String,
    /// SKU 码, 租户内去空格大小写不敏感比较
    pub it_code: Option<String>,
    /// 展示标题, 仅用于模糊匹配, 不保证唯一
    pub it_title: Option<String>,
}

/// 项目 (bcProjects), 匹配键为 title + address 拼接
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub pj_title: Option<String>,
    pub pj_address: Option<String>,
}
