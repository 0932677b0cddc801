use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 库存流水 (icMovements)
///
/// 仅当行解析到已知目录项 (非 "UNKNOWN") 时生成。
/// 超宽 id 字段静默截断到遗留短列宽度。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub movement_id: String,
    pub database_id: String,
    /// 单据 id, 截断到短列宽
    pub origin_id: String,
    pub project_id: Option<String>,
    /// 目录项 id, 截断到短列宽
    pub item_id: String,
    /// 来源明细行引用, 截断到短列宽
    pub document_ln_id: String,
    pub mv_date: DateTime<Utc>,
    /// 入库固定为 "IN"
    pub mv_action: String,
    pub mv_quantity: BigDecimal,
    pub mv_status: String,
    pub mv_notes: Option<String>,
    pub mv_created_by: String,
}

/// 价格流水 (icPrices), 与库存流水 1:1
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PriceRecord {
    pub price_id: String,
    pub database_id: String,
    pub item_id: String,
    pub project_id: Option<String>,
    /// 回引流水, 非归属
    pub movement_id: String,
    pub pr_title: Option<String>,
    pub pr_description: Option<String>,
    pub pr_quantity: BigDecimal,
    pub pr_price: BigDecimal,
    pub pr_total: BigDecimal,
    pub pr_created_by: String,
}
