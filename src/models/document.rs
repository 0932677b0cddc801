use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 单据头 (fnDocuments)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub database_id: String,
    /// 来源文件引用, 重复检查的键
    pub do_file: String,
    pub do_date: NaiveDate,
    pub do_consecutive: Option<String>,
    /// "FE" 或 "NC"
    pub do_type: Option<String>,
    pub do_issuer: Option<String>,
    pub do_receptor: Option<String>,
    pub do_account: Option<String>,
    pub currency_id: String,
    pub do_status: String,
    pub do_created_by: String,
    /// 审计注记, 含 AI token 用量
    pub bot: Option<String>,
    pub do_subtotal: BigDecimal,
    pub do_taxes: BigDecimal,
    pub do_total: BigDecimal,
}

/// 重复检查 / 存在性查询的轻量行
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
}

/// 单据明细行 (fnDocumentsLns)
///
/// 不变式: dl_subtotal = dl_quantity * dl_unit_price - dl_discount,
/// dl_total = dl_subtotal + dl_taxes。行归属单据独占,
/// 原地更新时先删旧行再写新行。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DocumentLine {
    pub document_ln_id: String,
    pub database_id: String,
    pub document_id: String,
    /// 1 起始, 连续无空洞, 取 AI 输出顺序
    pub dl_number: i32,
    /// 解析出的目录项 id, 或 "UNKNOWN" 哨兵
    pub supply_id: String,
    pub cabys_id: Option<String>,
    pub dl_description: Option<String>,
    pub dl_quantity: BigDecimal,
    pub dl_unit: String,
    pub dl_unit_price: BigDecimal,
    pub dl_discount: BigDecimal,
    pub dl_subtotal: BigDecimal,
    pub dl_taxes: BigDecimal,
    pub dl_total: BigDecimal,
    /// 匹配方式标签 "Match: {method}"
    pub dl_observations: Option<String>,
}
