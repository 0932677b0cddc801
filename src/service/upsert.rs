use crate::db::{queries, writes};
use crate::error::IntakeError;
use crate::models::{Document, DocumentLine, InventoryMovement, PriceRecord};
use crate::payload::ExtractedPayload;
use crate::service::matcher::{CatalogIndex, ProjectIndex, UNKNOWN_SUPPLY};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// 遗留短 id 列宽 (icMovements / icPrices)
const SHORT_ID_WIDTH: usize = 10;
/// prTitle 列宽
const PRICE_TITLE_WIDTH: usize = 150;

const DEFAULT_CURRENCY: &str = "CRC";
const DEFAULT_UNIT: &str = "Unid";
const DOC_STATUS_READY: &str = "READY_FOR_BOT";
const DOC_CREATED_BY: &str = "AI_MICROSERVICE";
const RECORD_CREATED_BY: &str = "AI_BOT";
const MOVEMENT_ACTION_IN: &str = "IN";
const MOVEMENT_STATUS_APPLIED: &str = "Applied";

/// 单据写入模式: NotFound -> Created, Found -> Updated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpsertMode {
    Created,
    Updated,
}

impl UpsertMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertMode::Created => "Created",
            UpsertMode::Updated => "Updated",
        }
    }
}

/// 一次 upsert 的结果
#[derive(Debug, Clone, Serialize)]
pub struct UpsertOutcome {
    pub document_id: String,
    pub mode: UpsertMode,
    pub lines_count: usize,
    pub matched_project: Option<String>,
    pub logs: Vec<String>,
}

/// 单据 upsert 引擎
///
/// 每次调用处理一份单据: 重建两个索引, 解析或生成单据头,
/// 全量替换明细, 派生库存/价格流水, 汇总金额, 单事务提交。
pub struct DocumentUpsertEngine {
    pool: PgPool,
}

impl DocumentUpsertEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(
        &self,
        payload: &ExtractedPayload,
        file_ref: &str,
        external_doc_id: Option<&str>,
        tenant: &str,
    ) -> Result<UpsertOutcome, IntakeError> {
        // Phase 1: 按租户重建索引 (不容忍过期目录)
        let catalog = CatalogIndex::load(&self.pool, tenant).await?;
        let projects = ProjectIndex::load(&self.pool, tenant).await?;

        // Phase 2: 解析单据 id 与写入模式
        let (document_id, mode) = match external_doc_id {
            Some(id) => match queries::get_document(&self.pool, tenant, id).await? {
                Some(_) => (id.to_string(), UpsertMode::Updated),
                None => (id.to_string(), UpsertMode::Created),
            },
            None => (short_token(), UpsertMode::Created),
        };

        // Phase 3: 纯计算 — 匹配、行金额、派生流水、汇总
        let plan = DocumentPlan::build(
            payload,
            &catalog,
            &projects,
            &document_id,
            file_ref,
            tenant,
            Utc::now(),
        );

        // Phase 4: 单事务提交, 部分写入不可观测
        let mut tx = self.pool.begin().await?;

        if mode == UpsertMode::Updated {
            let removed = writes::delete_document_lines(&mut tx, tenant, &document_id).await?;
            tracing::info!("Document {}: replacing {} prior lines", document_id, removed);
        }

        match mode {
            UpsertMode::Created => writes::insert_document(&mut tx, &plan.document).await?,
            UpsertMode::Updated => writes::update_document(&mut tx, &plan.document).await?,
        }

        writes::insert_lines(&mut tx, &plan.lines).await?;
        writes::insert_movements(&mut tx, &plan.movements).await?;
        writes::insert_prices(&mut tx, &plan.prices).await?;

        tx.commit().await?;

        tracing::info!(
            "Document {} {}: {} lines, {} movements, total {}",
            document_id,
            mode.as_str(),
            plan.lines.len(),
            plan.movements.len(),
            plan.document.do_total
        );

        Ok(UpsertOutcome {
            document_id,
            mode,
            lines_count: plan.lines.len(),
            matched_project: plan.matched_project,
            logs: plan.logs,
        })
    }
}

/// 一份单据的完整写入计划, 纯内存构建, 不做 I/O
struct DocumentPlan {
    document: Document,
    lines: Vec<DocumentLine>,
    movements: Vec<InventoryMovement>,
    prices: Vec<PriceRecord>,
    matched_project: Option<String>,
    logs: Vec<String>,
}

impl DocumentPlan {
    fn build(
        payload: &ExtractedPayload,
        catalog: &CatalogIndex,
        projects: &ProjectIndex,
        document_id: &str,
        file_ref: &str,
        tenant: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let header = &payload.header;
        let mut logs = Vec::new();

        // 日期降级策略: 解析失败取处理日, 记审计日志, 不报错
        let (do_date, degraded) = parse_document_date(header.do_date.as_deref(), now.date_naive());
        if degraded {
            logs.push(format!(
                "doDate {:?} not parseable, substituted processing date",
                header.do_date.as_deref().unwrap_or("")
            ));
        }

        // 项目按单据解析一次, 盖到每条派生流水上
        let address_text = [
            header.do_issuer_address.as_deref(),
            header.do_receptor_address.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
        let matched_project = projects.match_project(&address_text);
        if let Some(project_id) = &matched_project {
            logs.push(format!("Matched project {}", project_id));
        }

        let mut lines = Vec::with_capacity(payload.lines.len());
        let mut movements = Vec::new();
        let mut prices = Vec::new();

        let mut total_subtotal = BigDecimal::zero();
        let mut total_taxes = BigDecimal::zero();
        let mut total_doc = BigDecimal::zero();

        for (idx, line) in payload.lines.iter().enumerate() {
            let dl_number = (idx + 1) as i32;
            let description = line.description.as_deref().unwrap_or("");

            let (supply_id, method) =
                catalog.match_line(line.sku_candidate.as_deref(), description);

            let qty = dec(line.quantity);
            let unit_price = dec(line.unit_price);
            let discount = dec(line.discount_amount);
            let taxes = dec(line.tax_amount);

            let gross = &qty * &unit_price;
            let subtotal = &gross - &discount;
            let line_total = &subtotal + &taxes;

            let line_id = Uuid::new_v4().to_string();

            lines.push(DocumentLine {
                document_ln_id: line_id.clone(),
                database_id: tenant.to_string(),
                document_id: document_id.to_string(),
                dl_number,
                supply_id: supply_id.clone(),
                cabys_id: line.cabys_candidate.clone(),
                dl_description: line.description.clone(),
                dl_quantity: qty.clone(),
                dl_unit: DEFAULT_UNIT.to_string(),
                dl_unit_price: unit_price.clone(),
                dl_discount: discount,
                dl_subtotal: subtotal.clone(),
                dl_taxes: taxes.clone(),
                dl_total: line_total.clone(),
                dl_observations: Some(format!("Match: {}", method.label())),
            });

            logs.push(format!("Line {}: {} ({})", dl_number, supply_id, method.label()));

            // 仅非哨兵行派生流水, 1:1
            if supply_id != UNKNOWN_SUPPLY {
                let movement_id = short_token();

                movements.push(InventoryMovement {
                    movement_id: movement_id.clone(),
                    database_id: tenant.to_string(),
                    origin_id: truncate_to(document_id, SHORT_ID_WIDTH),
                    project_id: matched_project.clone(),
                    item_id: truncate_to(&supply_id, SHORT_ID_WIDTH),
                    document_ln_id: truncate_to(&line_id, SHORT_ID_WIDTH),
                    mv_date: now,
                    mv_action: MOVEMENT_ACTION_IN.to_string(),
                    mv_quantity: qty.clone(),
                    mv_status: MOVEMENT_STATUS_APPLIED.to_string(),
                    mv_notes: Some(format!("Document {} line {}", document_id, dl_number)),
                    mv_created_by: RECORD_CREATED_BY.to_string(),
                });

                prices.push(PriceRecord {
                    price_id: short_token(),
                    database_id: tenant.to_string(),
                    item_id: truncate_to(&supply_id, SHORT_ID_WIDTH),
                    project_id: matched_project.clone(),
                    movement_id,
                    pr_title: (!description.is_empty())
                        .then(|| truncate_to(description, PRICE_TITLE_WIDTH)),
                    pr_description: line.description.clone(),
                    pr_quantity: qty,
                    pr_price: unit_price,
                    pr_total: line_total.clone(),
                    pr_created_by: RECORD_CREATED_BY.to_string(),
                });
            }

            total_subtotal += &subtotal;
            total_taxes += &taxes;
            total_doc += &line_total;
        }

        let usage_note = payload
            .usage
            .as_ref()
            .map(|u| u.summary())
            .unwrap_or_else(|| "N/A".to_string());

        // 汇总金额循环后一次写入单据头
        let document = Document {
            document_id: document_id.to_string(),
            database_id: tenant.to_string(),
            do_file: file_ref.to_string(),
            do_date,
            do_consecutive: header.do_consecutive.clone(),
            do_type: header.do_type.clone(),
            do_issuer: header.do_issuer_id.clone(),
            do_receptor: header.do_receptor_id.clone(),
            do_account: header.do_account.clone(),
            currency_id: header
                .currency_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            do_status: DOC_STATUS_READY.to_string(),
            do_created_by: DOC_CREATED_BY.to_string(),
            bot: Some(format!("Processed by AI intake service. Usage: {}", usage_note)),
            do_subtotal: total_subtotal,
            do_taxes: total_taxes,
            do_total: total_doc,
        };

        Self {
            document,
            lines,
            movements,
            prices,
            matched_project,
            logs,
        }
    }
}

/// f64 -> BigDecimal, NaN/inf 落零 (宽松收窄, 与金额缺省一致)
fn dec(value: f64) -> BigDecimal {
    BigDecimal::try_from(value).unwrap_or_else(|_| BigDecimal::zero())
}

/// 8 位大写短 token (单据/流水/价格 id)
fn short_token() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

/// 按字符截断到遗留列宽, 超宽静默收窄而不是拒绝
fn truncate_to(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

/// 解析单据头日期, 失败降级为处理日 (返回 degraded 标志供审计)
fn parse_document_date(raw: Option<&str>, today: NaiveDate) -> (NaiveDate, bool) {
    match raw {
        Some(s) => match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
            Ok(date) => (date, false),
            Err(_) => (today, true),
        },
        None => (today, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogItem, Project};
    use crate::payload::{PayloadHeader, PayloadLine, TokenUsage};
    use std::str::FromStr;

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn catalog_with_gcp() -> CatalogIndex {
        CatalogIndex::from_items(vec![CatalogItem {
            item_id: "ITEM001".to_string(),
            it_code: Some("GCP".to_string()),
            it_title: Some("Cemento gris".to_string()),
        }])
    }

    fn empty_projects() -> ProjectIndex {
        ProjectIndex::from_projects(vec![])
    }

    fn line(sku: Option<&str>, description: &str, qty: f64, price: f64, discount: f64, tax: f64) -> PayloadLine {
        PayloadLine {
            sku_candidate: sku.map(String::from),
            cabys_candidate: None,
            description: Some(description.to_string()),
            quantity: qty,
            unit_price: price,
            discount_amount: discount,
            tax_amount: tax,
        }
    }

    fn build(payload: &ExtractedPayload, catalog: &CatalogIndex, projects: &ProjectIndex) -> DocumentPlan {
        DocumentPlan::build(payload, catalog, projects, "DOC-TEST-LONG-ID", "file-1", "BBJ", Utc::now())
    }

    #[test]
    fn concrete_scenario_exact_sku_line() {
        let payload = ExtractedPayload {
            header: PayloadHeader {
                do_date: Some("2024-03-01".to_string()),
                do_issuer_id: Some("3101123456".to_string()),
                do_type: Some("FE".to_string()),
                ..Default::default()
            },
            lines: vec![line(Some("GCP"), "Cement", 10.0, 5.0, 0.0, 6.5)],
            usage: None,
        };

        let plan = build(&payload, &catalog_with_gcp(), &empty_projects());

        assert_eq!(plan.document.do_total, amount("56.5"));
        assert_eq!(plan.document.do_subtotal, amount("50"));
        assert_eq!(plan.document.do_taxes, amount("6.5"));
        assert_eq!(plan.document.do_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());

        assert_eq!(plan.lines.len(), 1);
        let dl = &plan.lines[0];
        assert_eq!(dl.dl_subtotal, amount("50"));
        assert_eq!(dl.dl_total, amount("56.5"));
        assert_eq!(dl.supply_id, "ITEM001");
        assert_eq!(dl.dl_observations.as_deref(), Some("Match: Exact SKU"));
        assert_eq!(dl.dl_number, 1);

        assert_eq!(plan.movements.len(), 1);
        assert_eq!(plan.prices.len(), 1);
        assert_eq!(plan.movements[0].item_id, "ITEM001");
        assert_eq!(plan.movements[0].mv_action, "IN");
        assert_eq!(plan.movements[0].mv_status, "Applied");
        assert_eq!(plan.prices[0].item_id, "ITEM001");
        assert_eq!(plan.prices[0].movement_id, plan.movements[0].movement_id);
    }

    #[test]
    fn document_total_equals_sum_of_line_totals() {
        let payload = ExtractedPayload {
            lines: vec![
                line(Some("GCP"), "Cemento", 2.0, 100.0, 10.0, 24.7),
                line(None, "sin descripcion util", 3.0, 50.0, 0.0, 19.5),
            ],
            ..Default::default()
        };

        let plan = build(&payload, &catalog_with_gcp(), &empty_projects());

        let sum: BigDecimal = plan
            .lines
            .iter()
            .map(|l| l.dl_total.clone())
            .fold(BigDecimal::zero(), |acc, t| acc + t);
        assert_eq!(plan.document.do_total, sum);

        // 行不变式: subtotal = qty*price - discount, total = subtotal + tax
        assert_eq!(plan.lines[0].dl_subtotal, amount("190"));
        assert_eq!(plan.lines[0].dl_total, amount("214.7"));
        assert_eq!(plan.lines[1].dl_total, amount("169.5"));
    }

    #[test]
    fn unknown_line_yields_no_movement_or_price() {
        let payload = ExtractedPayload {
            lines: vec![line(None, "producto inexistente xyz", 1.0, 10.0, 0.0, 0.0)],
            ..Default::default()
        };

        let plan = build(&payload, &catalog_with_gcp(), &empty_projects());

        assert_eq!(plan.lines[0].supply_id, UNKNOWN_SUPPLY);
        assert_eq!(plan.lines[0].dl_observations.as_deref(), Some("Match: Raw SKU"));
        assert!(plan.movements.is_empty());
        assert!(plan.prices.is_empty());
        // 未匹配行照常入账
        assert_eq!(plan.document.do_total, amount("10"));
    }

    #[test]
    fn matched_lines_derive_movement_and_price_one_to_one() {
        let payload = ExtractedPayload {
            lines: vec![
                line(Some("GCP"), "Cemento", 1.0, 10.0, 0.0, 0.0),
                line(None, "nada que matchear aqui", 1.0, 5.0, 0.0, 0.0),
                line(Some("gcp "), "Cemento", 2.0, 10.0, 0.0, 0.0),
            ],
            ..Default::default()
        };

        let plan = build(&payload, &catalog_with_gcp(), &empty_projects());

        assert_eq!(plan.lines.len(), 3);
        assert_eq!(plan.movements.len(), 2);
        assert_eq!(plan.prices.len(), 2);
        for (mv, pr) in plan.movements.iter().zip(plan.prices.iter()) {
            assert_eq!(pr.movement_id, mv.movement_id);
        }
    }

    #[test]
    fn over_width_ids_are_silently_truncated() {
        let catalog = CatalogIndex::from_items(vec![CatalogItem {
            item_id: "ITEM-WITH-A-VERY-LONG-ID".to_string(),
            it_code: Some("LONG".to_string()),
            it_title: None,
        }]);
        let payload = ExtractedPayload {
            lines: vec![line(Some("LONG"), "algo", 1.0, 1.0, 0.0, 0.0)],
            ..Default::default()
        };

        let plan = build(&payload, &catalog, &empty_projects());

        let mv = &plan.movements[0];
        assert_eq!(mv.item_id, "ITEM-WITH-");
        assert_eq!(mv.item_id.chars().count(), SHORT_ID_WIDTH);
        assert_eq!(mv.origin_id, "DOC-TEST-L");
        assert_eq!(mv.document_ln_id.chars().count(), SHORT_ID_WIDTH);
        // 行上的 SupplyID 不截断, 只有流水/价格列收窄
        assert_eq!(plan.lines[0].supply_id, "ITEM-WITH-A-VERY-LONG-ID");
        assert_eq!(plan.prices[0].item_id, "ITEM-WITH-");
    }

    #[test]
    fn line_numbers_follow_payload_order() {
        let payload = ExtractedPayload {
            lines: vec![
                line(None, "a", 1.0, 1.0, 0.0, 0.0),
                line(None, "b", 1.0, 1.0, 0.0, 0.0),
                line(None, "c", 1.0, 1.0, 0.0, 0.0),
            ],
            ..Default::default()
        };

        let plan = build(&payload, &catalog_with_gcp(), &empty_projects());
        let numbers: Vec<i32> = plan.lines.iter().map(|l| l.dl_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn bad_date_degrades_to_processing_date_with_log() {
        let payload = ExtractedPayload {
            header: PayloadHeader {
                do_date: Some("01/03/2024".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let now = Utc::now();
        let plan = DocumentPlan::build(
            &payload,
            &catalog_with_gcp(),
            &empty_projects(),
            "DOC1",
            "file-1",
            "BBJ",
            now,
        );

        assert_eq!(plan.document.do_date, now.date_naive());
        assert!(plan.logs.iter().any(|l| l.contains("not parseable")));
    }

    #[test]
    fn project_is_stamped_on_every_derived_record() {
        let projects = ProjectIndex::from_projects(vec![Project {
            project_id: "PRJ07".to_string(),
            pj_title: Some("Torre Norte".to_string()),
            pj_address: Some("Avenida Central 450".to_string()),
        }]);
        let payload = ExtractedPayload {
            header: PayloadHeader {
                do_issuer_address: Some("Avenida Central 450".to_string()),
                ..Default::default()
            },
            lines: vec![
                line(Some("GCP"), "Cemento", 1.0, 10.0, 0.0, 0.0),
                line(Some("GCP"), "Cemento", 2.0, 10.0, 0.0, 0.0),
            ],
            usage: None,
        };

        let plan = build(&payload, &catalog_with_gcp(), &projects);

        assert_eq!(plan.matched_project.as_deref(), Some("PRJ07"));
        for mv in &plan.movements {
            assert_eq!(mv.project_id.as_deref(), Some("PRJ07"));
        }
        for pr in &plan.prices {
            assert_eq!(pr.project_id.as_deref(), Some("PRJ07"));
        }
    }

    #[test]
    fn usage_metadata_lands_in_audit_note() {
        let payload = ExtractedPayload {
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                candidates_tokens: 20,
                total_tokens: 120,
            }),
            ..Default::default()
        };

        let plan = build(&payload, &catalog_with_gcp(), &empty_projects());
        let note = plan.document.bot.unwrap();
        assert!(note.contains("prompt=100"));
        assert!(note.contains("total=120"));
    }

    #[test]
    fn currency_defaults_when_absent() {
        let plan = build(&ExtractedPayload::default(), &catalog_with_gcp(), &empty_projects());
        assert_eq!(plan.document.currency_id, "CRC");
        assert_eq!(plan.document.do_status, "READY_FOR_BOT");
    }

    #[test]
    fn parse_document_date_accepts_iso() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (date, degraded) = parse_document_date(Some("2024-03-01"), today);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(!degraded);

        let (date, degraded) = parse_document_date(None, today);
        assert_eq!(date, today);
        assert!(degraded);
    }

    #[test]
    fn short_token_is_eight_upper_chars() {
        let token = short_token();
        assert_eq!(token.len(), 8);
        assert_eq!(token, token.to_uppercase());
    }
}
