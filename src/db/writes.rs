use crate::models::{Document, DocumentLine, InventoryMovement, PriceRecord};
use sqlx::{Postgres, Transaction};

/// 插入单据头 (Created 模式)
pub async fn insert_document(
    tx: &mut Transaction<'_, Postgres>,
    doc: &Document,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "fnDocuments" (
            "DocumentID", "DatabaseID", "doFile", "DriveID",
            "doDate", "doConsecutive", "doType",
            "doIssuer", "doReceptor", "doAccount", "CurrencyID",
            "doStatus", "doCreatedBy", "Bot",
            "doSubtotal", "doTaxes", "doTotal"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#
    )
    .bind(&doc.document_id)
    .bind(&doc.database_id)
    .bind(&doc.do_file)
    .bind(&doc.do_file)
    .bind(doc.do_date)
    .bind(&doc.do_consecutive)
    .bind(&doc.do_type)
    .bind(&doc.do_issuer)
    .bind(&doc.do_receptor)
    .bind(&doc.do_account)
    .bind(&doc.currency_id)
    .bind(&doc.do_status)
    .bind(&doc.do_created_by)
    .bind(&doc.bot)
    .bind(&doc.do_subtotal)
    .bind(&doc.do_taxes)
    .bind(&doc.do_total)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// 原地更新单据头 (Updated 模式), 汇总金额随头一次写入
pub async fn update_document(
    tx: &mut Transaction<'_, Postgres>,
    doc: &Document,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE "fnDocuments"
        SET "doFile" = $3, "DriveID" = $3,
            "doDate" = $4, "doConsecutive" = $5, "doType" = $6,
            "doIssuer" = $7, "doReceptor" = $8, "doAccount" = $9,
            "CurrencyID" = $10, "doStatus" = $11, "Bot" = $12,
            "doSubtotal" = $13, "doTaxes" = $14, "doTotal" = $15
        WHERE "DatabaseID" = $1
          AND "DocumentID" = $2
        "#
    )
    .bind(&doc.database_id)
    .bind(&doc.document_id)
    .bind(&doc.do_file)
    .bind(doc.do_date)
    .bind(&doc.do_consecutive)
    .bind(&doc.do_type)
    .bind(&doc.do_issuer)
    .bind(&doc.do_receptor)
    .bind(&doc.do_account)
    .bind(&doc.currency_id)
    .bind(&doc.do_status)
    .bind(&doc.bot)
    .bind(&doc.do_subtotal)
    .bind(&doc.do_taxes)
    .bind(&doc.do_total)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// 删除单据的全部旧明细行 (全量替换, 不做合并)
pub async fn delete_document_lines(
    tx: &mut Transaction<'_, Postgres>,
    tenant: &str,
    document_id: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM "fnDocumentsLns"
        WHERE "DatabaseID" = $1
          AND "DocumentID" = $2
        "#
    )
    .bind(tenant)
    .bind(document_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

/// 批量插入明细行
pub async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    lines: &[DocumentLine],
) -> Result<(), sqlx::Error> {
    if lines.is_empty() {
        return Ok(());
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        r#"INSERT INTO "fnDocumentsLns" (
            "DocumentLnID", "DatabaseID", "DocumentID", "dlNumber",
            "SupplyID", "CabysID", "dlDescription",
            "dlQuantity", "dlUnit", "dlUnitPrice", "dlDiscount",
            "dlSubtotal", "dlTaxes", "dlTotal", "dlObservations"
        ) "#
    );

    query_builder.push_values(lines, |mut b, line| {
        b.push_bind(&line.document_ln_id)
            .push_bind(&line.database_id)
            .push_bind(&line.document_id)
            .push_bind(line.dl_number)
            .push_bind(&line.supply_id)
            .push_bind(&line.cabys_id)
            .push_bind(&line.dl_description)
            .push_bind(line.dl_quantity.clone())
            .push_bind(&line.dl_unit)
            .push_bind(line.dl_unit_price.clone())
            .push_bind(line.dl_discount.clone())
            .push_bind(line.dl_subtotal.clone())
            .push_bind(line.dl_taxes.clone())
            .push_bind(line.dl_total.clone())
            .push_bind(&line.dl_observations);
    });

    query_builder.build().execute(&mut **tx).await?;
    Ok(())
}

/// 批量插入库存流水
pub async fn insert_movements(
    tx: &mut Transaction<'_, Postgres>,
    movements: &[InventoryMovement],
) -> Result<(), sqlx::Error> {
    if movements.is_empty() {
        return Ok(());
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        r#"INSERT INTO "icMovements" (
            "MovementID", "isDeleted", "DatabaseID", "OriginID", "ProjectID",
            "ItemID", "DocumentLnID", "mvDate", "mvAction",
            "mvQuantity", "mvStatus", "mvNotes", "mvCreatedby"
        ) "#
    );

    query_builder.push_values(movements, |mut b, mv| {
        b.push_bind(&mv.movement_id)
            .push_bind(false)
            .push_bind(&mv.database_id)
            .push_bind(&mv.origin_id)
            .push_bind(&mv.project_id)
            .push_bind(&mv.item_id)
            .push_bind(&mv.document_ln_id)
            .push_bind(mv.mv_date)
            .push_bind(&mv.mv_action)
            .push_bind(mv.mv_quantity.clone())
            .push_bind(&mv.mv_status)
            .push_bind(&mv.mv_notes)
            .push_bind(&mv.mv_created_by);
    });

    query_builder.build().execute(&mut **tx).await?;
    Ok(())
}

/// 批量插入价格流水
pub async fn insert_prices(
    tx: &mut Transaction<'_, Postgres>,
    prices: &[PriceRecord],
) -> Result<(), sqlx::Error> {
    if prices.is_empty() {
        return Ok(());
    }

    let mut query_builder = sqlx::QueryBuilder::new(
        r#"INSERT INTO "icPrices" (
            "PriceID", "isDeleted", "DatabaseID", "ItemID", "ProjectID",
            "MovementID", "prTitle", "prDescription",
            "prQuantity", "prPrice", "prTotal", "prCreatedby"
        ) "#
    );

    query_builder.push_values(prices, |mut b, pr| {
        b.push_bind(&pr.price_id)
            .push_bind(false)
            .push_bind(&pr.database_id)
            .push_bind(&pr.item_id)
            .push_bind(&pr.project_id)
            .push_bind(&pr.movement_id)
            .push_bind(&pr.pr_title)
            .push_bind(&pr.pr_description)
            .push_bind(pr.pr_quantity.clone())
            .push_bind(pr.pr_price.clone())
            .push_bind(pr.pr_total.clone())
            .push_bind(&pr.pr_created_by);
    });

    query_builder.build().execute(&mut **tx).await?;
    Ok(())
}
