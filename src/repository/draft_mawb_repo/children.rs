use crate::domain::draft_mawb::{DraftMawbCharge, DraftMawbDimension, DraftMawbItem};
use crate::domain::types::ChargeKey;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashMap;

// SQLite 旧版本默认 SQLITE_MAX_VARIABLE_NUMBER = 999,按此上限分块
const MAX_BIND_PARAMS: usize = 999;

const ITEM_COLUMNS: &[&str] = &[
    "draft_id",
    "line_no",
    "pieces",
    "gross_weight",
    "weight_unit",
    "rate_class",
    "rate_charge",
    "commodity_description",
    "volumetric_weight",
    "chargeable_weight",
    "total",
];

const DIMENSION_COLUMNS: &[&str] = &["item_id", "line_no", "length", "width", "height", "count"];

const CHARGE_COLUMNS: &[&str] = &["draft_id", "line_no", "charge_key", "value"];

// ==========================================
// 批量写入
// ==========================================

/// 每条 INSERT 最多容纳的行数
fn rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns).max(1)
}

/// 多行 INSERT: `INSERT INTO t (a, b) VALUES (?, ?), (?, ?)`
fn multi_row_insert_sql(table: &str, columns: &[&str], rows: usize) -> String {
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        vec![placeholders; rows].join(", ")
    )
}

/// 删除草稿下的全部明细（级联尺寸）与费用
///
/// # 返回
/// - (删除的明细数, 删除的费用数)
pub(super) fn delete_all(conn: &Connection, draft_id: &str) -> RepositoryResult<(usize, usize)> {
    let items = conn.execute("DELETE FROM draft_mawb_item WHERE draft_id = ?1", params![draft_id])?;
    let charges = conn.execute("DELETE FROM draft_mawb_charge WHERE draft_id = ?1", params![draft_id])?;
    Ok((items, charges))
}

/// 批量插入明细
///
/// # 返回
/// - 按明细顺序排列的 item_id（由 `RETURNING item_id, line_no` 回填）
pub(super) fn insert_items(
    conn: &Connection,
    draft_id: &str,
    items: &[DraftMawbItem],
) -> RepositoryResult<Vec<i64>> {
    let mut ids: Vec<Option<i64>> = vec![None; items.len()];
    let chunk_size = rows_per_statement(ITEM_COLUMNS.len());

    for (chunk_idx, chunk) in items.chunks(chunk_size).enumerate() {
        let base = chunk_idx * chunk_size;
        let sql = format!(
            "{} RETURNING item_id, line_no",
            multi_row_insert_sql("draft_mawb_item", ITEM_COLUMNS, chunk.len())
        );

        let mut values: Vec<Value> = Vec::with_capacity(chunk.len() * ITEM_COLUMNS.len());
        for (offset, item) in chunk.iter().enumerate() {
            values.extend([
                Value::Text(draft_id.to_string()),
                Value::Integer((base + offset) as i64),
                Value::Integer(item.pieces),
                Value::Text(item.gross_weight.clone()),
                Value::Text(item.weight_unit.clone()),
                Value::Text(item.rate_class.clone()),
                Value::Real(item.rate_charge),
                Value::Text(item.commodity_description.clone()),
                Value::Real(item.volumetric_weight),
                Value::Real(item.chargeable_weight),
                Value::Real(item.total),
            ]);
        }

        let mut stmt = conn.prepare(&sql)?;
        let returned = stmt.query_map(params_from_iter(values), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        // RETURNING 的行序不保证与 VALUES 一致,按 line_no 回填
        for r in returned {
            let (item_id, line_no) = r?;
            let slot = usize::try_from(line_no)
                .ok()
                .and_then(|idx| ids.get_mut(idx))
                .ok_or_else(|| {
                    RepositoryError::InternalError(format!("RETURNING 返回越界 line_no={}", line_no))
                })?;
            *slot = Some(item_id);
        }
    }

    ids.into_iter()
        .enumerate()
        .map(|(idx, id)| {
            id.ok_or_else(|| {
                RepositoryError::InternalError(format!("明细 line_no={} 未返回 item_id", idx))
            })
        })
        .collect()
}

/// 批量插入全部明细的尺寸
///
/// # 参数
/// - item_ids: 与 `items` 一一对应的 item_id
pub(super) fn insert_dimensions(
    conn: &Connection,
    item_ids: &[i64],
    items: &[DraftMawbItem],
) -> RepositoryResult<usize> {
    if item_ids.len() != items.len() {
        return Err(RepositoryError::InternalError(format!(
            "item_id 数量({})与明细数量({})不一致",
            item_ids.len(),
            items.len()
        )));
    }

    let rows: Vec<[Value; 6]> = item_ids
        .iter()
        .zip(items)
        .flat_map(|(item_id, item)| {
            item.dimensions.iter().enumerate().map(move |(line_no, dim)| {
                [
                    Value::Integer(*item_id),
                    Value::Integer(line_no as i64),
                    Value::Text(dim.length.clone()),
                    Value::Text(dim.width.clone()),
                    Value::Text(dim.height.clone()),
                    Value::Text(dim.count.clone()),
                ]
            })
        })
        .collect();

    insert_rows(conn, "draft_mawb_item_dimension", DIMENSION_COLUMNS, rows)
}

/// 批量插入费用
pub(super) fn insert_charges(
    conn: &Connection,
    draft_id: &str,
    charges: &[DraftMawbCharge],
) -> RepositoryResult<usize> {
    let rows: Vec<[Value; 4]> = charges
        .iter()
        .enumerate()
        .map(|(line_no, charge)| {
            [
                Value::Text(draft_id.to_string()),
                Value::Integer(line_no as i64),
                Value::Text(charge.key.to_db_str().to_string()),
                Value::Real(charge.value),
            ]
        })
        .collect();

    insert_rows(conn, "draft_mawb_charge", CHARGE_COLUMNS, rows)
}

fn insert_rows<const N: usize>(
    conn: &Connection,
    table: &str,
    columns: &[&str],
    rows: Vec<[Value; N]>,
) -> RepositoryResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    for chunk in rows.chunks(rows_per_statement(columns.len())) {
        let sql = multi_row_insert_sql(table, columns, chunk.len());
        let values = chunk.iter().flat_map(|row| row.iter().cloned());
        inserted += conn.execute(&sql, params_from_iter(values))?;
    }
    Ok(inserted)
}

// ==========================================
// 读取
// ==========================================

/// 读取草稿下全部明细及其尺寸（均按 line_no 排序）
pub(super) fn load_items(conn: &Connection, draft_id: &str) -> RepositoryResult<Vec<DraftMawbItem>> {
    let mut stmt = conn.prepare(
        r#"SELECT item_id, pieces, gross_weight, weight_unit, rate_class, rate_charge,
                  commodity_description, volumetric_weight, chargeable_weight, total
           FROM draft_mawb_item
           WHERE draft_id = ?1
           ORDER BY line_no"#,
    )?;
    let mut items = stmt
        .query_map(params![draft_id], |row| {
            Ok(DraftMawbItem {
                item_id: Some(row.get(0)?),
                pieces: row.get(1)?,
                gross_weight: row.get(2)?,
                weight_unit: row.get(3)?,
                rate_class: row.get(4)?,
                rate_charge: row.get(5)?,
                commodity_description: row.get(6)?,
                volumetric_weight: row.get(7)?,
                chargeable_weight: row.get(8)?,
                total: row.get(9)?,
                dimensions: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if items.is_empty() {
        return Ok(items);
    }

    let index_by_id: HashMap<i64, usize> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| item.item_id.map(|id| (id, idx)))
        .collect();

    let mut stmt = conn.prepare(
        r#"SELECT d.item_id, d.dimension_id, d.length, d.width, d.height, d.count
           FROM draft_mawb_item_dimension d
           JOIN draft_mawb_item i ON i.item_id = d.item_id
           WHERE i.draft_id = ?1
           ORDER BY i.line_no, d.line_no"#,
    )?;
    let dims = stmt.query_map(params![draft_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            DraftMawbDimension {
                dimension_id: Some(row.get(1)?),
                length: row.get(2)?,
                width: row.get(3)?,
                height: row.get(4)?,
                count: row.get(5)?,
            },
        ))
    })?;

    for r in dims {
        let (item_id, dim) = r?;
        let idx = index_by_id.get(&item_id).copied().ok_or_else(|| {
            RepositoryError::InternalError(format!("尺寸引用了未知明细 item_id={}", item_id))
        })?;
        items[idx].dimensions.push(dim);
    }

    Ok(items)
}

/// 读取草稿下全部费用（按 line_no 排序）
pub(super) fn load_charges(conn: &Connection, draft_id: &str) -> RepositoryResult<Vec<DraftMawbCharge>> {
    let mut stmt = conn.prepare(
        r#"SELECT charge_id, charge_key, value
           FROM draft_mawb_charge
           WHERE draft_id = ?1
           ORDER BY line_no"#,
    )?;
    let charges = stmt
        .query_map(params![draft_id], |row| {
            let raw_key: String = row.get(1)?;
            let key = ChargeKey::parse(&raw_key).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    format!("未知的费用键: {}", raw_key).into(),
                )
            })?;
            Ok(DraftMawbCharge {
                charge_id: Some(row.get(0)?),
                key,
                value: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(charges)
}
