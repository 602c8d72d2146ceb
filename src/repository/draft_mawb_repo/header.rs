use crate::domain::draft_mawb::DraftMawb;
use crate::domain::types::DraftMawbStatus;
use crate::repository::error::RepositoryResult;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};

pub(super) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = r#"draft_id, mawb_info_id,
    shipper_name_address, consignee_name_address, issuing_carrier_agent, agent_iata_code,
    airport_of_departure, airport_of_destination, routing_to, routing_by, flight_no, flight_date,
    currency, charges_code, declared_value_carriage, declared_value_customs, insurance_amount,
    handling_information,
    shipper_signature, carrier_signature, executed_on, executed_at,
    total_pieces, total_gross_weight, total_chargeable_weight, total_amount,
    status, created_at, updated_at"#;

// ==========================================
// HeaderStamp - 头行身份与时间戳
// ==========================================
// 首次写入时生成; 更新时沿用 draft_id / created_at / status
#[derive(Debug, Clone, PartialEq)]
pub(super) struct HeaderStamp {
    pub draft_id: String,
    pub status: DraftMawbStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 查询父文档下已有头行的身份信息
pub(super) fn find_stamp_by_parent(
    conn: &Connection,
    parent_id: &str,
) -> RepositoryResult<Option<HeaderStamp>> {
    let stamp = conn
        .query_row(
            r#"SELECT draft_id, status, created_at, updated_at
               FROM draft_mawb
               WHERE mawb_info_id = ?1"#,
            params![parent_id],
            |row| {
                Ok(HeaderStamp {
                    draft_id: row.get(0)?,
                    status: parse_status(row, 1)?,
                    created_at: parse_ts(row, 2)?,
                    updated_at: parse_ts(row, 3)?,
                })
            },
        )
        .optional()?;
    Ok(stamp)
}

/// 按父文档 ID 查询头行（不含子表）
pub(super) fn find_by_parent(conn: &Connection, parent_id: &str) -> RepositoryResult<Option<DraftMawb>> {
    let sql = format!("SELECT {} FROM draft_mawb WHERE mawb_info_id = ?1", SELECT_COLUMNS);
    let header = conn.query_row(&sql, params![parent_id], map_row).optional()?;
    Ok(header)
}

/// 插入头行
pub(super) fn insert(conn: &Connection, draft: &DraftMawb, stamp: &HeaderStamp) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO draft_mawb (
            draft_id, mawb_info_id,
            shipper_name_address, consignee_name_address, issuing_carrier_agent, agent_iata_code,
            airport_of_departure, airport_of_destination, routing_to, routing_by, flight_no, flight_date,
            currency, charges_code, declared_value_carriage, declared_value_customs, insurance_amount,
            handling_information,
            shipper_signature, carrier_signature, executed_on, executed_at,
            total_pieces, total_gross_weight, total_chargeable_weight, total_amount,
            status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                  ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)"#,
        params![
            &stamp.draft_id,
            &draft.mawb_info_id,
            &draft.shipper_name_address,
            &draft.consignee_name_address,
            &draft.issuing_carrier_agent,
            &draft.agent_iata_code,
            &draft.airport_of_departure,
            &draft.airport_of_destination,
            &draft.routing_to,
            &draft.routing_by,
            &draft.flight_no,
            format_date(draft.flight_date),
            &draft.currency,
            &draft.charges_code,
            &draft.declared_value_carriage,
            &draft.declared_value_customs,
            &draft.insurance_amount,
            &draft.handling_information,
            &draft.shipper_signature,
            &draft.carrier_signature,
            format_date(draft.executed_on),
            &draft.executed_at,
            draft.total_pieces,
            draft.total_gross_weight,
            draft.total_chargeable_weight,
            draft.total_amount,
            stamp.status.to_db_str(),
            stamp.created_at.format(TS_FORMAT).to_string(),
            stamp.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// 更新头行的可变列（draft_id / mawb_info_id / status / created_at 不变）
///
/// # 返回
/// - 受影响行数
pub(super) fn update(conn: &Connection, draft: &DraftMawb, stamp: &HeaderStamp) -> RepositoryResult<usize> {
    let affected = conn.execute(
        r#"UPDATE draft_mawb SET
            shipper_name_address = ?2,
            consignee_name_address = ?3,
            issuing_carrier_agent = ?4,
            agent_iata_code = ?5,
            airport_of_departure = ?6,
            airport_of_destination = ?7,
            routing_to = ?8,
            routing_by = ?9,
            flight_no = ?10,
            flight_date = ?11,
            currency = ?12,
            charges_code = ?13,
            declared_value_carriage = ?14,
            declared_value_customs = ?15,
            insurance_amount = ?16,
            handling_information = ?17,
            shipper_signature = ?18,
            carrier_signature = ?19,
            executed_on = ?20,
            executed_at = ?21,
            total_pieces = ?22,
            total_gross_weight = ?23,
            total_chargeable_weight = ?24,
            total_amount = ?25,
            updated_at = ?26
           WHERE draft_id = ?1"#,
        params![
            &stamp.draft_id,
            &draft.shipper_name_address,
            &draft.consignee_name_address,
            &draft.issuing_carrier_agent,
            &draft.agent_iata_code,
            &draft.airport_of_departure,
            &draft.airport_of_destination,
            &draft.routing_to,
            &draft.routing_by,
            &draft.flight_no,
            format_date(draft.flight_date),
            &draft.currency,
            &draft.charges_code,
            &draft.declared_value_carriage,
            &draft.declared_value_customs,
            &draft.insurance_amount,
            &draft.handling_information,
            &draft.shipper_signature,
            &draft.carrier_signature,
            format_date(draft.executed_on),
            &draft.executed_at,
            draft.total_pieces,
            draft.total_gross_weight,
            draft.total_chargeable_weight,
            draft.total_amount,
            stamp.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(affected)
}

/// 映射数据库行到 DraftMawb（子表为空,由调用方装载）
fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DraftMawb> {
    Ok(DraftMawb {
        draft_id: row.get(0)?,
        mawb_info_id: row.get(1)?,
        shipper_name_address: row.get(2)?,
        consignee_name_address: row.get(3)?,
        issuing_carrier_agent: row.get(4)?,
        agent_iata_code: row.get(5)?,
        airport_of_departure: row.get(6)?,
        airport_of_destination: row.get(7)?,
        routing_to: row.get(8)?,
        routing_by: row.get(9)?,
        flight_no: row.get(10)?,
        flight_date: parse_date(row, 11)?,
        currency: row.get(12)?,
        charges_code: row.get(13)?,
        declared_value_carriage: row.get(14)?,
        declared_value_customs: row.get(15)?,
        insurance_amount: row.get(16)?,
        handling_information: row.get(17)?,
        shipper_signature: row.get(18)?,
        carrier_signature: row.get(19)?,
        executed_on: parse_date(row, 20)?,
        executed_at: row.get(21)?,
        total_pieces: row.get(22)?,
        total_gross_weight: row.get(23)?,
        total_chargeable_weight: row.get(24)?,
        total_amount: row.get(25)?,
        status: parse_status(row, 26)?,
        created_at: parse_ts(row, 27)?,
        updated_at: parse_ts(row, 28)?,
        items: Vec::new(),
        charges: Vec::new(),
    })
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn parse_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(s) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map(Some)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
            }),
        None => Ok(None),
    }
}

fn parse_ts(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&row.get::<_, String>(idx)?, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_status(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DraftMawbStatus> {
    let raw: String = row.get(idx)?;
    DraftMawbStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("未知的草稿状态: {}", raw).into(),
        )
    })
}
