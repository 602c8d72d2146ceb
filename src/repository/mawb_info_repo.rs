// ==========================================
// 航空主运单草稿 - 主运单信息仓储（父文档）
// ==========================================
// 职责: 父文档存在性探测 / 查询 / 写入
// 说明: 方法接收显式的 &Connection（可以是事务内的连接）
// ==========================================

use crate::domain::mawb_info::MawbInfo;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ==========================================
// MawbInfoRepository - 父文档仓储
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct MawbInfoRepository;

impl MawbInfoRepository {
    pub fn new() -> Self {
        Self
    }

    /// 父文档是否存在
    pub fn exists(&self, conn: &Connection, mawb_info_id: &str) -> RepositoryResult<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM mawb_info WHERE mawb_info_id = ?1 LIMIT 1",
                params![mawb_info_id],
                |_row| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// 按 ID 查询父文档
    ///
    /// # 返回
    /// - `Ok(Some(MawbInfo))`: 找到
    /// - `Ok(None)`: 未找到
    pub fn find_by_id(
        &self,
        conn: &Connection,
        mawb_info_id: &str,
    ) -> RepositoryResult<Option<MawbInfo>> {
        let row = conn
            .query_row(
                r#"SELECT mawb_info_id, mawb_no, carrier_code, created_at
                   FROM mawb_info
                   WHERE mawb_info_id = ?1"#,
                params![mawb_info_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((mawb_info_id, mawb_no, carrier_code, created_at)) => {
                let created_at = NaiveDateTime::parse_from_str(&created_at, TS_FORMAT)
                    .map_err(|e| RepositoryError::FieldValueError {
                        field: "mawb_info.created_at".to_string(),
                        message: e.to_string(),
                    })?;
                Ok(Some(MawbInfo {
                    mawb_info_id,
                    mawb_no,
                    carrier_code,
                    created_at,
                }))
            }
            None => Ok(None),
        }
    }

    /// 写入父文档（外部流程 / 测试种子数据使用）
    pub fn insert(&self, conn: &Connection, info: &MawbInfo) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO mawb_info (mawb_info_id, mawb_no, carrier_code, created_at)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![
                &info.mawb_info_id,
                &info.mawb_no,
                &info.carrier_code,
                info.created_at.format(TS_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }
}
