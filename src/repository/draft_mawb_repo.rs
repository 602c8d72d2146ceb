// ==========================================
// 航空主运单草稿 - 聚合仓储
// ==========================================
// 聚合: draft_mawb → draft_mawb_item → draft_mawb_item_dimension
//                 └→ draft_mawb_charge
// 红线:
// - CreateOrUpdate 整棵树在一个事务内完成,失败必须回滚到调用前状态
// - 子表不做 diff,每次更新全部删除后重建
// - 存储句柄由调用方显式传入 (&Connection / &mut Connection)
// ==========================================

mod children;
mod header;

use crate::db::Deadline;
use crate::domain::draft_mawb::DraftMawb;
use crate::domain::types::DraftMawbStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::mawb_info_repo::MawbInfoRepository;
use chrono::{Local, NaiveDateTime, Timelike};
use header::HeaderStamp;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use tracing::instrument;
use uuid::Uuid;

const ENTITY: &str = "DraftMawb";

// ==========================================
// DraftMawbRepository - 草稿聚合仓储
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftMawbRepository {
    parents: MawbInfoRepository,
}

impl DraftMawbRepository {
    /// 创建新的 DraftMawbRepository 实例
    pub fn new() -> Self {
        Self {
            parents: MawbInfoRepository::new(),
        }
    }

    /// 按父文档 ID 读取完整聚合
    ///
    /// # 返回
    /// - `Ok(DraftMawb)`: 头行 + 明细(含尺寸) + 费用,子表按插入顺序
    /// - `Err(NotFound)`: 父文档下没有草稿
    #[instrument(skip(self, conn, deadline))]
    pub fn get_by_parent_id(
        &self,
        conn: &Connection,
        parent_id: &str,
        deadline: Deadline,
    ) -> RepositoryResult<DraftMawb> {
        deadline.check("load_header")?;
        let mut draft = header::find_by_parent(conn, parent_id)?
            .ok_or_else(|| RepositoryError::not_found(ENTITY, parent_id))?;

        deadline.check("load_items")?;
        draft.items = children::load_items(conn, &draft.draft_id)?;

        deadline.check("load_charges")?;
        draft.charges = children::load_charges(conn, &draft.draft_id)?;

        tracing::debug!(
            draft_id = %draft.draft_id,
            items = draft.items.len(),
            charges = draft.charges.len(),
            "草稿聚合已加载"
        );
        Ok(draft)
    }

    /// 查询父文档下草稿的当前状态（不加载子表）
    ///
    /// # 返回
    /// - `Ok(None)`: 尚未创建草稿
    pub fn find_status_by_parent_id(
        &self,
        conn: &Connection,
        parent_id: &str,
        deadline: Deadline,
    ) -> RepositoryResult<Option<DraftMawbStatus>> {
        deadline.check("load_status")?;
        Ok(header::find_stamp_by_parent(conn, parent_id)?.map(|s| s.status))
    }

    /// 创建或整体替换草稿聚合
    ///
    /// # 流程（单事务）
    /// 1. 父文档存在性检查 → ParentNotFound
    /// 2. 查询已有头行: 无则生成 ID 插入; 有则沿用 ID/创建时间更新头行并删除全部子行
    /// 3. 批量插入明细,回填 item_id 后批量插入尺寸
    /// 4. 批量插入费用
    /// 5. 提交
    ///
    /// 任一步骤失败（含截止时间到期）事务在 drop 时回滚,`draft` 保持原样
    ///
    /// # 返回
    /// - `Ok(draft_id)`; 成功时 `draft` 的 ID / 状态 / 时间戳 / item_id 被回填
    #[instrument(skip(self, conn, draft, deadline), fields(mawb_info_id = %draft.mawb_info_id))]
    pub fn create_or_update(
        &self,
        conn: &mut Connection,
        draft: &mut DraftMawb,
        deadline: Deadline,
    ) -> RepositoryResult<String> {
        deadline.check("begin")?;
        // IMMEDIATE: 开始即持有写锁,避免并发写者在锁升级时互相 busy
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        match self.write_tree(&tx, draft, deadline) {
            Ok((stamp, item_ids)) => {
                deadline.check("commit")?;
                tx.commit()
                    .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

                for (item, id) in draft.items.iter_mut().zip(&item_ids) {
                    item.item_id = Some(*id);
                }
                draft.draft_id = stamp.draft_id.clone();
                draft.status = stamp.status;
                draft.created_at = stamp.created_at;
                draft.updated_at = stamp.updated_at;

                tracing::info!(
                    draft_id = %stamp.draft_id,
                    items = draft.items.len(),
                    charges = draft.charges.len(),
                    "草稿聚合已保存"
                );
                Ok(stamp.draft_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "草稿聚合保存失败,事务回滚");
                Err(e)
            }
        }
    }

    fn write_tree(
        &self,
        tx: &Transaction<'_>,
        draft: &DraftMawb,
        deadline: Deadline,
    ) -> RepositoryResult<(HeaderStamp, Vec<i64>)> {
        deadline.check("parent_check")?;
        if !self.parents.exists(tx, &draft.mawb_info_id)? {
            return Err(RepositoryError::ParentNotFound {
                parent_id: draft.mawb_info_id.clone(),
            });
        }

        deadline.check("header_write")?;
        let now = now_seconds();
        let stamp = match header::find_stamp_by_parent(tx, &draft.mawb_info_id)? {
            None => {
                let stamp = HeaderStamp {
                    draft_id: Uuid::new_v4().to_string(),
                    status: DraftMawbStatus::Draft,
                    created_at: now,
                    updated_at: now,
                };
                header::insert(tx, draft, &stamp)?;
                stamp
            }
            Some(existing) => {
                if existing.status.is_terminal() {
                    return Err(RepositoryError::BusinessRuleViolation(format!(
                        "草稿已处于终态 {},不可修改",
                        existing.status
                    )));
                }
                let stamp = HeaderStamp {
                    updated_at: now,
                    ..existing
                };
                header::update(tx, draft, &stamp)?;

                deadline.check("delete_children")?;
                let (items, charges) = children::delete_all(tx, &stamp.draft_id)?;
                tracing::debug!(items, charges, "已删除旧子行");
                stamp
            }
        };

        deadline.check("insert_items")?;
        let item_ids = children::insert_items(tx, &stamp.draft_id, &draft.items)?;

        deadline.check("insert_dimensions")?;
        children::insert_dimensions(tx, &item_ids, &draft.items)?;

        deadline.check("insert_charges")?;
        children::insert_charges(tx, &stamp.draft_id, &draft.charges)?;

        Ok((stamp, item_ids))
    }

    /// 更新草稿状态
    ///
    /// # 参数
    /// - new_status: 状态字符串,必须属于固定词表
    ///
    /// # 返回
    /// - `Err(InvalidStatus)`: 词表外的值
    /// - `Err(NotFound)`: draft_id 不存在
    #[instrument(skip(self, conn, deadline))]
    pub fn update_status(
        &self,
        conn: &Connection,
        draft_id: &str,
        new_status: &str,
        deadline: Deadline,
    ) -> RepositoryResult<DraftMawbStatus> {
        let status = DraftMawbStatus::parse(new_status)
            .ok_or_else(|| RepositoryError::InvalidStatus(new_status.to_string()))?;

        deadline.check("update_status")?;
        let affected = conn.execute(
            "UPDATE draft_mawb SET status = ?1, updated_at = ?2 WHERE draft_id = ?3",
            params![
                status.to_db_str(),
                now_seconds().format(header::TS_FORMAT).to_string(),
                draft_id
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::not_found(ENTITY, draft_id));
        }
        tracing::info!(draft_id, status = %status, "草稿状态已更新");
        Ok(status)
    }

    /// 删除草稿（明细/尺寸/费用由外键级联删除）
    #[instrument(skip(self, conn, deadline))]
    pub fn delete(&self, conn: &mut Connection, draft_id: &str, deadline: Deadline) -> RepositoryResult<()> {
        deadline.check("begin")?;
        let tx = conn.transaction()?;

        deadline.check("delete_header")?;
        let affected = tx.execute("DELETE FROM draft_mawb WHERE draft_id = ?1", params![draft_id])?;
        if affected == 0 {
            return Err(RepositoryError::not_found(ENTITY, draft_id));
        }

        deadline.check("commit")?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tracing::info!(draft_id, "草稿已删除");
        Ok(())
    }

    /// 父文档存在性探测（事务外的快速检查）
    pub fn validate_parent_exists(
        &self,
        conn: &Connection,
        parent_id: &str,
        deadline: Deadline,
    ) -> RepositoryResult<()> {
        deadline.check("parent_check")?;
        if self.parents.exists(conn, parent_id)? {
            Ok(())
        } else {
            Err(RepositoryError::ParentNotFound {
                parent_id: parent_id.to_string(),
            })
        }
    }
}

// 存储精度为秒,写回调用方的时间戳与再次读取的一致
fn now_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}
