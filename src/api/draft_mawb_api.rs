// ==========================================
// 航空主运单草稿 - 草稿聚合 API
// ==========================================
// 职责: 请求校验 → 领域转换 → 计算派生字段 → 持久化 → 回读
//       以及 提交/确认/驳回/删除/生成文档
// 红线:
// - 计算失败时不发起写入
// - 终态 (CONFIRMED / REJECTED) 草稿不可编辑、不可再流转
// - 下层错误不吞掉,错误种类保持可识别
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::instrument;

use crate::api::dto::{DraftMawbRequest, DraftMawbResponse, StatusChangeResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::policy::{AccessPolicy, AllowAllPolicy, Operation};
use crate::api::renderer::{DraftMawbRenderer, PlainTextRenderer, RenderedDocument};
use crate::api::validator::{DraftMawbRequestValidator, RequestValidator};
use crate::cache::{CacheConfig, CacheStatsSnapshot, Sweepable, TtlCache};
use crate::config::DraftLimits;
use crate::db::Deadline;
use crate::domain::draft_mawb::DraftMawb;
use crate::domain::mawb_info::MawbInfo;
use crate::domain::types::DraftMawbStatus;
use crate::engine::CalculationEngine;
use crate::repository::{DraftMawbRepository, MawbInfoRepository, RepositoryError};

// ==========================================
// DraftMawbApi - 草稿聚合 API
// ==========================================

/// 草稿聚合API
///
/// 职责：
/// 1. 草稿查询（按主运单信息ID）
/// 2. 草稿创建/整体更新（含派生字段计算）
/// 3. 状态流转（提交、确认、驳回）
/// 4. 删除与文档生成
///
/// 协作方（校验器、渲染器、访问策略）在构造时注入
pub struct DraftMawbApi {
    conn: Arc<Mutex<Connection>>,
    draft_repo: DraftMawbRepository,
    mawb_info_repo: MawbInfoRepository,
    engine: Arc<CalculationEngine>,
    validator: Arc<dyn RequestValidator>,
    renderer: Arc<dyn DraftMawbRenderer>,
    policy: Arc<dyn AccessPolicy>,
    limits: DraftLimits,
    // 父文档为只读参考数据,按 ID 缓存
    parent_cache: Arc<TtlCache<String, MawbInfo>>,
}

impl DraftMawbApi {
    /// 创建新的DraftMawbApi实例（默认校验器 / 纯文本渲染 / 放行全部）
    pub fn new(conn: Arc<Mutex<Connection>>, engine: Arc<CalculationEngine>) -> Self {
        let cache_config = engine.config().cache;
        Self {
            conn,
            draft_repo: DraftMawbRepository::new(),
            mawb_info_repo: MawbInfoRepository::new(),
            engine,
            validator: Arc::new(DraftMawbRequestValidator::new()),
            renderer: Arc::new(PlainTextRenderer),
            policy: Arc::new(AllowAllPolicy),
            limits: DraftLimits::default(),
            parent_cache: Arc::new(TtlCache::new("api.mawb_info", cache_config)),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn RequestValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DraftMawbRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limits(mut self, limits: DraftLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_parent_cache_config(mut self, config: CacheConfig) -> Self {
        self.parent_cache = Arc::new(TtlCache::new("api.mawb_info", config));
        self
    }

    pub fn engine(&self) -> &Arc<CalculationEngine> {
        &self.engine
    }

    pub fn limits(&self) -> DraftLimits {
        self.limits
    }

    /// 计算引擎缓存 + 父文档缓存,供后台清扫线程使用
    pub fn sweepable_caches(&self) -> Vec<Arc<dyn Sweepable>> {
        let mut caches = self.engine.sweepable_caches();
        caches.push(self.parent_cache.clone() as Arc<dyn Sweepable>);
        caches
    }

    pub fn parent_cache_stats(&self) -> CacheStatsSnapshot {
        self.parent_cache.stats()
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按主运单信息ID查询草稿
    ///
    /// # 返回
    /// - Ok(DraftMawbResponse): 完整聚合
    /// - Err(ParentNotFound): 主运单信息不存在
    /// - Err(DraftNotFound): 主运单信息存在但尚无草稿
    #[instrument(skip(self, deadline))]
    pub fn get(&self, mawb_info_id: &str, deadline: Deadline) -> ApiResult<DraftMawbResponse> {
        self.authorize(Operation::Get)?;
        let parent_id = require_id(mawb_info_id)?;

        let conn = self.get_conn()?;
        let parent = self.load_parent(&conn, parent_id, deadline)?;
        let draft = self.load_draft(&conn, parent_id, deadline)?;

        Ok(DraftMawbResponse::new(&parent, draft))
    }

    // ==========================================
    // 创建 / 更新
    // ==========================================

    /// 创建或整体更新草稿
    ///
    /// # 流程
    /// 1. 清洗并校验请求 → ValidationFailed（含全部字段错误）
    /// 2. 规模上限 → BusinessRuleViolation
    /// 3. 父文档存在性、终态检查
    /// 4. 计算派生字段 → InvalidMeasurement（不写入）
    /// 5. 单事务持久化,回读返回
    #[instrument(skip(self, request, deadline))]
    pub fn create_or_update(
        &self,
        mawb_info_id: &str,
        request: DraftMawbRequest,
        deadline: Deadline,
    ) -> ApiResult<DraftMawbResponse> {
        self.authorize(Operation::CreateOrUpdate)?;
        let parent_id = require_id(mawb_info_id)?;

        let mut request = request;
        self.validator.sanitize(&mut request);
        let violations = self.validator.validate(&request);
        if !violations.is_empty() {
            tracing::warn!(parent_id, count = violations.len(), "草稿请求校验失败");
            return Err(ApiError::ValidationFailed {
                reason: format!("{} 个字段校验失败", violations.len()),
                violations,
            });
        }
        self.check_limits(&request)?;

        let mut conn = self.get_conn()?;
        self.draft_repo
            .validate_parent_exists(&conn, parent_id, deadline)?;

        if let Some(status) = self
            .draft_repo
            .find_status_by_parent_id(&conn, parent_id, deadline)?
        {
            if !status.is_editable() {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "草稿已处于终态 {},不可修改",
                    status
                )));
            }
        }

        let mut draft = request.into_domain(parent_id)?;
        self.engine.compute_aggregate_totals(&mut draft)?;

        let draft_id = self
            .draft_repo
            .create_or_update(&mut conn, &mut draft, deadline)?;

        let saved = self.load_draft(&conn, parent_id, deadline)?;
        let parent = self.load_parent(&conn, parent_id, deadline)?;

        tracing::info!(
            parent_id,
            draft_id = %draft_id,
            total_amount = saved.total_amount,
            "草稿已保存"
        );
        Ok(DraftMawbResponse::new(&parent, saved))
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 提交审核 (DRAFT → PENDING)
    pub fn submit(&self, mawb_info_id: &str, deadline: Deadline) -> ApiResult<StatusChangeResponse> {
        self.transition(Operation::Submit, mawb_info_id, DraftMawbStatus::Pending, deadline)
    }

    /// 确认 (DRAFT / PENDING → CONFIRMED)
    pub fn confirm(&self, mawb_info_id: &str, deadline: Deadline) -> ApiResult<StatusChangeResponse> {
        self.transition(Operation::Confirm, mawb_info_id, DraftMawbStatus::Confirmed, deadline)
    }

    /// 驳回 (DRAFT / PENDING → REJECTED)
    pub fn reject(&self, mawb_info_id: &str, deadline: Deadline) -> ApiResult<StatusChangeResponse> {
        self.transition(Operation::Reject, mawb_info_id, DraftMawbStatus::Rejected, deadline)
    }

    /// 按状态字符串流转
    ///
    /// # 返回
    /// - Err(InvalidStatus): 词表外的值
    /// - Err(BusinessRuleViolation): 不允许回退为 DRAFT
    pub fn change_status(
        &self,
        mawb_info_id: &str,
        new_status: &str,
        deadline: Deadline,
    ) -> ApiResult<StatusChangeResponse> {
        let target = DraftMawbStatus::parse(new_status)
            .ok_or_else(|| ApiError::InvalidStatus(new_status.to_string()))?;
        match target {
            DraftMawbStatus::Pending => self.submit(mawb_info_id, deadline),
            DraftMawbStatus::Confirmed => self.confirm(mawb_info_id, deadline),
            DraftMawbStatus::Rejected => self.reject(mawb_info_id, deadline),
            DraftMawbStatus::Draft => Err(ApiError::BusinessRuleViolation(
                "草稿不可回退为 DRAFT 状态".to_string(),
            )),
        }
    }

    #[instrument(skip(self, deadline), fields(target = %target))]
    fn transition(
        &self,
        operation: Operation,
        mawb_info_id: &str,
        target: DraftMawbStatus,
        deadline: Deadline,
    ) -> ApiResult<StatusChangeResponse> {
        self.authorize(operation)?;
        let parent_id = require_id(mawb_info_id)?;

        let conn = self.get_conn()?;
        self.draft_repo
            .validate_parent_exists(&conn, parent_id, deadline)?;
        let draft = self.load_draft(&conn, parent_id, deadline)?;
        let current = draft.status;

        if current == target {
            return Err(ApiError::BusinessRuleViolation(format!(
                "草稿已是 {} 状态,不可重复操作",
                current
            )));
        }
        if current.is_terminal() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "草稿已处于终态 {},不可流转为 {}",
                current, target
            )));
        }
        if target == DraftMawbStatus::Pending && current != DraftMawbStatus::Draft {
            return Err(ApiError::BusinessRuleViolation(format!(
                "只有 DRAFT 状态可以提交,当前 {}",
                current
            )));
        }

        self.draft_repo
            .update_status(&conn, &draft.draft_id, target.to_db_str(), deadline)?;
        let updated = self.load_draft(&conn, parent_id, deadline)?;

        tracing::info!(parent_id, from = %current, to = %target, "草稿状态流转");
        Ok(StatusChangeResponse {
            draft_id: updated.draft_id,
            mawb_info_id: updated.mawb_info_id,
            previous_status: current,
            status: updated.status,
            changed_at: updated.updated_at,
        })
    }

    // ==========================================
    // 删除 / 文档
    // ==========================================

    /// 删除草稿（明细、尺寸、费用随之删除）
    #[instrument(skip(self, deadline))]
    pub fn delete(&self, mawb_info_id: &str, deadline: Deadline) -> ApiResult<()> {
        self.authorize(Operation::Delete)?;
        let parent_id = require_id(mawb_info_id)?;

        let mut conn = self.get_conn()?;
        self.draft_repo
            .validate_parent_exists(&conn, parent_id, deadline)?;
        let draft = self.load_draft(&conn, parent_id, deadline)?;
        self.draft_repo
            .delete(&mut conn, &draft.draft_id, deadline)?;
        Ok(())
    }

    /// 生成草稿文档
    ///
    /// 渲染失败返回 RenderingFailed,不影响已存储的草稿
    #[instrument(skip(self, deadline))]
    pub fn generate_document(&self, mawb_info_id: &str, deadline: Deadline) -> ApiResult<RenderedDocument> {
        self.authorize(Operation::GenerateDocument)?;
        let parent_id = require_id(mawb_info_id)?;

        let (parent, draft) = {
            let conn = self.get_conn()?;
            let parent = self.load_parent(&conn, parent_id, deadline)?;
            let draft = self.load_draft(&conn, parent_id, deadline)?;
            (parent, draft)
        };

        deadline.check("render")?;
        let document = self.renderer.render(&parent, &draft).map_err(|e| {
            tracing::warn!(parent_id, error = %e, "草稿文档生成失败");
            ApiError::RenderingFailed(e.to_string())
        })?;

        tracing::info!(parent_id, bytes = document.bytes.len(), "草稿文档已生成");
        Ok(document)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn get_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()).into())
    }

    // 策略错误原样放入 AccessDenied
    fn authorize(&self, operation: Operation) -> ApiResult<()> {
        self.policy.authorize(operation).map_err(|e| {
            tracing::warn!(operation = operation.as_str(), error = %e, "访问被拒绝");
            ApiError::AccessDenied(e)
        })
    }

    fn check_limits(&self, request: &DraftMawbRequest) -> ApiResult<()> {
        if request.items.len() > self.limits.max_items {
            return Err(ApiError::BusinessRuleViolation(format!(
                "明细数量 {} 超过上限 {}",
                request.items.len(),
                self.limits.max_items
            )));
        }
        if request.charges.len() > self.limits.max_charges {
            return Err(ApiError::BusinessRuleViolation(format!(
                "费用数量 {} 超过上限 {}",
                request.charges.len(),
                self.limits.max_charges
            )));
        }
        for (idx, item) in request.items.iter().enumerate() {
            if item.dimensions.len() > self.limits.max_dimensions_per_item {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "items[{}] 尺寸数量 {} 超过上限 {}",
                    idx,
                    item.dimensions.len(),
                    self.limits.max_dimensions_per_item
                )));
            }
        }
        Ok(())
    }

    fn load_parent(&self, conn: &Connection, parent_id: &str, deadline: Deadline) -> ApiResult<MawbInfo> {
        deadline.check("load_parent")?;
        self.parent_cache
            .get_or_try_insert_with(parent_id.to_string(), || -> ApiResult<MawbInfo> {
                self.mawb_info_repo
                    .find_by_id(conn, parent_id)?
                    .ok_or_else(|| ApiError::ParentNotFound {
                        parent_id: parent_id.to_string(),
                    })
            })
    }

    // 仓储 NotFound → DraftNotFound（区别于 ParentNotFound）
    fn load_draft(&self, conn: &Connection, parent_id: &str, deadline: Deadline) -> ApiResult<DraftMawb> {
        self.draft_repo
            .get_by_parent_id(conn, parent_id, deadline)
            .map_err(|e| match e {
                RepositoryError::NotFound { .. } => ApiError::DraftNotFound {
                    parent_id: parent_id.to_string(),
                },
                other => other.into(),
            })
    }
}

fn require_id(mawb_info_id: &str) -> ApiResult<&str> {
    let trimmed = mawb_info_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput("主运单信息ID不能为空".to_string()));
    }
    Ok(trimmed)
}
