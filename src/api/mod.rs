// ==========================================
// 航空主运单草稿 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供命令行 / 宿主应用调用
// ==========================================

pub mod draft_mawb_api;
pub mod dto;
pub mod error;
pub mod policy;
pub mod renderer;
pub mod validator;

// 重导出核心类型
pub use draft_mawb_api::DraftMawbApi;
pub use dto::{
    DraftMawbChargeRequest, DraftMawbDimensionRequest, DraftMawbItemRequest, DraftMawbRequest,
    DraftMawbResponse, StatusChangeResponse,
};
pub use error::{ApiError, ApiResult, ErrorKind, ValidationViolation};
pub use policy::{AccessPolicy, AllowAllPolicy, Operation, OperationAllowList, PolicyError};
pub use renderer::{DraftMawbRenderer, PlainTextRenderer, RenderError, RenderedDocument};
pub use validator::{DraftMawbRequestValidator, RequestValidator};
