// ==========================================
// 航空主运单草稿 - 主运单信息（父文档）
// ==========================================
// 说明: 父文档由外部流程维护,草稿只引用其 ID
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MawbInfo {
    pub mawb_info_id: String,
    pub mawb_no: String,      // 运单号 (如 160-12345675)
    pub carrier_code: String, // 航司二字码
    pub created_at: NaiveDateTime,
}
