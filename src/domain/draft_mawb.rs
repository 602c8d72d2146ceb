// ==========================================
// 航空主运单草稿 - 聚合领域模型
// ==========================================
// 聚合边界: draft_mawb (根) → items → dimensions
//                       └→ charges
// 红线: 子集合由聚合独占; 每次更新整体替换,不跨更新保留身份
// ==========================================

use crate::domain::types::{ChargeKey, DraftMawbStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// DraftMawb - 主运单草稿（聚合根）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMawb {
    // ===== 标识 =====
    pub draft_id: String,     // 草稿ID (首次创建时分配,之后不变)
    pub mawb_info_id: String, // 关联主运单信息 (一对一)

    // ===== 收发货人 / 代理 =====
    pub shipper_name_address: String,
    pub consignee_name_address: String,
    pub issuing_carrier_agent: String,
    pub agent_iata_code: Option<String>,

    // ===== 航线 =====
    pub airport_of_departure: String,   // IATA 三字码
    pub airport_of_destination: String, // IATA 三字码
    pub routing_to: Option<String>,
    pub routing_by: Option<String>, // 首程承运人
    pub flight_no: Option<String>,
    pub flight_date: Option<NaiveDate>,

    // ===== 币种 / 申报价值 =====
    pub currency: String,                       // ISO-4217
    pub charges_code: Option<String>,           // PP / CC
    pub declared_value_carriage: Option<String>, // 如 NVD
    pub declared_value_customs: Option<String>,  // 如 NCV
    pub insurance_amount: Option<String>,
    pub handling_information: Option<String>,

    // ===== 签署 =====
    pub shipper_signature: Option<String>,
    pub carrier_signature: Option<String>,
    pub executed_on: Option<NaiveDate>,
    pub executed_at: Option<String>,

    // ===== 派生合计 (由计算引擎填充) =====
    pub total_pieces: i64,
    pub total_gross_weight: f64,      // kg
    pub total_chargeable_weight: f64, // kg
    pub total_amount: f64,

    // ===== 生命周期 =====
    pub status: DraftMawbStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,

    // ===== 子集合 (有序) =====
    pub items: Vec<DraftMawbItem>,
    pub charges: Vec<DraftMawbCharge>,
}

impl DraftMawb {
    /// 件数合计
    pub fn piece_count(&self) -> i64 {
        self.items.iter().map(|i| i.pieces).sum()
    }

    /// 是否允许编辑
    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }

    /// 其他费用合计
    pub fn charges_total(&self) -> f64 {
        self.charges.iter().map(|c| c.value).sum()
    }
}

// ==========================================
// DraftMawbItem - 货物明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMawbItem {
    pub item_id: Option<i64>, // 持久化后由存储分配
    pub pieces: i64,          // 件数
    pub gross_weight: String, // 毛重原始值
    pub weight_unit: String,  // 毛重单位标签 (kg / lb)
    pub rate_class: String,   // 运价等级 (M/N/Q/C...)
    pub rate_charge: f64,     // 单位运价
    pub commodity_description: String,

    // ===== 派生字段 =====
    pub volumetric_weight: f64, // 体积 (m³ 当量)
    pub chargeable_weight: f64, // 计费重量 kg
    pub total: f64,             // rate_charge × chargeable_weight

    pub dimensions: Vec<DraftMawbDimension>,
}

// ==========================================
// DraftMawbDimension - 尺寸 (厘米)
// ==========================================
// 原始值保留字符串,由计算引擎统一解析并报告字段路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftMawbDimension {
    pub dimension_id: Option<i64>,
    pub length: String,
    pub width: String,
    pub height: String,
    pub count: String, // 同尺寸件数
}

// ==========================================
// DraftMawbCharge - 其他费用
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMawbCharge {
    pub charge_id: Option<i64>,
    pub key: ChargeKey,
    pub value: f64,
}
