// ==========================================
// 航空主运单草稿 - 领域类型定义
// ==========================================
// 职责: 状态词表、费用键词表、重量单位
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 草稿状态 (Draft MAWB Status)
// ==========================================
// 状态机: DRAFT → PENDING → {CONFIRMED, REJECTED}
//        DRAFT → {CONFIRMED, REJECTED}
// 红线: CONFIRMED / REJECTED 为终态,不可再编辑、不可再流转
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftMawbStatus {
    Draft,     // 草稿
    Pending,   // 待审核
    Confirmed, // 已确认
    Rejected,  // 已驳回
}

impl fmt::Display for DraftMawbStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl DraftMawbStatus {
    /// 全部合法状态
    pub const ALL: [DraftMawbStatus; 4] = [
        DraftMawbStatus::Draft,
        DraftMawbStatus::Pending,
        DraftMawbStatus::Confirmed,
        DraftMawbStatus::Rejected,
    ];

    /// 严格解析（词表外返回 None，由调用方决定报 InvalidStatus）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Some(DraftMawbStatus::Draft),
            "PENDING" => Some(DraftMawbStatus::Pending),
            "CONFIRMED" => Some(DraftMawbStatus::Confirmed),
            "REJECTED" => Some(DraftMawbStatus::Rejected),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DraftMawbStatus::Draft => "DRAFT",
            DraftMawbStatus::Pending => "PENDING",
            DraftMawbStatus::Confirmed => "CONFIRMED",
            DraftMawbStatus::Rejected => "REJECTED",
        }
    }

    /// 是否终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, DraftMawbStatus::Confirmed | DraftMawbStatus::Rejected)
    }

    /// 是否允许编辑（仅 DRAFT / PENDING）
    pub fn is_editable(&self) -> bool {
        !self.is_terminal()
    }
}

// ==========================================
// 费用键 (Charge Key)
// ==========================================
// 固定词表,与运单"其他费用"栏对应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeKey {
    FuelSurcharge,     // 燃油附加费
    SecuritySurcharge, // 安检附加费
    HandlingFee,       // 操作费
    ScreeningFee,      // X光检查费
    AwbFee,            // 制单费
    CustomsClearance,  // 报关费
    StorageFee,        // 仓储费
    Other,             // 其他
}

impl fmt::Display for ChargeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl ChargeKey {
    pub const ALL: [ChargeKey; 8] = [
        ChargeKey::FuelSurcharge,
        ChargeKey::SecuritySurcharge,
        ChargeKey::HandlingFee,
        ChargeKey::ScreeningFee,
        ChargeKey::AwbFee,
        ChargeKey::CustomsClearance,
        ChargeKey::StorageFee,
        ChargeKey::Other,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.to_db_str() == normalized)
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ChargeKey::FuelSurcharge => "FUEL_SURCHARGE",
            ChargeKey::SecuritySurcharge => "SECURITY_SURCHARGE",
            ChargeKey::HandlingFee => "HANDLING_FEE",
            ChargeKey::ScreeningFee => "SCREENING_FEE",
            ChargeKey::AwbFee => "AWB_FEE",
            ChargeKey::CustomsClearance => "CUSTOMS_CLEARANCE",
            ChargeKey::StorageFee => "STORAGE_FEE",
            ChargeKey::Other => "OTHER",
        }
    }
}

// ==========================================
// 重量单位 (Weight Unit)
// ==========================================
// 说明: 单位标签大小写不敏感; 无法识别的标签按 KG 处理（显式设计,见 DESIGN.md）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightUnit {
    Kg,
    Lb,
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightUnit::Kg => write!(f, "KG"),
            WeightUnit::Lb => write!(f, "LB"),
        }
    }
}

// 已知单位标签（小写）
const LB_TAGS: [&str; 3] = ["lb", "lbs", "l"];
const KG_TAGS: [&str; 3] = ["kg", "kgs", "k"];

impl WeightUnit {
    /// 从单位标签解析
    ///
    /// - "lb" / "lbs" / "l"（大小写不敏感）→ Lb
    /// - 其他（含 "kg" / "k"、空串、未知标签）→ Kg
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase();
        if LB_TAGS.contains(&tag.as_str()) {
            WeightUnit::Lb
        } else {
            WeightUnit::Kg
        }
    }

    /// 标签是否为已知单位（用于告警,不影响计算）
    pub fn is_known_tag(tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        LB_TAGS.contains(&tag.as_str()) || KG_TAGS.contains(&tag.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_strict() {
        assert_eq!(DraftMawbStatus::parse("confirmed"), Some(DraftMawbStatus::Confirmed));
        assert_eq!(DraftMawbStatus::parse(" Pending "), Some(DraftMawbStatus::Pending));
        assert_eq!(DraftMawbStatus::parse("ARCHIVED"), None);
        assert_eq!(DraftMawbStatus::parse(""), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(DraftMawbStatus::Confirmed.is_terminal());
        assert!(DraftMawbStatus::Rejected.is_terminal());
        assert!(DraftMawbStatus::Draft.is_editable());
        assert!(DraftMawbStatus::Pending.is_editable());
    }

    #[test]
    fn test_charge_key_vocabulary() {
        for key in ChargeKey::ALL {
            assert_eq!(ChargeKey::parse(key.to_db_str()), Some(key));
        }
        assert_eq!(ChargeKey::parse("fuel_surcharge"), Some(ChargeKey::FuelSurcharge));
        assert_eq!(ChargeKey::parse("TIP"), None);
    }

    #[test]
    fn test_weight_unit_tag_case_insensitive() {
        assert_eq!(WeightUnit::from_tag("LB"), WeightUnit::Lb);
        assert_eq!(WeightUnit::from_tag("lb"), WeightUnit::Lb);
        assert_eq!(WeightUnit::from_tag("Lbs"), WeightUnit::Lb);
        assert_eq!(WeightUnit::from_tag("kg"), WeightUnit::Kg);
        // 未知标签按 KG 处理
        assert_eq!(WeightUnit::from_tag("stone"), WeightUnit::Kg);
        assert!(!WeightUnit::is_known_tag("stone"));
    }

    #[test]
    fn test_known_tags_agree_with_parsed_unit() {
        let cases = [
            ("kg", WeightUnit::Kg),
            ("KGS", WeightUnit::Kg),
            ("k", WeightUnit::Kg),
            ("lb", WeightUnit::Lb),
            ("lbs", WeightUnit::Lb),
            ("L", WeightUnit::Lb),
            (" l ", WeightUnit::Lb),
        ];
        for (tag, unit) in cases {
            assert!(WeightUnit::is_known_tag(tag), "{tag} 应为已知单位");
            assert_eq!(WeightUnit::from_tag(tag), unit, "{tag} 解析结果不一致");
        }
        for tag in LB_TAGS.iter().chain(KG_TAGS.iter()) {
            assert!(WeightUnit::is_known_tag(tag));
        }
    }
}
