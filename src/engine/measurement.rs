// ==========================================
// 航空主运单草稿 - 计量值解析
// ==========================================
// 职责: 原始字符串 → 正数 / 正整数, 重量单位换算
// 规则:
// - 非数字、零、负数、非有限值 → InvalidMeasurement
// - 解析前去除首尾空白
// ==========================================

use crate::domain::types::WeightUnit;
use crate::engine::error::{CalcError, CalcResult};

/// 解析正小数（长/宽/高/毛重）
pub fn parse_positive_decimal(raw: &str, path: &str) -> CalcResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CalcError::invalid(path, "不能为空"));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| CalcError::invalid(path, format!("'{}' 不是有效数字", raw)))?;

    if !value.is_finite() {
        return Err(CalcError::invalid(path, format!("'{}' 不是有限数值", raw)));
    }
    if value <= 0.0 {
        return Err(CalcError::invalid(path, format!("必须大于0,实际 {}", raw)));
    }
    Ok(value)
}

/// 解析正整数（同尺寸件数）
pub fn parse_positive_count(raw: &str, path: &str) -> CalcResult<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CalcError::invalid(path, "不能为空"));
    }

    let value: i64 = trimmed
        .parse()
        .map_err(|_| CalcError::invalid(path, format!("'{}' 不是有效整数", raw)))?;

    if value <= 0 {
        return Err(CalcError::invalid(path, format!("必须为正整数,实际 {}", raw)));
    }
    Ok(value)
}

/// 换算为千克
pub fn to_kg(value: f64, unit: WeightUnit, lb_to_kg: f64) -> f64 {
    match unit {
        WeightUnit::Kg => value,
        WeightUnit::Lb => value * lb_to_kg,
    }
}
