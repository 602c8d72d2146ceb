// ==========================================
// 航空主运单草稿 - 计费计算引擎
// ==========================================
// 职责: 尺寸 → 体积; 毛重/体积 → 计费重量; 运价 × 计费重量 → 金额
// 公式:
// - 体积 = Σ (长·宽·高 / 1_000_000) · 件数   (厘米 → 立方米当量)
// - 计费重量 = max(实际毛重kg, 体积 · 166.67)
// - 明细金额 = 运价 · 计费重量
// - 总金额 = Σ 明细金额 + Σ 其他费用
// 红线: 纯函数,不访问数据库; 任一明细失败即中止,不写入部分合计
// ==========================================

use crate::cache::{CacheConfig, CacheStatsSnapshot, Sweepable, TtlCache};
use crate::domain::draft_mawb::{DraftMawb, DraftMawbCharge, DraftMawbDimension, DraftMawbItem};
use crate::domain::types::WeightUnit;
use crate::engine::error::{CalcError, CalcResult};
use crate::engine::measurement::{parse_positive_count, parse_positive_decimal, to_kg};
use std::sync::Arc;
use tracing::instrument;

/// 行业体积重换算系数 (kg / m³)
pub const DEFAULT_VOLUMETRIC_FACTOR: f64 = 166.67;
/// 磅 → 千克
pub const DEFAULT_LB_TO_KG: f64 = 0.453592;
/// 立方厘米 → 立方米
pub const DEFAULT_VOLUME_DIVISOR: f64 = 1_000_000.0;

// ==========================================
// CalculationConfig - 计算参数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationConfig {
    pub volumetric_factor: f64,
    pub lb_to_kg: f64,
    pub volume_divisor: f64,
    pub cache: CacheConfig,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            volumetric_factor: DEFAULT_VOLUMETRIC_FACTOR,
            lb_to_kg: DEFAULT_LB_TO_KG,
            volume_divisor: DEFAULT_VOLUME_DIVISOR,
            cache: CacheConfig::default(),
        }
    }
}

/// 记忆化缓存统计
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct CalculationCacheStats {
    pub volumetric: CacheStatsSnapshot,
    pub chargeable: CacheStatsSnapshot,
    pub charges: CacheStatsSnapshot,
}

// ==========================================
// CalculationEngine - 计费计算引擎
// ==========================================
pub struct CalculationEngine {
    config: CalculationConfig,
    // 尺寸列表指纹 → 体积
    volumetric_cache: Arc<TtlCache<String, f64>>,
    // (实际重量 bits, 体积 bits) → 计费重量
    chargeable_cache: Arc<TtlCache<(u64, u64), f64>>,
    // 费用列表指纹 → 费用合计
    charges_cache: Arc<TtlCache<String, f64>>,
}

impl CalculationEngine {
    /// 创建新的计算引擎
    pub fn new(config: CalculationConfig) -> Self {
        Self {
            config,
            volumetric_cache: Arc::new(TtlCache::new("calc.volumetric", config.cache)),
            chargeable_cache: Arc::new(TtlCache::new("calc.chargeable", config.cache)),
            charges_cache: Arc::new(TtlCache::new("calc.charges", config.cache)),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(CalculationConfig::default())
    }

    pub fn config(&self) -> &CalculationConfig {
        &self.config
    }

    /// 供后台清扫线程使用的缓存列表
    pub fn sweepable_caches(&self) -> Vec<Arc<dyn Sweepable>> {
        vec![
            self.volumetric_cache.clone() as Arc<dyn Sweepable>,
            self.chargeable_cache.clone() as Arc<dyn Sweepable>,
            self.charges_cache.clone() as Arc<dyn Sweepable>,
        ]
    }

    pub fn cache_stats(&self) -> CalculationCacheStats {
        CalculationCacheStats {
            volumetric: self.volumetric_cache.stats(),
            chargeable: self.chargeable_cache.stats(),
            charges: self.charges_cache.stats(),
        }
    }

    // ==========================================
    // 体积
    // ==========================================

    /// 计算尺寸列表的体积 (m³ 当量)
    ///
    /// # 返回
    /// - Ok(volume)
    /// - Err(InvalidMeasurement): 字段路径形如 `dimensions[0].length`
    ///
    /// # 缓存
    /// 以尺寸原始值列表为 key,相同尺寸组合在不同明细间复用
    pub fn compute_volumetric_weight(&self, dimensions: &[DraftMawbDimension]) -> CalcResult<f64> {
        match dimensions_fingerprint(dimensions) {
            Some(key) => self
                .volumetric_cache
                .get_or_try_insert_with(key, || self.volume_of(dimensions)),
            None => self.volume_of(dimensions),
        }
    }

    fn volume_of(&self, dimensions: &[DraftMawbDimension]) -> CalcResult<f64> {
        let mut volume = 0.0;
        for (idx, dim) in dimensions.iter().enumerate() {
            let path = format!("dimensions[{}]", idx);
            let length = parse_positive_decimal(&dim.length, &format!("{}.length", path))?;
            let width = parse_positive_decimal(&dim.width, &format!("{}.width", path))?;
            let height = parse_positive_decimal(&dim.height, &format!("{}.height", path))?;
            let count = parse_positive_count(&dim.count, &format!("{}.count", path))?;

            volume += (length * width * height / self.config.volume_divisor) * count as f64;
        }
        Ok(volume)
    }

    // ==========================================
    // 计费重量
    // ==========================================

    /// 计费重量 = max(实际重量, 体积 × 体积重系数)
    pub fn compute_chargeable_weight(&self, actual_weight_kg: f64, volumetric_weight: f64) -> f64 {
        let key = (actual_weight_kg.to_bits(), volumetric_weight.to_bits());
        if let Some(v) = self.chargeable_cache.get(&key) {
            return v;
        }
        let chargeable = actual_weight_kg.max(volumetric_weight * self.config.volumetric_factor);
        self.chargeable_cache.insert(key, chargeable);
        chargeable
    }

    /// 解析明细实际毛重并换算为 kg
    pub fn actual_weight_kg(&self, item: &DraftMawbItem) -> CalcResult<f64> {
        let gross = parse_positive_decimal(&item.gross_weight, "gross_weight")?;
        if !WeightUnit::is_known_tag(&item.weight_unit) {
            tracing::warn!(
                weight_unit = %item.weight_unit,
                "未识别的重量单位,按 KG 处理"
            );
        }
        Ok(to_kg(
            gross,
            WeightUnit::from_tag(&item.weight_unit),
            self.config.lb_to_kg,
        ))
    }

    // ==========================================
    // 明细 / 聚合合计
    // ==========================================

    /// 填充明细的 体积 / 计费重量 / 金额
    ///
    /// # 参数
    /// - item: 明细（就地更新）
    /// - index: 明细序号,用于错误字段路径 `items[index]`
    pub fn compute_item_totals(&self, item: &mut DraftMawbItem, index: usize) -> CalcResult<()> {
        self.apply_item_totals(item, index).map(|_| ())
    }

    // 返回实际毛重 kg,供聚合合计复用
    fn apply_item_totals(&self, item: &mut DraftMawbItem, index: usize) -> CalcResult<f64> {
        let prefix = format!("items[{}]", index);

        if item.pieces <= 0 {
            return Err(CalcError::invalid(
                format!("{}.pieces", prefix),
                format!("必须为正整数,实际 {}", item.pieces),
            ));
        }
        if !item.rate_charge.is_finite() || item.rate_charge < 0.0 {
            return Err(CalcError::invalid(
                format!("{}.rate_charge", prefix),
                format!("必须为非负数,实际 {}", item.rate_charge),
            ));
        }

        let actual_kg = self.actual_weight_kg(item).map_err(|e| e.within(&prefix))?;
        let volumetric = self
            .compute_volumetric_weight(&item.dimensions)
            .map_err(|e| e.within(&prefix))?;
        let chargeable = self.compute_chargeable_weight(actual_kg, volumetric);

        item.volumetric_weight = volumetric;
        item.chargeable_weight = chargeable;
        item.total = item.rate_charge * chargeable;
        Ok(actual_kg)
    }

    /// 其他费用合计
    pub fn sum_charges(&self, charges: &[DraftMawbCharge]) -> CalcResult<f64> {
        for (idx, charge) in charges.iter().enumerate() {
            if !charge.value.is_finite() || charge.value < 0.0 {
                return Err(CalcError::invalid(
                    format!("charges[{}].value", idx),
                    format!("必须为非负数,实际 {}", charge.value),
                ));
            }
        }

        let sum = || -> CalcResult<f64> { Ok(charges.iter().map(|c| c.value).sum()) };
        match charges_fingerprint(charges) {
            Some(key) => self.charges_cache.get_or_try_insert_with(key, sum),
            None => sum(),
        }
    }

    /// 计算整张草稿的全部派生字段
    ///
    /// 在副本上计算,全部成功后才写回; 任一失败直接返回,`draft` 保持原样
    #[instrument(skip(self, draft), fields(mawb_info_id = %draft.mawb_info_id, items = draft.items.len(), charges = draft.charges.len()))]
    pub fn compute_aggregate_totals(&self, draft: &mut DraftMawb) -> CalcResult<()> {
        let mut items = draft.items.clone();
        let mut total_gross_weight = 0.0;
        let mut total_chargeable_weight = 0.0;
        let mut items_amount = 0.0;
        let mut total_pieces = 0i64;

        for (idx, item) in items.iter_mut().enumerate() {
            let actual_kg = self.apply_item_totals(item, idx)?;
            total_gross_weight += actual_kg;
            total_chargeable_weight += item.chargeable_weight;
            items_amount += item.total;
            total_pieces += item.pieces;
        }

        let charges_amount = self.sum_charges(&draft.charges)?;

        draft.items = items;
        draft.total_pieces = total_pieces;
        draft.total_gross_weight = total_gross_weight;
        draft.total_chargeable_weight = total_chargeable_weight;
        draft.total_amount = items_amount + charges_amount;

        tracing::debug!(
            total_pieces,
            total_gross_weight,
            total_chargeable_weight,
            total_amount = draft.total_amount,
            "草稿合计计算完成"
        );
        Ok(())
    }
}

// 内容指纹: 只取参与计算的原始值,不含存储 ID
fn dimensions_fingerprint(dimensions: &[DraftMawbDimension]) -> Option<String> {
    let rows: Vec<[&str; 4]> = dimensions
        .iter()
        .map(|d| [d.length.as_str(), d.width.as_str(), d.height.as_str(), d.count.as_str()])
        .collect();
    serde_json::to_string(&rows).ok()
}

fn charges_fingerprint(charges: &[DraftMawbCharge]) -> Option<String> {
    let rows: Vec<(&str, u64)> = charges
        .iter()
        .map(|c| (c.key.to_db_str(), c.value.to_bits()))
        .collect();
    serde_json::to_string(&rows).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ChargeKey, DraftMawbStatus};
    use chrono::NaiveDateTime;

    const EPS: f64 = 1e-9;

    fn dim(l: &str, w: &str, h: &str, c: &str) -> DraftMawbDimension {
        DraftMawbDimension {
            dimension_id: None,
            length: l.to_string(),
            width: w.to_string(),
            height: h.to_string(),
            count: c.to_string(),
        }
    }

    fn item(pieces: i64, gross: &str, unit: &str, rate: f64, dims: Vec<DraftMawbDimension>) -> DraftMawbItem {
        DraftMawbItem {
            item_id: None,
            pieces,
            gross_weight: gross.to_string(),
            weight_unit: unit.to_string(),
            rate_class: "Q".to_string(),
            rate_charge: rate,
            commodity_description: "GENERAL CARGO".to_string(),
            volumetric_weight: 0.0,
            chargeable_weight: 0.0,
            total: 0.0,
            dimensions: dims,
        }
    }

    fn draft(items: Vec<DraftMawbItem>, charges: Vec<DraftMawbCharge>) -> DraftMawb {
        let ts = NaiveDateTime::parse_from_str("2026-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        DraftMawb {
            draft_id: String::new(),
            mawb_info_id: "MI-1".to_string(),
            shipper_name_address: "SHIPPER".to_string(),
            consignee_name_address: "CONSIGNEE".to_string(),
            issuing_carrier_agent: "AGENT".to_string(),
            agent_iata_code: None,
            airport_of_departure: "PVG".to_string(),
            airport_of_destination: "FRA".to_string(),
            routing_to: None,
            routing_by: None,
            flight_no: None,
            flight_date: None,
            currency: "CNY".to_string(),
            charges_code: None,
            declared_value_carriage: None,
            declared_value_customs: None,
            insurance_amount: None,
            handling_information: None,
            shipper_signature: None,
            carrier_signature: None,
            executed_on: None,
            executed_at: None,
            total_pieces: 0,
            total_gross_weight: 0.0,
            total_chargeable_weight: 0.0,
            total_amount: 0.0,
            status: DraftMawbStatus::Draft,
            created_at: ts,
            updated_at: ts,
            items,
            charges,
        }
    }

    fn charge(key: ChargeKey, value: f64) -> DraftMawbCharge {
        DraftMawbCharge {
            charge_id: None,
            key,
            value,
        }
    }

    #[test]
    fn test_volumetric_weight_single_row() {
        let engine = CalculationEngine::with_default_config();
        let v = engine
            .compute_volumetric_weight(&[dim("100", "50", "30", "2")])
            .unwrap();
        assert!((v - 0.3).abs() < EPS);
    }

    #[test]
    fn test_volumetric_weight_two_rows() {
        let engine = CalculationEngine::with_default_config();
        let v = engine
            .compute_volumetric_weight(&[dim("100", "50", "30", "1"), dim("200", "100", "50", "1")])
            .unwrap();
        assert!((v - 1.15).abs() < EPS);
    }

    #[test]
    fn test_volumetric_weight_is_memoized() {
        let engine = CalculationEngine::with_default_config();
        let dims = vec![dim("100", "50", "30", "2")];
        engine.compute_volumetric_weight(&dims).unwrap();
        engine.compute_volumetric_weight(&dims).unwrap();

        let stats = engine.cache_stats().volumetric;
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_invalid_dimension_reports_path_and_is_not_cached() {
        let engine = CalculationEngine::with_default_config();
        let err = engine
            .compute_volumetric_weight(&[dim("100", "50", "30", "1"), dim("0", "10", "10", "1")])
            .unwrap_err();
        assert_eq!(err.path(), "dimensions[1].length");

        let err = engine
            .compute_volumetric_weight(&[dim("10", "10", "10", "-1")])
            .unwrap_err();
        assert_eq!(err.path(), "dimensions[0].count");
        assert_eq!(engine.cache_stats().volumetric.entries, 0);
    }

    #[test]
    fn test_chargeable_weight() {
        let engine = CalculationEngine::with_default_config();
        assert!((engine.compute_chargeable_weight(500.0, 1.0) - 500.0).abs() < EPS);
        assert!((engine.compute_chargeable_weight(100.0, 1.0) - 166.67).abs() < EPS);
        // 第二次命中缓存
        assert!((engine.compute_chargeable_weight(100.0, 1.0) - 166.67).abs() < EPS);
        assert_eq!(engine.cache_stats().chargeable.hits, 1);
    }

    #[test]
    fn test_item_totals_with_lb_weight() {
        let engine = CalculationEngine::with_default_config();
        let mut it = item(1, "100", "LB", 2.0, vec![]);
        engine.compute_item_totals(&mut it, 0).unwrap();

        assert!((it.chargeable_weight - 45.3592).abs() < 0.01);
        assert!((it.total - 2.0 * 45.3592).abs() < 0.01);
        assert_eq!(it.volumetric_weight, 0.0);
    }

    #[test]
    fn test_item_error_is_tagged_with_index() {
        let engine = CalculationEngine::with_default_config();
        let mut it = item(1, "10", "kg", 1.0, vec![dim("10", "abc", "10", "1")]);
        let err = engine.compute_item_totals(&mut it, 3).unwrap_err();
        assert_eq!(err.path(), "items[3].dimensions[0].width");

        let mut it = item(1, "-5", "kg", 1.0, vec![]);
        let err = engine.compute_item_totals(&mut it, 0).unwrap_err();
        assert_eq!(err.path(), "items[0].gross_weight");

        let mut it = item(0, "5", "kg", 1.0, vec![]);
        let err = engine.compute_item_totals(&mut it, 2).unwrap_err();
        assert_eq!(err.path(), "items[2].pieces");
    }

    #[test]
    fn test_aggregate_totals_end_to_end() {
        let engine = CalculationEngine::with_default_config();
        // 明细1: 体积 1.0 → 166.67 > 100 → X = 166.67
        // 明细2: 体积 0.3 → 50.001 < 80 → Y = 80
        let mut d = draft(
            vec![
                item(3, "100", "kg", 10.0, vec![dim("200", "100", "50", "1")]),
                item(2, "80", "kg", 15.0, vec![dim("100", "50", "30", "2")]),
            ],
            vec![
                charge(ChargeKey::FuelSurcharge, 100.0),
                charge(ChargeKey::HandlingFee, 50.0),
            ],
        );
        engine.compute_aggregate_totals(&mut d).unwrap();

        let x = 166.67;
        let y = 80.0;
        assert!((d.items[0].chargeable_weight - x).abs() < EPS);
        assert!((d.items[1].chargeable_weight - y).abs() < EPS);
        assert!((d.total_amount - (10.0 * x + 15.0 * y + 150.0)).abs() < 1e-6);
        assert_eq!(d.total_pieces, 5);
        assert!((d.total_gross_weight - 180.0).abs() < EPS);
        assert!((d.total_chargeable_weight - (x + y)).abs() < EPS);
    }

    #[test]
    fn test_aggregate_failure_leaves_draft_untouched() {
        let engine = CalculationEngine::with_default_config();
        let mut d = draft(
            vec![
                item(1, "100", "kg", 10.0, vec![dim("10", "10", "10", "1")]),
                item(1, "100", "kg", 10.0, vec![dim("0", "10", "10", "1")]),
            ],
            vec![charge(ChargeKey::Other, 10.0)],
        );
        let before = d.clone();

        let err = engine.compute_aggregate_totals(&mut d).unwrap_err();
        assert_eq!(err.path(), "items[1].dimensions[0].length");
        assert_eq!(d, before, "失败时不得写入部分合计");
    }

    #[test]
    fn test_negative_charge_rejected() {
        let engine = CalculationEngine::with_default_config();
        let err = engine
            .sum_charges(&[charge(ChargeKey::Other, 1.0), charge(ChargeKey::AwbFee, -1.0)])
            .unwrap_err();
        assert_eq!(err.path(), "charges[1].value");
    }

    #[test]
    fn test_sweepable_caches_cover_all_memo_tables() {
        let engine = CalculationEngine::with_default_config();
        let names: Vec<String> = engine
            .sweepable_caches()
            .iter()
            .map(|c| c.cache_name().to_string())
            .collect();
        assert_eq!(names, vec!["calc.volumetric", "calc.chargeable", "calc.charges"]);
    }
}
