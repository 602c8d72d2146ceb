// ==========================================
// 航空主运单草稿 - API 数据传输对象
// ==========================================
// 职责: 请求/响应结构,请求 → 领域聚合转换
// 说明: 派生字段（体积、计费重量、金额、合计）不接受调用方输入
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::draft_mawb::{DraftMawb, DraftMawbCharge, DraftMawbDimension, DraftMawbItem};
use crate::domain::mawb_info::MawbInfo;
use crate::domain::types::{ChargeKey, DraftMawbStatus};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// 请求
// ==========================================

/// 草稿创建/更新请求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftMawbRequest {
    // 当事方
    pub shipper_name_address: String,
    pub consignee_name_address: String,
    pub issuing_carrier_agent: String,
    pub agent_iata_code: Option<String>,

    // 航线
    pub airport_of_departure: String,
    pub airport_of_destination: String,
    pub routing_to: Option<String>,
    pub routing_by: Option<String>,
    pub flight_no: Option<String>,
    pub flight_date: Option<NaiveDate>,

    // 币种与声明价值
    pub currency: String,
    pub charges_code: Option<String>,
    pub declared_value_carriage: Option<String>,
    pub declared_value_customs: Option<String>,
    pub insurance_amount: Option<String>,
    pub handling_information: Option<String>,

    // 签署
    pub shipper_signature: Option<String>,
    pub carrier_signature: Option<String>,
    pub executed_on: Option<NaiveDate>,
    pub executed_at: Option<String>,

    pub items: Vec<DraftMawbItemRequest>,
    pub charges: Vec<DraftMawbChargeRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftMawbItemRequest {
    pub pieces: i64,
    pub gross_weight: String,
    pub weight_unit: String,
    pub rate_class: String,
    pub rate_charge: f64,
    pub commodity_description: String,
    pub dimensions: Vec<DraftMawbDimensionRequest>,
}

impl Default for DraftMawbItemRequest {
    fn default() -> Self {
        Self {
            pieces: 0,
            gross_weight: String::new(),
            weight_unit: "KG".to_string(),
            rate_class: String::new(),
            rate_charge: 0.0,
            commodity_description: String::new(),
            dimensions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftMawbDimensionRequest {
    pub length: String,
    pub width: String,
    pub height: String,
    pub count: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftMawbChargeRequest {
    pub key: String,
    pub value: f64,
}

impl DraftMawbRequest {
    /// 转换为领域聚合（派生字段置零,由计算引擎填充）
    ///
    /// ID / 状态 / 时间戳为占位值,以仓储写入结果为准
    pub fn into_domain(self, mawb_info_id: &str) -> ApiResult<DraftMawb> {
        let charges = self
            .charges
            .into_iter()
            .enumerate()
            .map(|(idx, c)| {
                let key = ChargeKey::parse(&c.key).ok_or_else(|| {
                    ApiError::InvalidInput(format!("charges[{}].key 不在费用词表中: {}", idx, c.key))
                })?;
                Ok(DraftMawbCharge {
                    charge_id: None,
                    key,
                    value: c.value,
                })
            })
            .collect::<ApiResult<Vec<_>>>()?;

        let items = self
            .items
            .into_iter()
            .map(|it| DraftMawbItem {
                item_id: None,
                pieces: it.pieces,
                gross_weight: it.gross_weight,
                weight_unit: it.weight_unit,
                rate_class: it.rate_class,
                rate_charge: it.rate_charge,
                commodity_description: it.commodity_description,
                volumetric_weight: 0.0,
                chargeable_weight: 0.0,
                total: 0.0,
                dimensions: it
                    .dimensions
                    .into_iter()
                    .map(|d| DraftMawbDimension {
                        dimension_id: None,
                        length: d.length,
                        width: d.width,
                        height: d.height,
                        count: d.count,
                    })
                    .collect(),
            })
            .collect();

        let now = Local::now().naive_local();
        Ok(DraftMawb {
            draft_id: String::new(),
            mawb_info_id: mawb_info_id.to_string(),
            shipper_name_address: self.shipper_name_address,
            consignee_name_address: self.consignee_name_address,
            issuing_carrier_agent: self.issuing_carrier_agent,
            agent_iata_code: self.agent_iata_code,
            airport_of_departure: self.airport_of_departure,
            airport_of_destination: self.airport_of_destination,
            routing_to: self.routing_to,
            routing_by: self.routing_by,
            flight_no: self.flight_no,
            flight_date: self.flight_date,
            currency: self.currency,
            charges_code: self.charges_code,
            declared_value_carriage: self.declared_value_carriage,
            declared_value_customs: self.declared_value_customs,
            insurance_amount: self.insurance_amount,
            handling_information: self.handling_information,
            shipper_signature: self.shipper_signature,
            carrier_signature: self.carrier_signature,
            executed_on: self.executed_on,
            executed_at: self.executed_at,
            total_pieces: 0,
            total_gross_weight: 0.0,
            total_chargeable_weight: 0.0,
            total_amount: 0.0,
            status: DraftMawbStatus::Draft,
            created_at: now,
            updated_at: now,
            items,
            charges,
        })
    }
}

// ==========================================
// 响应
// ==========================================

/// 草稿聚合响应（含父文档摘要）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftMawbResponse {
    pub mawb_no: String,
    pub carrier_code: String,
    pub draft: DraftMawb,
}

impl DraftMawbResponse {
    pub fn new(parent: &MawbInfo, draft: DraftMawb) -> Self {
        Self {
            mawb_no: parent.mawb_no.clone(),
            carrier_code: parent.carrier_code.clone(),
            draft,
        }
    }
}

/// 状态流转响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeResponse {
    pub draft_id: String,
    pub mawb_info_id: String,
    pub previous_status: DraftMawbStatus,
    pub status: DraftMawbStatus,
    pub changed_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialize_with_defaults() {
        let raw = r#"{
            "shipper_name_address": "ACME LTD",
            "airport_of_departure": "PVG",
            "items": [{"pieces": 2, "gross_weight": "10.5", "dimensions": [{"length": "10", "width": "10", "height": "10", "count": "2"}]}],
            "charges": [{"key": "fuel_surcharge", "value": 12.5}]
        }"#;
        let req: DraftMawbRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.items[0].weight_unit, "KG");
        assert!(req.flight_date.is_none());

        let draft = req.into_domain("MI-1").unwrap();
        assert_eq!(draft.mawb_info_id, "MI-1");
        assert_eq!(draft.items[0].dimensions.len(), 1);
        assert_eq!(draft.charges[0].key, ChargeKey::FuelSurcharge);
        assert_eq!(draft.total_amount, 0.0);
    }

    #[test]
    fn test_unknown_charge_key_is_rejected() {
        let req = DraftMawbRequest {
            charges: vec![DraftMawbChargeRequest {
                key: "TIP".to_string(),
                value: 1.0,
            }],
            ..Default::default()
        };
        let err = req.into_domain("MI-1").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(ref m) if m.contains("charges[0].key")));
    }
}
