// ==========================================
// 航空主运单草稿 - 请求校验器
// ==========================================
// 职责: 请求字段清洗（去空白、代码大写）与字段级校验
// 说明:
// - 返回全部字段错误（按请求顺序）,服务层将非空列表视为失败
// - 计量值（尺寸/毛重）只做非空检查,数值合法性由计算引擎判定
// ==========================================

use crate::api::dto::{DraftMawbItemRequest, DraftMawbRequest};
use crate::api::error::ValidationViolation;
use crate::domain::types::ChargeKey;

/// 请求校验 Trait
pub trait RequestValidator: Send + Sync {
    /// 清洗请求（默认不做处理）
    fn sanitize(&self, _request: &mut DraftMawbRequest) {}

    /// 校验请求,返回全部字段错误
    fn validate(&self, request: &DraftMawbRequest) -> Vec<ValidationViolation>;
}

// ==========================================
// DraftMawbRequestValidator - 默认校验器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct DraftMawbRequestValidator;

impl DraftMawbRequestValidator {
    pub fn new() -> Self {
        Self
    }

    fn validate_item(
        &self,
        idx: usize,
        item: &DraftMawbItemRequest,
        violations: &mut Vec<ValidationViolation>,
    ) {
        let prefix = format!("items[{}]", idx);
        require_non_empty(&format!("{}.gross_weight", prefix), &item.gross_weight, violations);
        require_non_empty(&format!("{}.weight_unit", prefix), &item.weight_unit, violations);
        require_non_empty(&format!("{}.rate_class", prefix), &item.rate_class, violations);
        require_non_empty(
            &format!("{}.commodity_description", prefix),
            &item.commodity_description,
            violations,
        );

        for (j, dim) in item.dimensions.iter().enumerate() {
            let dim_prefix = format!("{}.dimensions[{}]", prefix, j);
            for (name, value) in [
                ("length", &dim.length),
                ("width", &dim.width),
                ("height", &dim.height),
                ("count", &dim.count),
            ] {
                require_non_empty(&format!("{}.{}", dim_prefix, name), value, violations);
            }
        }
    }
}

impl RequestValidator for DraftMawbRequestValidator {
    fn sanitize(&self, request: &mut DraftMawbRequest) {
        trim_in_place(&mut request.shipper_name_address);
        trim_in_place(&mut request.consignee_name_address);
        trim_in_place(&mut request.issuing_carrier_agent);
        trim_code(&mut request.airport_of_departure);
        trim_code(&mut request.airport_of_destination);
        trim_code(&mut request.currency);

        for field in [
            &mut request.agent_iata_code,
            &mut request.routing_by,
            &mut request.flight_no,
            &mut request.declared_value_carriage,
            &mut request.declared_value_customs,
            &mut request.insurance_amount,
            &mut request.handling_information,
            &mut request.shipper_signature,
            &mut request.carrier_signature,
            &mut request.executed_at,
        ] {
            trim_optional(field);
        }
        for field in [&mut request.routing_to, &mut request.charges_code] {
            trim_optional(field);
            if let Some(v) = field.as_mut() {
                *v = v.to_uppercase();
            }
        }

        for item in request.items.iter_mut() {
            trim_in_place(&mut item.gross_weight);
            trim_code(&mut item.weight_unit);
            trim_code(&mut item.rate_class);
            trim_in_place(&mut item.commodity_description);
            for dim in item.dimensions.iter_mut() {
                trim_in_place(&mut dim.length);
                trim_in_place(&mut dim.width);
                trim_in_place(&mut dim.height);
                trim_in_place(&mut dim.count);
            }
        }
        for charge in request.charges.iter_mut() {
            trim_code(&mut charge.key);
        }
    }

    fn validate(&self, request: &DraftMawbRequest) -> Vec<ValidationViolation> {
        let mut violations = Vec::new();

        require_non_empty("shipper_name_address", &request.shipper_name_address, &mut violations);
        require_non_empty("consignee_name_address", &request.consignee_name_address, &mut violations);
        require_non_empty("issuing_carrier_agent", &request.issuing_carrier_agent, &mut violations);

        if let Some(code) = &request.agent_iata_code {
            let len_ok = (7..=11).contains(&code.len());
            if !len_ok || !code.chars().all(|c| c.is_ascii_digit()) {
                violations.push(ValidationViolation::new(
                    "agent_iata_code",
                    format!("应为7到11位数字,实际 '{}'", code),
                ));
            }
        }

        require_alpha_code("airport_of_departure", &request.airport_of_departure, &mut violations);
        require_alpha_code("airport_of_destination", &request.airport_of_destination, &mut violations);
        if !request.airport_of_departure.is_empty()
            && request.airport_of_departure == request.airport_of_destination
        {
            violations.push(ValidationViolation::new(
                "airport_of_destination",
                "目的港不能与始发港相同",
            ));
        }
        if let Some(to) = &request.routing_to {
            require_alpha_code("routing_to", to, &mut violations);
        }

        require_alpha_code("currency", &request.currency, &mut violations);
        if let Some(code) = &request.charges_code {
            if code != "PP" && code != "CC" {
                violations.push(ValidationViolation::new(
                    "charges_code",
                    format!("应为 PP 或 CC,实际 '{}'", code),
                ));
            }
        }

        for (idx, item) in request.items.iter().enumerate() {
            self.validate_item(idx, item, &mut violations);
        }

        for (idx, charge) in request.charges.iter().enumerate() {
            if ChargeKey::parse(&charge.key).is_none() {
                violations.push(ValidationViolation::new(
                    format!("charges[{}].key", idx),
                    format!("不在费用词表中: '{}'", charge.key),
                ));
            }
        }

        violations
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

fn trim_code(s: &mut String) {
    *s = s.trim().to_uppercase();
}

// 去空白后为空的可选字段视为未填
fn trim_optional(field: &mut Option<String>) {
    if let Some(v) = field.as_mut() {
        trim_in_place(v);
    }
    if field.as_deref().is_some_and(str::is_empty) {
        *field = None;
    }
}

fn require_non_empty(field: &str, value: &str, violations: &mut Vec<ValidationViolation>) {
    if value.trim().is_empty() {
        violations.push(ValidationViolation::new(field, "不能为空"));
    }
}

// 三位字母代码（IATA 机场代码 / ISO 4217 币种）
fn require_alpha_code(field: &str, value: &str, violations: &mut Vec<ValidationViolation>) {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_uppercase()) {
        violations.push(ValidationViolation::new(
            field,
            format!("应为3位大写字母代码,实际 '{}'", value),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::{DraftMawbChargeRequest, DraftMawbDimensionRequest};

    fn valid_request() -> DraftMawbRequest {
        DraftMawbRequest {
            shipper_name_address: "ACME LTD, SHANGHAI".to_string(),
            consignee_name_address: "BETA GMBH, FRANKFURT".to_string(),
            issuing_carrier_agent: "FAST FORWARDING".to_string(),
            airport_of_departure: "PVG".to_string(),
            airport_of_destination: "FRA".to_string(),
            currency: "CNY".to_string(),
            charges_code: Some("PP".to_string()),
            items: vec![DraftMawbItemRequest {
                pieces: 1,
                gross_weight: "10".to_string(),
                weight_unit: "KG".to_string(),
                rate_class: "Q".to_string(),
                rate_charge: 1.0,
                commodity_description: "PARTS".to_string(),
                dimensions: vec![DraftMawbDimensionRequest {
                    length: "10".to_string(),
                    width: "10".to_string(),
                    height: "10".to_string(),
                    count: "1".to_string(),
                }],
            }],
            charges: vec![DraftMawbChargeRequest {
                key: "AWB_FEE".to_string(),
                value: 50.0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let v = DraftMawbRequestValidator::new();
        assert!(v.validate(&valid_request()).is_empty());
    }

    #[test]
    fn test_sanitize_normalizes_codes() {
        let v = DraftMawbRequestValidator::new();
        let mut req = valid_request();
        req.airport_of_departure = " pvg ".to_string();
        req.currency = "cny".to_string();
        req.charges_code = Some(" cc".to_string());
        req.flight_no = Some("   ".to_string());
        req.charges[0].key = " fuel_surcharge ".to_string();

        v.sanitize(&mut req);
        assert_eq!(req.airport_of_departure, "PVG");
        assert_eq!(req.currency, "CNY");
        assert_eq!(req.charges_code.as_deref(), Some("CC"));
        assert_eq!(req.flight_no, None);
        assert_eq!(req.charges[0].key, "FUEL_SURCHARGE");
        assert!(v.validate(&req).is_empty());
    }

    #[test]
    fn test_violations_are_reported_in_request_order() {
        let v = DraftMawbRequestValidator::new();
        let mut req = valid_request();
        req.shipper_name_address = String::new();
        req.airport_of_destination = "PVG".to_string();
        req.charges_code = Some("XX".to_string());
        req.items[0].dimensions[0].width = String::new();
        req.charges[0].key = "TIP".to_string();

        let fields: Vec<String> = v.validate(&req).into_iter().map(|x| x.field).collect();
        assert_eq!(
            fields,
            vec![
                "shipper_name_address",
                "airport_of_destination",
                "charges_code",
                "items[0].dimensions[0].width",
                "charges[0].key",
            ]
        );
    }

    #[test]
    fn test_zero_dimension_is_left_to_engine() {
        let v = DraftMawbRequestValidator::new();
        let mut req = valid_request();
        req.items[0].dimensions[0].length = "0".to_string();
        assert!(v.validate(&req).is_empty());
    }
}
