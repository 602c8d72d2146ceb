// ==========================================
// 航空主运单草稿 - 文档渲染
// ==========================================
// 职责: 已持久化草稿 → 文档字节流
// 说明: 渲染器在构造服务时注入; 渲染失败不影响已存储的数据
// ==========================================

use crate::domain::draft_mawb::DraftMawb;
use crate::domain::mawb_info::MawbInfo;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

/// 渲染结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 渲染错误
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("模板错误: {0}")]
    Template(String),

    #[error("输出失败: {0}")]
    Output(String),
}

/// 草稿文档渲染器 Trait
pub trait DraftMawbRenderer: Send + Sync {
    fn render(&self, parent: &MawbInfo, draft: &DraftMawb) -> Result<RenderedDocument, RenderError>;
}

// ==========================================
// PlainTextRenderer - 纯文本渲染
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    fn render_text(&self, parent: &MawbInfo, draft: &DraftMawb) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        writeln!(out, "DRAFT MAWB {} ({})", parent.mawb_no, draft.status)?;
        writeln!(out, "CARRIER: {}", parent.carrier_code)?;
        writeln!(out, "SHIPPER: {}", draft.shipper_name_address)?;
        writeln!(out, "CONSIGNEE: {}", draft.consignee_name_address)?;
        writeln!(out, "AGENT: {}", draft.issuing_carrier_agent)?;
        writeln!(
            out,
            "ROUTING: {} -> {}{}",
            draft.airport_of_departure,
            draft.airport_of_destination,
            draft
                .flight_no
                .as_deref()
                .map(|f| format!(" / {}", f))
                .unwrap_or_default()
        )?;
        if let Some(date) = draft.flight_date {
            writeln!(out, "FLIGHT DATE: {}", date.format("%Y-%m-%d"))?;
        }
        writeln!(out, "CURRENCY: {}", draft.currency)?;
        writeln!(out)?;

        writeln!(out, "NO  PCS  GROSS        CLASS  CHG.WT      RATE        TOTAL  DESCRIPTION")?;
        for (idx, item) in draft.items.iter().enumerate() {
            writeln!(
                out,
                "{:<3} {:>4}  {:>8} {:<3} {:<5} {:>10.2} {:>9.2} {:>12.2}  {}",
                idx + 1,
                item.pieces,
                item.gross_weight,
                item.weight_unit,
                item.rate_class,
                item.chargeable_weight,
                item.rate_charge,
                item.total,
                item.commodity_description
            )?;
            for dim in &item.dimensions {
                writeln!(out, "      DIMS {}x{}x{} CM x{}", dim.length, dim.width, dim.height, dim.count)?;
            }
        }
        writeln!(out)?;

        for charge in &draft.charges {
            writeln!(out, "{:<20} {:>12.2}", charge.key.to_db_str(), charge.value)?;
        }
        writeln!(out)?;
        writeln!(out, "TOTAL PIECES: {}", draft.total_pieces)?;
        writeln!(out, "TOTAL GROSS WEIGHT (KG): {:.2}", draft.total_gross_weight)?;
        writeln!(out, "TOTAL CHARGEABLE WEIGHT (KG): {:.2}", draft.total_chargeable_weight)?;
        writeln!(out, "TOTAL AMOUNT: {:.2} {}", draft.total_amount, draft.currency)?;
        Ok(out)
    }
}

impl DraftMawbRenderer for PlainTextRenderer {
    fn render(&self, parent: &MawbInfo, draft: &DraftMawb) -> Result<RenderedDocument, RenderError> {
        let text = self
            .render_text(parent, draft)
            .map_err(|e| RenderError::Output(e.to_string()))?;

        Ok(RenderedDocument {
            content_type: "text/plain; charset=utf-8".to_string(),
            file_name: format!("draft-mawb-{}.txt", parent.mawb_no),
            bytes: text.into_bytes(),
        })
    }
}
