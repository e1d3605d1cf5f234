// ==========================================
// 金属材料质检流转系统 - 取样申请领域模型
// ==========================================
// 红线: 先取样(is_collected)后送检(is_sent_to_lab)，顺序不可颠倒
// ==========================================

use crate::domain::types::TestKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRequest {
    pub request_id: String,
    pub lot_id: String,
    pub requested_by: String,

    pub sample_size: f64,
    pub sample_unit: String,
    pub test_kinds: Vec<TestKind>,
    pub cutting_location: Option<String>, // 切割位置说明

    pub is_collected: bool,
    pub collected_at: Option<DateTime<Utc>>,
    pub is_sent_to_lab: bool,
    pub sent_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSampleRequest {
    pub sample_size: f64,
    pub sample_unit: String,
    pub test_kinds: Vec<TestKind>,
    pub cutting_location: Option<String>,
}

impl NewSampleRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.sample_size > 0.0) {
            return Err(format!("样品尺寸必须大于0: {}", self.sample_size));
        }
        if self.sample_unit.trim().is_empty() {
            return Err("样品单位不能为空".to_string());
        }
        if self.test_kinds.is_empty() {
            return Err("至少选择一种试验类型".to_string());
        }
        Ok(())
    }
}

impl SampleRequest {
    /// 标记已取样
    ///
    /// 只能标记一次
    pub fn mark_collected(&mut self, at: DateTime<Utc>) -> Result<(), String> {
        if self.is_collected {
            return Err(format!("取样申请 {} 已标记为已取样", self.request_id));
        }
        self.is_collected = true;
        self.collected_at = Some(at);
        Ok(())
    }

    /// 标记已送检
    ///
    /// 必须先取样
    pub fn mark_sent(&mut self, at: DateTime<Utc>) -> Result<(), String> {
        if !self.is_collected {
            return Err(format!("取样申请 {} 尚未取样，不能送检", self.request_id));
        }
        if self.is_sent_to_lab {
            return Err(format!("取样申请 {} 已送检", self.request_id));
        }
        self.is_sent_to_lab = true;
        self.sent_at = Some(at);
        Ok(())
    }
}
