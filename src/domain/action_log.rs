// ==========================================
// 金属材料质检流转系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪（状态流转由 AuditLogSink 写入）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,          // 日志ID
    pub lot_id: Option<String>,     // 关联批次 (系统操作可为None)
    pub action_type: String,        // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,   // 操作时间戳
    pub actor: String,              // 操作人
    pub actor_role: Option<String>, // 操作人角色

    pub payload_json: Option<JsonValue>, // 操作参数 (JSON)
    pub detail: Option<String>,          // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    CreateLot,            // 入库登记
    UpdateLot,            // 修改批次信息
    RetireLot,            // 批次软删除
    StatusTransition,     // 状态流转
    RecordInspection,     // 录入质检
    CreateSampleRequest,  // 申请取样
    MarkSampleCollected,  // 已取样
    MarkSampleSent,       // 已送检
    CreateLabTest,        // 创建试验
    CompleteLabTest,      // 录入试验结论
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::CreateLot => "CreateLot",
            ActionType::UpdateLot => "UpdateLot",
            ActionType::RetireLot => "RetireLot",
            ActionType::StatusTransition => "StatusTransition",
            ActionType::RecordInspection => "RecordInspection",
            ActionType::CreateSampleRequest => "CreateSampleRequest",
            ActionType::MarkSampleCollected => "MarkSampleCollected",
            ActionType::MarkSampleSent => "MarkSampleSent",
            ActionType::CreateLabTest => "CreateLabTest",
            ActionType::CompleteLabTest => "CompleteLabTest",
        }
    }
}

impl ActionLog {
    /// 创建新的操作日志
    ///
    /// # 参数
    /// - `action_id`: 日志ID (通常使用UUID)
    /// - `lot_id`: 关联批次ID (可选)
    /// - `action_type`: 操作类型
    /// - `actor`: 操作人
    pub fn new(
        action_id: String,
        lot_id: Option<String>,
        action_type: ActionType,
        actor: String,
    ) -> Self {
        Self {
            action_id,
            lot_id,
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor,
            actor_role: None,
            payload_json: None,
            detail: None,
        }
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.actor_role = Some(role.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
