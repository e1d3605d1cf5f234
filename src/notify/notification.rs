// ==========================================
// 金属材料质检流转系统 - 通知模型与路由
// ==========================================

use crate::domain::types::{ActorRole, LotStatus};
use crate::engine::events::TransitionEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 部门通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub lot_id: String,
    pub recipients: Vec<ActorRole>,
    pub subject: String,
    pub body: String,
    pub new_status: LotStatus,
    pub created_at: DateTime<Utc>,
}

/// 新状态 → 需要知会的部门
///
/// 未列出的状态不产生通知
pub fn route_recipients(new_status: LotStatus) -> Vec<ActorRole> {
    match new_status {
        LotStatus::PendingQc => vec![ActorRole::Qc],
        LotStatus::QcFailed => vec![ActorRole::Warehouse],
        LotStatus::LabCheckPending | LotStatus::SamplesCollected => vec![ActorRole::Lab],
        LotStatus::SamplesRequested => vec![ActorRole::Warehouse, ActorRole::Lab],
        LotStatus::TestingCompleted => vec![ActorRole::Qc],
        LotStatus::ReadyForUse => vec![ActorRole::Production, ActorRole::Warehouse],
        LotStatus::Rejected => vec![ActorRole::Warehouse, ActorRole::Qc],
        LotStatus::EditRequested => vec![ActorRole::Qc],
        _ => Vec::new(),
    }
}

impl Notification {
    /// 由流转事件生成通知; 无需知会任何部门时返回 None
    pub fn from_event(event: &TransitionEvent) -> Option<Self> {
        let recipients = route_recipients(event.new_status);
        if recipients.is_empty() {
            return None;
        }

        let mut body = format!(
            "批次 {} 状态由 {} 变更为 {}（{}），操作人 {}/{}",
            event.lot_id,
            event.old_status,
            event.new_status,
            event.new_status.describe(),
            event.actor_id,
            event.actor_role
        );
        if let Some(comment) = &event.comment {
            body.push_str(&format!("，备注: {}", comment));
        }

        Some(Self {
            lot_id: event.lot_id.clone(),
            recipients,
            subject: format!("[{}] {}", event.new_status, event.lot_id),
            body,
            new_status: event.new_status,
            created_at: event.occurred_at,
        })
    }
}
