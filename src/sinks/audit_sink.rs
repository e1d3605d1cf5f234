// ==========================================
// 金属材料质检流转系统 - 审计日志接收器
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::engine::events::{TransitionEvent, TransitionEventSink};
use crate::repository::action_log_repo::ActionLogRepository;
use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;

/// 将流转事件写入 action_log（StatusTransition）
pub struct AuditLogSink {
    repo: Arc<ActionLogRepository>,
}

impl AuditLogSink {
    pub fn new(repo: Arc<ActionLogRepository>) -> Self {
        Self { repo }
    }
}

impl TransitionEventSink for AuditLogSink {
    fn handle(&self, event: &TransitionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(event.lot_id.clone()),
            ActionType::StatusTransition,
            event.actor_id.clone(),
        )
        .with_role(event.actor_role.as_str())
        .with_payload(event)
        .with_detail(format!("{} → {}", event.old_status, event.new_status));
        log.action_ts = event.occurred_at.naive_utc();

        self.repo.insert(&log)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "audit_log"
    }
}
