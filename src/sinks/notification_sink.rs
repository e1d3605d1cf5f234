// ==========================================
// 金属材料质检流转系统 - 通知接收器
// ==========================================
// 说明: 只负责入队，实际投递由 notify::spawn_notification_worker 完成
// ==========================================

use crate::engine::events::{TransitionEvent, TransitionEventSink};
use crate::notify::notification::Notification;
use std::error::Error;
use tokio::sync::mpsc::UnboundedSender;

pub struct NotificationSink {
    tx: UnboundedSender<Notification>,
}

impl NotificationSink {
    pub fn new(tx: UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl TransitionEventSink for NotificationSink {
    fn handle(&self, event: &TransitionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let Some(notification) = Notification::from_event(event) else {
            tracing::trace!(lot_id = %event.lot_id, status = %event.new_status, "该状态无需通知");
            return Ok(());
        };

        self.tx
            .send(notification)
            .map_err(|e| format!("通知队列已关闭: lot_id={}", e.0.lot_id))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "notification"
    }
}
