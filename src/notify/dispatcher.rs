// ==========================================
// 金属材料质检流转系统 - 通知投递
// ==========================================
// 职责: 异步投递接口 + 后台投递任务
// 说明: 具体渠道（邮件/IM）由外部实现 NotificationDispatcher
// ==========================================

use crate::notify::notification::Notification;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// 通知投递 Trait
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &Notification) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 日志投递（默认实现）
#[derive(Debug, Clone, Default)]
pub struct LogNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LogNotificationDispatcher {
    async fn dispatch(&self, notification: &Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
        let recipients: Vec<&str> = notification.recipients.iter().map(|r| r.as_str()).collect();
        tracing::info!(
            lot_id = %notification.lot_id,
            recipients = ?recipients,
            subject = %notification.subject,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// 启动后台投递任务
///
/// 通道关闭（所有发送端释放）后任务结束，返回成功投递的数量
pub fn spawn_notification_worker(
    mut rx: UnboundedReceiver<Notification>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(notification) = rx.recv().await {
            match dispatcher.dispatch(&notification).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        lot_id = %notification.lot_id,
                        error = %e,
                        "通知投递失败"
                    );
                }
            }
        }
        tracing::info!(delivered, "通知投递任务结束");
        delivered
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ActorRole, LotStatus};
    use chrono::Utc;
    use tokio::sync::{mpsc, Mutex};

    struct RecordingDispatcher {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationDispatcher for RecordingDispatcher {
        async fn dispatch(&self, notification: &Notification) -> Result<(), Box<dyn Error + Send + Sync>> {
            if notification.lot_id == "BROKEN" {
                return Err("channel down".into());
            }
            self.seen.lock().await.push(notification.lot_id.clone());
            Ok(())
        }
    }

    fn notification(lot_id: &str) -> Notification {
        Notification {
            lot_id: lot_id.to_string(),
            recipients: vec![ActorRole::Qc],
            subject: "s".to_string(),
            body: "b".to_string(),
            new_status: LotStatus::PendingQc,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_worker_drains_and_skips_failures() {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(RecordingDispatcher {
            seen: Mutex::new(Vec::new()),
        });
        let handle = spawn_notification_worker(rx, dispatcher.clone());

        tx.send(notification("LOT-1")).unwrap();
        tx.send(notification("BROKEN")).unwrap();
        tx.send(notification("LOT-2")).unwrap();
        drop(tx);

        let delivered = handle.await.unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(*dispatcher.seen.lock().await, vec!["LOT-1".to_string(), "LOT-2".to_string()]);
    }

    #[tokio::test]
    async fn test_log_dispatcher() {
        assert!(LogNotificationDispatcher.dispatch(&notification("LOT-1")).await.is_ok());
    }
}
