// ==========================================
// 金属材料质检流转系统 - 引擎层事件分发
// ==========================================
// 职责: 定义状态流转事件与副作用接收器 trait，实现依赖倒置
// 说明: Engine 层定义 trait，审计/通知模块实现适配器
// 红线: 事件只在状态提交之后分发; 分发失败不回滚已提交的流转
// ==========================================

use crate::domain::types::{ActorRole, LotStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 流转事件
// ==========================================

/// 状态流转事件
///
/// 成功提交的流转才会产生事件; 同状态的空操作不产生事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub event_id: String,
    pub lot_id: String,
    pub old_status: LotStatus,
    pub new_status: LotStatus,
    pub actor_id: String,
    pub actor_role: ActorRole,
    pub comment: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// 写入后的 revision
    pub revision: i64,
}

impl TransitionEvent {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} → {} (by {}/{})",
            self.lot_id, self.old_status, self.new_status, self.actor_id, self.actor_role
        )
    }
}

// ==========================================
// 事件接收器 Trait
// ==========================================

/// 副作用接收器 Trait
///
/// Engine 层定义，审计日志 / 部门通知实现
///
/// # 实现说明
/// - `AuditLogSink`: 写入 action_log
/// - `NotificationSink`: 路由为部门通知并投递到异步队列
pub trait TransitionEventSink: Send + Sync {
    /// 处理流转事件
    ///
    /// # 返回
    /// - `Err`: 仅记录日志，不影响已提交的流转
    fn handle(&self, event: &TransitionEvent) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// 接收器名称（日志用）
    fn name(&self) -> &str {
        "sink"
    }
}

/// 空操作接收器
///
/// 用于不需要副作用的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventSink;

impl TransitionEventSink for NoOpEventSink {
    fn handle(&self, event: &TransitionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpEventSink: 跳过事件 - {}", event.summary());
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// 可选的接收器包装
///
/// 简化 Option<Arc<dyn TransitionEventSink>> 的使用
#[derive(Clone)]
pub struct OptionalEventSink {
    inner: Option<Arc<dyn TransitionEventSink>>,
}

impl OptionalEventSink {
    /// 创建带接收器的实例
    pub fn with_sink(sink: Arc<dyn TransitionEventSink>) -> Self {
        Self { inner: Some(sink) }
    }

    /// 创建空实例（不分发事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 分发事件（如果有接收器）
    pub fn dispatch(&self, event: &TransitionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(sink) => sink.handle(event),
            None => {
                tracing::debug!("OptionalEventSink: 未配置接收器，跳过事件 - {}", event.summary());
                Ok(())
            }
        }
    }

    /// 检查是否配置了接收器
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventSink {
    fn default() -> Self {
        Self::none()
    }
}

/// 组合接收器: 依次调用全部接收器，返回第一个错误
#[derive(Clone, Default)]
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn TransitionEventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TransitionEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn TransitionEventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TransitionEventSink for CompositeEventSink {
    fn handle(&self, event: &TransitionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.handle(event) {
                tracing::warn!(
                    sink = sink.name(),
                    lot_id = %event.lot_id,
                    error = %e,
                    "事件接收器处理失败"
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "composite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        calls: AtomicUsize,
        fail: bool,
    }

    impl TransitionEventSink for CountingSink {
        fn handle(&self, _event: &TransitionEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("delivery failed".into())
            } else {
                Ok(())
            }
        }
    }

    fn event() -> TransitionEvent {
        TransitionEvent {
            event_id: "E1".to_string(),
            lot_id: "LOT-1".to_string(),
            old_status: LotStatus::Received,
            new_status: LotStatus::PendingQc,
            actor_id: "wh_user".to_string(),
            actor_role: ActorRole::Warehouse,
            comment: None,
            occurred_at: Utc::now(),
            revision: 1,
        }
    }

    #[test]
    fn test_noop_sink() {
        assert!(NoOpEventSink.handle(&event()).is_ok());
    }

    #[test]
    fn test_optional_sink_none() {
        let sink = OptionalEventSink::none();
        assert!(!sink.is_configured());
        assert!(sink.dispatch(&event()).is_ok());
    }

    #[test]
    fn test_composite_calls_every_sink() {
        let failing = Arc::new(CountingSink {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let ok = Arc::new(CountingSink {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let composite = CompositeEventSink::new()
            .with(failing.clone())
            .with(ok.clone());
        assert_eq!(composite.len(), 2);

        let result = composite.handle(&event());
        assert!(result.is_err());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["old_status"], "RECEIVED");
        assert_eq!(json["new_status"], "PENDING_QC");
        assert_eq!(json["actor_role"], "WAREHOUSE");
    }
}
