// ==========================================
// 金属材料质检流转系统 - 流转事件接收器实现
// ==========================================
// 职责: 实现 engine::TransitionEventSink（审计日志 / 部门通知）
// ==========================================

pub mod audit_sink;
pub mod notification_sink;

pub use audit_sink::AuditLogSink;
pub use notification_sink::NotificationSink;
