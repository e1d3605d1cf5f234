// ==========================================
// 金属材料质检流转系统 - 部门通知
// ==========================================
// 职责: 流转事件 → 部门通知的路由，以及异步投递
// 红线: 投递在事务之外进行，失败只记录日志
// ==========================================

pub mod dispatcher;
pub mod notification;

pub use dispatcher::{spawn_notification_worker, LogNotificationDispatcher, NotificationDispatcher};
pub use notification::{route_recipients, Notification};
