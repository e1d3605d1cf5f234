// ==========================================
// 金属材料质检流转系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 材料批次入库 → 质检 → 实验室检验 → 放行/判废 的状态流转
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 状态流转规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 部门通知
pub mod notify;

// 流转事件接收器（审计/通知）
pub mod sinks;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ActorRole, LotStatus, ShapeType, TestKind};

// 领域实体
pub use domain::{
    ActionLog, ActionType, InspectionRecord, LabTest, MaterialLot, NewMaterialLot,
    SampleRequest,
};

// 引擎
pub use engine::{
    TransitionEngine, TransitionError, TransitionErrorKind, TransitionEvent, TransitionEventSink,
    TransitionOutcome,
};

// API
pub use api::{InspectionApi, LabTestApi, LotApi, SampleApi, WorkflowApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "金属材料质检流转系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
