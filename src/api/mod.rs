// ==========================================
// 金属材料质检流转系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供上层（HTTP/CLI/桌面端）调用
// 约定: 写操作在单个 SQLite 事务内完成，并记录 ActionLog
// ==========================================

pub mod error;
pub mod inspection_api;
pub mod lab_test_api;
pub mod lot_api;
pub mod sample_api;
pub mod validator;
pub mod workflow_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use inspection_api::InspectionApi;
pub use lab_test_api::LabTestApi;
pub use lot_api::LotApi;
pub use sample_api::SampleApi;
pub use workflow_api::{StatusInfo, WorkflowApi};
