// ==========================================
// 金属材料质检流转系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_with(conn, ..)` 静态方法在调用方事务内执行
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod inspection_repo;
pub mod lab_test_repo;
pub mod material_lot_repo;
pub mod sample_request_repo;
pub mod workflow_store;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use inspection_repo::InspectionRepository;
pub use lab_test_repo::LabTestRepository;
pub use material_lot_repo::{MaterialLotRepository, StatusWrite};
pub use sample_request_repo::SampleRequestRepository;
pub use workflow_store::SqliteLotStore;
