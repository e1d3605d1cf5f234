// ==========================================
// 金属材料质检流转系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod inspection;
pub mod material;
pub mod sample;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use inspection::{InspectionCriteria, InspectionDefects, InspectionRecord, NewInspection};
pub use lab_test::{LabTest, NewLabTest};
pub use material::{Dimensions, MaterialLot, NewMaterialLot};
pub use sample::{NewSampleRequest, SampleRequest};
pub use types::{ActorRole, LotStatus, ShapeType, TestKind};
