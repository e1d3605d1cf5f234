// ==========================================
// 金属材料质检流转系统 - 领域类型定义
// ==========================================
// 职责: 批次状态枚举、角色枚举、材料形状/试验类型
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 批次状态 (Lot Status)
// ==========================================
// 规范名称唯一; 历史别名只在解析时接受 (见 from_str)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Received,         // 已入库
    PendingQc,        // 待质检
    QcPassed,         // 质检合格
    QcFailed,         // 质检不合格
    LabCheckPending,  // 待实验室检验
    SamplesRequested, // 已申请取样
    SamplesCollected, // 已取样
    Testing,          // 试验中
    TestingCompleted, // 试验完成
    ReadyForUse,      // 可投产
    InUse,            // 使用中
    Rejected,         // 已判废
    Archived,         // 已归档
    EditRequested,    // 申请修改
}

impl LotStatus {
    /// 全部状态（管理员可达集合）
    pub const ALL: [LotStatus; 14] = [
        LotStatus::Received,
        LotStatus::PendingQc,
        LotStatus::QcPassed,
        LotStatus::QcFailed,
        LotStatus::LabCheckPending,
        LotStatus::SamplesRequested,
        LotStatus::SamplesCollected,
        LotStatus::Testing,
        LotStatus::TestingCompleted,
        LotStatus::ReadyForUse,
        LotStatus::InUse,
        LotStatus::Rejected,
        LotStatus::Archived,
        LotStatus::EditRequested,
    ];

    /// 转换为数据库字符串（始终写规范名称）
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Received => "RECEIVED",
            LotStatus::PendingQc => "PENDING_QC",
            LotStatus::QcPassed => "QC_PASSED",
            LotStatus::QcFailed => "QC_FAILED",
            LotStatus::LabCheckPending => "LAB_CHECK_PENDING",
            LotStatus::SamplesRequested => "SAMPLES_REQUESTED",
            LotStatus::SamplesCollected => "SAMPLES_COLLECTED",
            LotStatus::Testing => "TESTING",
            LotStatus::TestingCompleted => "TESTING_COMPLETED",
            LotStatus::ReadyForUse => "READY_FOR_USE",
            LotStatus::InUse => "IN_USE",
            LotStatus::Rejected => "REJECTED",
            LotStatus::Archived => "ARCHIVED",
            LotStatus::EditRequested => "EDIT_REQUESTED",
        }
    }

    /// 从字符串解析（大小写不敏感，接受历史别名）
    ///
    /// 历史别名映射:
    /// - QC_CHECK_PENDING → PENDING_QC
    /// - QC_CHECKED → QC_PASSED
    /// - LAB_TESTING → LAB_CHECK_PENDING
    /// - APPROVED → READY_FOR_USE
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase();
        let status = match normalized.as_str() {
            "RECEIVED" => LotStatus::Received,
            "PENDING_QC" | "QC_CHECK_PENDING" => LotStatus::PendingQc,
            "QC_PASSED" | "QC_CHECKED" => LotStatus::QcPassed,
            "QC_FAILED" => LotStatus::QcFailed,
            "LAB_CHECK_PENDING" | "LAB_TESTING" => LotStatus::LabCheckPending,
            "SAMPLES_REQUESTED" => LotStatus::SamplesRequested,
            "SAMPLES_COLLECTED" => LotStatus::SamplesCollected,
            "TESTING" => LotStatus::Testing,
            "TESTING_COMPLETED" => LotStatus::TestingCompleted,
            "READY_FOR_USE" | "APPROVED" => LotStatus::ReadyForUse,
            "IN_USE" => LotStatus::InUse,
            "REJECTED" => LotStatus::Rejected,
            "ARCHIVED" => LotStatus::Archived,
            "EDIT_REQUESTED" => LotStatus::EditRequested,
            _ => return None,
        };
        Some(status)
    }

    /// 终态: 普通角色无出边
    pub fn is_terminal(&self) -> bool {
        matches!(self, LotStatus::Rejected | LotStatus::Archived)
    }

    /// 是否处于实验室检验超状态
    pub fn is_testing(&self) -> bool {
        matches!(
            self,
            LotStatus::LabCheckPending
                | LotStatus::SamplesRequested
                | LotStatus::SamplesCollected
                | LotStatus::Testing
                | LotStatus::TestingCompleted
        )
    }

    /// 人类可读描述
    pub fn describe(&self) -> &'static str {
        match self {
            LotStatus::Received => "已入库，等待仓库提交质检",
            LotStatus::PendingQc => "待质检部门检查",
            LotStatus::QcPassed => "质检合格",
            LotStatus::QcFailed => "质检不合格，等待仓库复检或判废",
            LotStatus::LabCheckPending => "待实验室检验",
            LotStatus::SamplesRequested => "已申请取样，等待切割样品",
            LotStatus::SamplesCollected => "样品已切割，等待送检",
            LotStatus::Testing => "实验室试验中",
            LotStatus::TestingCompleted => "实验室试验完成，等待结论",
            LotStatus::ReadyForUse => "可投入生产使用",
            LotStatus::InUse => "生产使用中",
            LotStatus::Rejected => "已判废",
            LotStatus::Archived => "已归档",
            LotStatus::EditRequested => "仓库申请修改批次信息，等待质检解锁",
        }
    }
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 操作角色 (Actor Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActorRole {
    Warehouse,  // 仓库
    Qc,         // 质检部 (OTK)
    Lab,        // 实验室
    Production, // 生产
    Admin,      // 管理员
}

impl ActorRole {
    pub const ALL: [ActorRole; 5] = [
        ActorRole::Warehouse,
        ActorRole::Qc,
        ActorRole::Lab,
        ActorRole::Production,
        ActorRole::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Warehouse => "WAREHOUSE",
            ActorRole::Qc => "QC",
            ActorRole::Lab => "LAB",
            ActorRole::Production => "PRODUCTION",
            ActorRole::Admin => "ADMIN",
        }
    }

    /// 从字符串解析（接受 OTK / ADMINISTRATOR 别名）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "WAREHOUSE" => Some(ActorRole::Warehouse),
            "QC" | "OTK" => Some(ActorRole::Qc),
            "LAB" => Some(ActorRole::Lab),
            "PRODUCTION" => Some(ActorRole::Production),
            "ADMIN" | "ADMINISTRATOR" => Some(ActorRole::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 材料形状 (Shape Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeType {
    Sheet,   // 板材
    Pipe,    // 管材
    Rod,     // 棒材
    Angle,   // 角钢
    Channel, // 槽钢
    Other,   // 其他
}

impl ShapeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeType::Sheet => "SHEET",
            ShapeType::Pipe => "PIPE",
            ShapeType::Rod => "ROD",
            ShapeType::Angle => "ANGLE",
            ShapeType::Channel => "CHANNEL",
            ShapeType::Other => "OTHER",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SHEET" => ShapeType::Sheet,
            "PIPE" => ShapeType::Pipe,
            "ROD" => ShapeType::Rod,
            "ANGLE" => ShapeType::Angle,
            "CHANNEL" => ShapeType::Channel,
            _ => ShapeType::Other, // 默认值
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 试验类型 (Test Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestKind {
    Mechanical,     // 力学性能
    Chemical,       // 化学成分
    Metallographic, // 金相
}

impl TestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestKind::Mechanical => "MECHANICAL",
            TestKind::Chemical => "CHEMICAL",
            TestKind::Metallographic => "METALLOGRAPHIC",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MECHANICAL" => Some(TestKind::Mechanical),
            "CHEMICAL" => Some(TestKind::Chemical),
            "METALLOGRAPHIC" => Some(TestKind::Metallographic),
            _ => None,
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_canonical() {
        for status in LotStatus::ALL {
            assert_eq!(LotStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_legacy_aliases() {
        assert_eq!(LotStatus::from_str("QC_CHECKED"), Some(LotStatus::QcPassed));
        assert_eq!(LotStatus::from_str("qc_check_pending"), Some(LotStatus::PendingQc));
        assert_eq!(LotStatus::from_str("LAB_TESTING"), Some(LotStatus::LabCheckPending));
        assert_eq!(LotStatus::from_str("APPROVED"), Some(LotStatus::ReadyForUse));
        assert_eq!(LotStatus::from_str("DELETED"), None);
    }

    #[test]
    fn test_testing_super_state() {
        let testing: Vec<_> = LotStatus::ALL.iter().filter(|s| s.is_testing()).collect();
        assert_eq!(testing.len(), 5);
        assert!(!LotStatus::QcPassed.is_testing());
        assert!(LotStatus::Rejected.is_terminal());
        assert!(LotStatus::Archived.is_terminal());
        assert!(!LotStatus::InUse.is_terminal());
    }

    #[test]
    fn test_role_aliases() {
        assert_eq!(ActorRole::from_str("otk"), Some(ActorRole::Qc));
        assert_eq!(ActorRole::from_str("Administrator"), Some(ActorRole::Admin));
        assert_eq!(ActorRole::from_str("guest"), None);
    }
}
