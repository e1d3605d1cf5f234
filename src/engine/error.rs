// ==========================================
// 金属材料质检流转系统 - 流转引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 除 Store 外均为可恢复错误，转换为结构化失败结果返回调用方
// ==========================================

use crate::domain::types::{ActorRole, LotStatus};
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 流转引擎错误
#[derive(Error, Debug)]
pub enum TransitionError {
    #[error("批次不存在或已删除: {lot_id}")]
    NotFound { lot_id: String },

    #[error("角色 {role} 无权将批次从 {from} 流转至 {to}")]
    Forbidden {
        from: LotStatus,
        to: LotStatus,
        role: ActorRole,
    },

    #[error("前置条件不满足: {0}")]
    GuardFailed(String),

    #[error("参数错误: {0}")]
    InvalidArgument(String),

    #[error("并发冲突: 批次 {lot_id} 在 {attempts} 次尝试后仍被其他请求修改，请刷新后重试")]
    ConcurrentModification { lot_id: String, attempts: u32 },

    // 存储层故障（连接丢失/数据损坏）不属于业务失败，向上传播
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// 错误种类（对外暴露，可序列化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionErrorKind {
    NotFound,
    Forbidden,
    GuardFailed,
    InvalidArgument,
    ConcurrentModification,
}

impl TransitionError {
    /// 业务错误种类; 存储层错误返回 None
    pub fn kind(&self) -> Option<TransitionErrorKind> {
        match self {
            TransitionError::NotFound { .. } => Some(TransitionErrorKind::NotFound),
            TransitionError::Forbidden { .. } => Some(TransitionErrorKind::Forbidden),
            TransitionError::GuardFailed(_) => Some(TransitionErrorKind::GuardFailed),
            TransitionError::InvalidArgument(_) => Some(TransitionErrorKind::InvalidArgument),
            TransitionError::ConcurrentModification { .. } => {
                Some(TransitionErrorKind::ConcurrentModification)
            }
            TransitionError::Store(_) => None,
        }
    }
}

impl TransitionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionErrorKind::NotFound => "NOT_FOUND",
            TransitionErrorKind::Forbidden => "FORBIDDEN",
            TransitionErrorKind::GuardFailed => "GUARD_FAILED",
            TransitionErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            TransitionErrorKind::ConcurrentModification => "CONCURRENT_MODIFICATION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = TransitionError::Forbidden {
            from: LotStatus::Received,
            to: LotStatus::PendingQc,
            role: ActorRole::Lab,
        };
        assert_eq!(err.kind(), Some(TransitionErrorKind::Forbidden));
        assert!(err.to_string().contains("LAB"));

        let store = TransitionError::from(RepositoryError::LockError("poisoned".to_string()));
        assert_eq!(store.kind(), None);
    }
}
