// ==========================================
// 金属材料质检流转系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/Engine错误为用户友好的错误消息
// ==========================================

use crate::engine::error::TransitionError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无权操作: {0}")]
    Forbidden(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("前置条件不满足: {0}")]
    GuardFailed(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    #[error("并发冲突: {0}")]
    ConcurrentModification(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 并发控制错误
            RepositoryError::OptimisticLockFailure {
                lot_id,
                expected,
                actual,
            } => ApiError::OptimisticLockFailure(format!(
                "批次{}已被其他用户修改（期望revision={}，实际revision={}）",
                lot_id, expected, actual
            )),

            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),

            // 数据质量错误
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 TransitionError 转换
// ==========================================
impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotFound { lot_id } => {
                ApiError::NotFound(format!("MaterialLot(id={})不存在", lot_id))
            }
            TransitionError::Forbidden { from, to, .. } => ApiError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            TransitionError::GuardFailed(msg) => ApiError::GuardFailed(msg),
            TransitionError::InvalidArgument(msg) => ApiError::InvalidInput(msg),
            err @ TransitionError::ConcurrentModification { .. } => {
                ApiError::ConcurrentModification(err.to_string())
            }
            TransitionError::Store(e) => e.into(),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ActorRole, LotStatus};

    #[test]
    fn test_repository_error_conversion() {
        // NotFound错误转换
        let repo_err = RepositoryError::NotFound {
            entity: "MaterialLot".to_string(),
            id: "LOT-001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("MaterialLot"));
                assert!(msg.contains("LOT-001"));
            }
            _ => panic!("Expected NotFound"),
        }

        // OptimisticLockFailure转换
        let repo_err = RepositoryError::OptimisticLockFailure {
            lot_id: "LOT-001".to_string(),
            expected: 1,
            actual: 2,
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::OptimisticLockFailure(msg) => {
                assert!(msg.contains("LOT-001"));
                assert!(msg.contains("已被其他用户修改"));
            }
            _ => panic!("Expected OptimisticLockFailure"),
        }
    }

    #[test]
    fn test_transition_error_conversion() {
        let err = TransitionError::Forbidden {
            from: LotStatus::Rejected,
            to: LotStatus::Received,
            role: ActorRole::Qc,
        };
        match ApiError::from(err) {
            ApiError::InvalidStateTransition { from, to } => {
                assert_eq!(from, "REJECTED");
                assert_eq!(to, "RECEIVED");
            }
            other => panic!("Expected InvalidStateTransition, got {:?}", other),
        }

        let err = TransitionError::GuardFailed("尚无合格试验".to_string());
        assert!(matches!(ApiError::from(err), ApiError::GuardFailed(_)));
    }
}
