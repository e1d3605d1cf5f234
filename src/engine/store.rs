// ==========================================
// 金属材料质检流转系统 - 流转引擎存储接口
// ==========================================
// 职责: 定义引擎所需的持久化接口（依赖倒置）
// 实现者: repository::SqliteLotStore
// ==========================================

use crate::domain::material::MaterialLot;
use crate::engine::error::TransitionError;
use crate::engine::guards::GuardFacts;
use crate::repository::error::RepositoryResult;
use crate::repository::material_lot_repo::StatusWrite;
use std::sync::Arc;

/// 批次快照: 批次本身 + 守卫判定所需的关联实体（同一事务内取得）
#[derive(Debug, Clone)]
pub struct LotSnapshot {
    pub lot: MaterialLot,
    pub facts: GuardFacts,
}

/// 流转判定回调: 返回 `None` 表示无需写入
pub type TransitionDecision<'a> =
    dyn FnMut(&LotSnapshot) -> Result<Option<StatusWrite>, TransitionError> + 'a;

/// 一次流转事务的结果
#[derive(Debug, Clone)]
pub enum TransitionCommit {
    /// 批次行不存在
    Missing,
    /// 判定无需写入，事务内未做修改
    Skipped(MaterialLot),
    /// 已提交; `previous` 为写入前的批次
    Written { previous: MaterialLot, revision: i64 },
}

/// 流转引擎存储 Trait
///
/// # 并发约定
/// - `apply_transition` 在同一写事务内: 加载快照 → 调用判定 → 以快照 revision 条件写入
/// - 判定期间，批次及其关联实体不得被其他写入修改
/// - 判定返回错误时事务回滚，错误原样返回
/// - revision 不匹配时返回 `RepositoryError::OptimisticLockFailure`
/// - 批次在写入时已不存在或已软删除，返回 `RepositoryError::NotFound`
pub trait LotStore: Send + Sync {
    /// 加载批次快照（包含已软删除批次，由引擎判定）
    fn load_snapshot(&self, lot_id: &str) -> RepositoryResult<Option<LotSnapshot>>;

    /// 在单个写事务内完成判定与条件写入
    fn apply_transition(
        &self,
        lot_id: &str,
        decide: &mut TransitionDecision<'_>,
    ) -> Result<TransitionCommit, TransitionError>;
}

impl<T: LotStore + ?Sized> LotStore for Arc<T> {
    fn load_snapshot(&self, lot_id: &str) -> RepositoryResult<Option<LotSnapshot>> {
        (**self).load_snapshot(lot_id)
    }

    fn apply_transition(
        &self,
        lot_id: &str,
        decide: &mut TransitionDecision<'_>,
    ) -> Result<TransitionCommit, TransitionError> {
        (**self).apply_transition(lot_id, decide)
    }
}
