// ==========================================
// 金属材料质检流转系统 - 状态流转引擎
// ==========================================
// 职责: 校验并原子地应用批次状态流转，提交后分发事件
// 流程: [写事务: 加载快照 → 规则表 → 实体守卫 → 条件写入(revision)] → 分发事件
// 红线: 任何失败路径都不修改批次; 并发冲突必须重新校验，不可盲目重试
// ==========================================

use crate::config::workflow_config_trait::WorkflowConfigReader;
use crate::domain::types::{ActorRole, LotStatus};
use crate::engine::error::{TransitionError, TransitionErrorKind};
use crate::engine::events::{OptionalEventSink, TransitionEvent, TransitionEventSink};
use crate::engine::guards::{self, GuardPolicy};
use crate::engine::rules;
use crate::engine::store::{LotSnapshot, LotStore, TransitionCommit};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::material_lot_repo::StatusWrite;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// 默认的并发冲突重新校验次数
pub const DEFAULT_MAX_TRANSITION_RETRIES: u32 = 3;

// ==========================================
// TransitionOutcome - 流转结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub success: bool,
    pub message: String,
    pub lot_id: String,
    /// 流转前状态（批次未找到/参数错误时为空）
    pub old_status: Option<LotStatus>,
    /// 请求的目标状态（参数无法解析时为空）
    pub target_status: Option<LotStatus>,
    /// 是否实际发生了写入（同状态空操作为 false）
    pub changed: bool,
    pub revision: Option<i64>,
    pub error_kind: Option<TransitionErrorKind>,
}

impl TransitionOutcome {
    fn failure(
        lot_id: &str,
        old_status: Option<LotStatus>,
        target_status: Option<LotStatus>,
        err: &TransitionError,
    ) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            lot_id: lot_id.to_string(),
            old_status,
            target_status,
            changed: false,
            revision: None,
            error_kind: err.kind(),
        }
    }
}

enum Applied {
    Unchanged { status: LotStatus, revision: i64 },
    Changed(TransitionEvent),
}

// ==========================================
// TransitionEngine - 状态流转引擎
// ==========================================
pub struct TransitionEngine {
    store: Arc<dyn LotStore>,
    sink: OptionalEventSink,
    max_retries: u32,
    policy: GuardPolicy,
}

impl TransitionEngine {
    /// 创建引擎（无事件接收器，默认重试次数）
    pub fn new(store: Arc<dyn LotStore>) -> Self {
        Self {
            store,
            sink: OptionalEventSink::none(),
            max_retries: DEFAULT_MAX_TRANSITION_RETRIES,
            policy: GuardPolicy::default(),
        }
    }

    /// 从配置创建引擎
    ///
    /// 配置读取失败时使用默认值并记录告警
    pub fn from_config(store: Arc<dyn LotStore>, config: &dyn WorkflowConfigReader) -> Self {
        let max_retries = config.get_max_transition_retries().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "读取 max_transition_retries 失败，使用默认值");
            DEFAULT_MAX_TRANSITION_RETRIES
        });
        let edit_request_requires_comment =
            config.get_edit_request_requires_comment().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "读取 edit_request_requires_comment 失败，使用默认值");
                true
            });

        Self::new(store)
            .with_max_retries(max_retries)
            .with_policy(GuardPolicy {
                edit_request_requires_comment,
            })
    }

    pub fn with_sink(mut self, sink: Arc<dyn TransitionEventSink>) -> Self {
        self.sink = OptionalEventSink::with_sink(sink);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_policy(mut self, policy: GuardPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ==========================================
    // 只读查询
    // ==========================================

    /// 规则表查询（无同步、无副作用）
    pub fn allowed_targets(&self, current: LotStatus, role: ActorRole) -> BTreeSet<LotStatus> {
        rules::allowed_targets(current, role)
    }

    /// 按批次当前状态查询允许的目标状态
    pub fn allowed_targets_for_lot(
        &self,
        lot_id: &str,
        role: ActorRole,
    ) -> Result<BTreeSet<LotStatus>, TransitionError> {
        let snapshot = self
            .store
            .load_snapshot(lot_id)?
            .filter(|s| !s.lot.is_deleted)
            .ok_or_else(|| TransitionError::NotFound {
                lot_id: lot_id.to_string(),
            })?;
        Ok(rules::allowed_targets(snapshot.lot.status, role))
    }

    pub fn describe(&self, status: LotStatus) -> &'static str {
        status.describe()
    }

    // ==========================================
    // 流转
    // ==========================================

    /// 执行状态流转
    ///
    /// # 返回
    /// - `Ok(outcome)`: 成功或业务失败（NotFound/Forbidden/GuardFailed/InvalidArgument/ConcurrentModification）
    /// - `Err`: 存储层故障
    pub fn transition(
        &self,
        lot_id: &str,
        target: LotStatus,
        actor_id: &str,
        role: ActorRole,
        comment: Option<&str>,
    ) -> RepositoryResult<TransitionOutcome> {
        match self.apply(lot_id, target, actor_id, role, comment) {
            Ok(Applied::Unchanged { status, revision }) => {
                tracing::debug!(lot_id = %lot_id, status = %status, "目标状态与当前状态相同，空操作");
                Ok(TransitionOutcome {
                    success: true,
                    message: format!("批次 {} 已处于 {}，无需变更", lot_id, status),
                    lot_id: lot_id.to_string(),
                    old_status: Some(status),
                    target_status: Some(target),
                    changed: false,
                    revision: Some(revision),
                    error_kind: None,
                })
            }
            Ok(Applied::Changed(event)) => {
                tracing::info!(
                    lot_id = %event.lot_id,
                    from = %event.old_status,
                    to = %event.new_status,
                    actor = %event.actor_id,
                    role = %event.actor_role,
                    revision = event.revision,
                    "批次状态流转成功"
                );

                // 提交之后分发，失败只记录
                if let Err(e) = self.sink.dispatch(&event) {
                    tracing::warn!(lot_id = %event.lot_id, error = %e, "流转事件分发失败（流转已提交）");
                }

                Ok(TransitionOutcome {
                    success: true,
                    message: format!(
                        "批次 {} 状态已由 {} 变更为 {}",
                        event.lot_id, event.old_status, event.new_status
                    ),
                    lot_id: event.lot_id.clone(),
                    old_status: Some(event.old_status),
                    target_status: Some(event.new_status),
                    changed: true,
                    revision: Some(event.revision),
                    error_kind: None,
                })
            }
            Err(TransitionError::Store(e)) => {
                tracing::error!(lot_id = %lot_id, error = %e, "状态流转存储故障");
                Err(e)
            }
            Err(err) => {
                tracing::warn!(
                    lot_id = %lot_id,
                    target = %target,
                    role = %role,
                    error = %err,
                    "状态流转被拒绝"
                );
                let old_status = match &err {
                    TransitionError::Forbidden { from, .. } => Some(*from),
                    _ => None,
                };
                Ok(TransitionOutcome::failure(lot_id, old_status, Some(target), &err))
            }
        }
    }

    /// 执行状态流转（字符串入参，接受历史别名）
    pub fn transition_raw(
        &self,
        lot_id: &str,
        target: &str,
        actor_id: &str,
        role: &str,
        comment: Option<&str>,
    ) -> RepositoryResult<TransitionOutcome> {
        let parsed_target = LotStatus::from_str(target);
        let parsed_role = ActorRole::from_str(role);

        match (parsed_target, parsed_role) {
            (Some(target), Some(role)) => self.transition(lot_id, target, actor_id, role, comment),
            (None, _) => {
                let err = TransitionError::InvalidArgument(format!("未知的目标状态: {}", target));
                Ok(TransitionOutcome::failure(lot_id, None, None, &err))
            }
            (Some(target), None) => {
                let err = TransitionError::InvalidArgument(format!("未知的角色: {}", role));
                Ok(TransitionOutcome::failure(lot_id, None, Some(target), &err))
            }
        }
    }

    /// 在同一写事务内: 加载 → 校验 → 条件写入; revision 冲突时重新加载并重新校验
    fn apply(
        &self,
        lot_id: &str,
        target: LotStatus,
        actor_id: &str,
        role: ActorRole,
        comment: Option<&str>,
    ) -> Result<Applied, TransitionError> {
        if actor_id.trim().is_empty() {
            return Err(TransitionError::InvalidArgument("操作人不能为空".to_string()));
        }

        let policy = &self.policy;
        let mut decide = |snapshot: &LotSnapshot| -> Result<Option<StatusWrite>, TransitionError> {
            let lot = &snapshot.lot;
            if lot.is_deleted {
                return Err(TransitionError::NotFound {
                    lot_id: lot_id.to_string(),
                });
            }
            if lot.status == target {
                return Ok(None);
            }
            if !rules::is_allowed(lot.status, target, role) {
                return Err(TransitionError::Forbidden {
                    from: lot.status,
                    to: target,
                    role,
                });
            }
            guards::check_guards(lot, target, comment, &snapshot.facts, policy)
                .map_err(TransitionError::GuardFailed)?;
            Ok(Some(guards::build_status_write(lot, target, comment)))
        };

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;

            match self.store.apply_transition(lot_id, &mut decide) {
                Ok(TransitionCommit::Written { previous, revision }) => {
                    return Ok(Applied::Changed(TransitionEvent {
                        event_id: Uuid::new_v4().to_string(),
                        lot_id: lot_id.to_string(),
                        old_status: previous.status,
                        new_status: target,
                        actor_id: actor_id.to_string(),
                        actor_role: role,
                        comment: comment
                            .map(str::trim)
                            .filter(|c| !c.is_empty())
                            .map(str::to_string),
                        occurred_at: Utc::now(),
                        revision,
                    }));
                }
                Ok(TransitionCommit::Skipped(lot)) => {
                    return Ok(Applied::Unchanged {
                        status: lot.status,
                        revision: lot.revision,
                    });
                }
                Ok(TransitionCommit::Missing)
                | Err(TransitionError::Store(RepositoryError::NotFound { .. })) => {
                    return Err(TransitionError::NotFound {
                        lot_id: lot_id.to_string(),
                    });
                }
                Err(TransitionError::Store(RepositoryError::OptimisticLockFailure {
                    expected,
                    actual,
                    ..
                })) => {
                    if attempts > self.max_retries {
                        return Err(TransitionError::ConcurrentModification {
                            lot_id: lot_id.to_string(),
                            attempts,
                        });
                    }
                    tracing::debug!(
                        lot_id = %lot_id,
                        expected,
                        actual,
                        attempt = attempts,
                        "revision 冲突，重新加载并校验"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
