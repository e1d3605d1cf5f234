// ==========================================
// 金属材料质检流转系统 - 流转 API
// ==========================================
// 职责: 流转引擎门面（流转、可达状态查询、状态说明、流转历史）
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::domain::action_log::ActionLog;
use crate::domain::types::{ActorRole, LotStatus};
use crate::engine::transition::{TransitionEngine, TransitionOutcome};
use crate::repository::action_log_repo::ActionLogRepository;

/// 状态目录项（展示用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub status: LotStatus,
    pub description: String,
    pub is_terminal: bool,
    pub is_testing: bool,
}

pub struct WorkflowApi {
    engine: Arc<TransitionEngine>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl WorkflowApi {
    pub fn new(engine: Arc<TransitionEngine>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            engine,
            action_log_repo,
        }
    }

    /// 执行状态流转
    ///
    /// 业务失败以 `success = false` 返回; 仅存储故障返回 Err
    pub fn transition(
        &self,
        lot_id: &str,
        target: LotStatus,
        actor_id: &str,
        role: ActorRole,
        comment: Option<&str>,
    ) -> ApiResult<TransitionOutcome> {
        Ok(self.engine.transition(lot_id, target, actor_id, role, comment)?)
    }

    /// 执行状态流转（字符串入参）
    pub fn transition_raw(
        &self,
        lot_id: &str,
        target: &str,
        actor_id: &str,
        role: &str,
        comment: Option<&str>,
    ) -> ApiResult<TransitionOutcome> {
        Ok(self
            .engine
            .transition_raw(lot_id, target, actor_id, role, comment)?)
    }

    pub fn allowed_targets(&self, current: LotStatus, role: ActorRole) -> Vec<LotStatus> {
        self.engine.allowed_targets(current, role).into_iter().collect()
    }

    /// 按批次当前状态查询可达状态
    pub fn allowed_targets_for_lot(&self, lot_id: &str, role: ActorRole) -> ApiResult<Vec<LotStatus>> {
        let targets = self.engine.allowed_targets_for_lot(lot_id, role)?;
        Ok(targets.into_iter().collect())
    }

    pub fn describe(&self, status: LotStatus) -> &'static str {
        self.engine.describe(status)
    }

    /// 全部状态目录
    pub fn status_catalogue(&self) -> Vec<StatusInfo> {
        LotStatus::ALL
            .iter()
            .map(|status| StatusInfo {
                status: *status,
                description: self.engine.describe(*status).to_string(),
                is_terminal: status.is_terminal(),
                is_testing: status.is_testing(),
            })
            .collect()
    }

    /// 批次操作历史（时间倒序）
    pub fn lot_history(&self, lot_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_lot_id(lot_id)?)
    }
}
