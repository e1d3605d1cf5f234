// ==========================================
// 金属材料质检流转系统 - 批次 API
// ==========================================
// 职责: 入库登记、批次查询、信息修改、申请修改、软删除
// 红线: 状态只经由流转引擎修改; 每个写操作同一事务内记录 ActionLog
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{ensure_actor, ensure_role, load_active_lot};
use crate::db::begin_write;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::material::{MaterialLot, NewMaterialLot};
use crate::domain::types::{ActorRole, LotStatus};
use crate::engine::transition::{TransitionEngine, TransitionOutcome};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::material_lot_repo::MaterialLotRepository;

// ==========================================
// LotApi - 批次 API
// ==========================================
pub struct LotApi {
    conn: Arc<Mutex<Connection>>,
    lot_repo: Arc<MaterialLotRepository>,
    engine: Arc<TransitionEngine>,
}

impl LotApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        lot_repo: Arc<MaterialLotRepository>,
        engine: Arc<TransitionEngine>,
    ) -> Self {
        Self {
            conn,
            lot_repo,
            engine,
        }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询批次（已软删除视为不存在）
    pub fn get_lot(&self, lot_id: &str) -> ApiResult<MaterialLot> {
        match self.lot_repo.find_by_id(lot_id)? {
            Some(lot) if !lot.is_deleted => Ok(lot),
            _ => Err(ApiError::NotFound(format!("MaterialLot(id={})不存在", lot_id))),
        }
    }

    /// 查询批次列表
    ///
    /// # 参数
    /// - status: 可选状态过滤
    /// - include_deleted: 是否包含已软删除批次
    pub fn list_lots(
        &self,
        status: Option<LotStatus>,
        include_deleted: bool,
    ) -> ApiResult<Vec<MaterialLot>> {
        let lots = self.lot_repo.list(status, include_deleted)?;
        debug!(count = lots.len(), status = ?status, "查询批次列表");
        Ok(lots)
    }

    // ==========================================
    // 写入接口
    // ==========================================

    /// 入库登记（状态 RECEIVED）
    ///
    /// # 权限
    /// - WAREHOUSE / ADMIN
    pub fn create_lot(
        &self,
        input: NewMaterialLot,
        actor_id: &str,
        role: ActorRole,
    ) -> ApiResult<MaterialLot> {
        ensure_actor(actor_id)?;
        ensure_role(role, &[ActorRole::Warehouse, ActorRole::Admin], "入库登记")?;
        input.validate().map_err(ApiError::ValidationError)?;

        let lot = MaterialLot::from_new(Uuid::new_v4().to_string(), input, actor_id.to_string());

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;
        MaterialLotRepository::insert_with(&tx, &lot)?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(lot.lot_id.clone()),
            ActionType::CreateLot,
            actor_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&lot)
        .with_detail(format!("入库登记: {} {}{}", lot.material_grade, lot.quantity, lot.unit));
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(lot_id = %lot.lot_id, grade = %lot.material_grade, actor = %actor_id, "批次入库登记");
        Ok(lot)
    }

    /// 修改批次非状态字段
    ///
    /// # 规则
    /// - 只允许 RECEIVED 状态（其他状态需先申请修改并由质检解锁）
    /// - revision + 1
    ///
    /// # 权限
    /// - WAREHOUSE / ADMIN
    pub fn update_lot_details(
        &self,
        lot_id: &str,
        input: NewMaterialLot,
        actor_id: &str,
        role: ActorRole,
    ) -> ApiResult<MaterialLot> {
        ensure_actor(actor_id)?;
        ensure_role(role, &[ActorRole::Warehouse, ActorRole::Admin], "修改批次信息")?;
        input.validate().map_err(ApiError::ValidationError)?;

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;
        let current = load_active_lot(&tx, lot_id)?;

        if !current.is_editable() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前状态为 {}，只有 RECEIVED 状态可修改（请先申请修改）",
                lot_id, current.status
            )));
        }

        let mut updated = MaterialLot::from_new(current.lot_id.clone(), input, current.created_by.clone());
        updated.status = current.status;
        updated.created_at = current.created_at;
        updated.revision = MaterialLotRepository::update_details_with(&tx, &updated, current.revision)?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(lot_id.to_string()),
            ActionType::UpdateLot,
            actor_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&serde_json::json!({
            "before": &current,
            "after": &updated,
        }));
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(lot_id = %lot_id, revision = updated.revision, actor = %actor_id, "批次信息已修改");
        Ok(updated)
    }

    /// 申请修改（经由流转引擎进入 EDIT_REQUESTED）
    pub fn request_edit(
        &self,
        lot_id: &str,
        actor_id: &str,
        role: ActorRole,
        comment: &str,
    ) -> ApiResult<TransitionOutcome> {
        let outcome = self.engine.transition(
            lot_id,
            LotStatus::EditRequested,
            actor_id,
            role,
            Some(comment),
        )?;
        Ok(outcome)
    }

    /// 软删除批次
    ///
    /// # 规则
    /// - 仅 ADMIN
    /// - 批次必须处于 REJECTED / ARCHIVED
    pub fn retire_lot(
        &self,
        lot_id: &str,
        actor_id: &str,
        role: ActorRole,
        reason: &str,
    ) -> ApiResult<()> {
        ensure_actor(actor_id)?;
        ensure_role(role, &[ActorRole::Admin], "删除批次")?;
        if reason.trim().is_empty() {
            return Err(ApiError::InvalidInput("删除原因不能为空".to_string()));
        }

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;
        let lot = load_active_lot(&tx, lot_id)?;

        if !lot.status.is_terminal() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前状态为 {}，只有 REJECTED / ARCHIVED 批次可删除",
                lot_id, lot.status
            )));
        }

        MaterialLotRepository::soft_delete_with(&tx, lot_id, lot.revision)?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(lot_id.to_string()),
            ActionType::RetireLot,
            actor_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&serde_json::json!({
            "status": lot.status,
            "reason": reason,
            "retired_at": Utc::now(),
        }))
        .with_detail(reason.trim());
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(lot_id = %lot_id, actor = %actor_id, "批次已软删除");
        Ok(())
    }
}
