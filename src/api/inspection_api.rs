// ==========================================
// 金属材料质检流转系统 - 质检 API
// ==========================================
// 职责: 录入质检记录（取代旧的有效记录）、查询
// 红线: 同一批次最多一条有效质检记录
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{ensure_actor, ensure_role, load_active_lot};
use crate::db::begin_write;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::inspection::{InspectionRecord, NewInspection};
use crate::domain::types::{ActorRole, LotStatus};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::inspection_repo::InspectionRepository;

pub struct InspectionApi {
    conn: Arc<Mutex<Connection>>,
    inspection_repo: Arc<InspectionRepository>,
}

impl InspectionApi {
    pub fn new(conn: Arc<Mutex<Connection>>, inspection_repo: Arc<InspectionRepository>) -> Self {
        Self {
            conn,
            inspection_repo,
        }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    /// 录入质检记录
    ///
    /// # 规则
    /// - QC / ADMIN
    /// - 批次处于 PENDING_QC 或实验室检验超状态
    /// - 旧的有效记录在同一事务内失效
    pub fn record_inspection(
        &self,
        lot_id: &str,
        input: NewInspection,
        inspector_id: &str,
        role: ActorRole,
    ) -> ApiResult<InspectionRecord> {
        ensure_actor(inspector_id)?;
        ensure_role(role, &[ActorRole::Qc, ActorRole::Admin], "录入质检")?;
        input.validate().map_err(ApiError::ValidationError)?;

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;
        let lot = load_active_lot(&tx, lot_id)?;

        if lot.status != LotStatus::PendingQc && !lot.status.is_testing() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前状态为 {}，只有待质检或实验室检验中的批次可录入质检",
                lot_id, lot.status
            )));
        }

        let record = InspectionRecord {
            inspection_id: Uuid::new_v4().to_string(),
            lot_id: lot_id.to_string(),
            inspector_id: inspector_id.to_string(),
            criteria: input.criteria,
            defects: input.defects,
            chemical_composition: input.chemical_composition,
            notes: input.notes,
            requires_lab_verification: input.requires_lab_verification,
            is_deleted: false,
            created_at: Utc::now(),
        };

        let superseded = InspectionRepository::insert_superseding_with(&tx, &record)?;

        let mut detail = format!(
            "质检结论: {}",
            if record.has_findings() { "存在问题" } else { "无异常" }
        );
        let defect_names = record.defects.names();
        if !defect_names.is_empty() {
            detail.push_str(&format!("；缺陷: {}", defect_names.join(",")));
        }

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(lot_id.to_string()),
            ActionType::RecordInspection,
            inspector_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&serde_json::json!({
            "inspection": &record,
            "superseded": superseded,
        }))
        .with_detail(detail);
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(
            lot_id = %lot_id,
            inspection_id = %record.inspection_id,
            requires_lab = record.requires_lab_verification,
            superseded,
            "质检记录已录入"
        );
        Ok(record)
    }

    /// 查询当前有效质检记录
    pub fn get_active_inspection(&self, lot_id: &str) -> ApiResult<Option<InspectionRecord>> {
        Ok(self.inspection_repo.find_active_by_lot(lot_id)?)
    }

    /// 查询质检历史（含已取代记录）
    pub fn list_inspections(&self, lot_id: &str) -> ApiResult<Vec<InspectionRecord>> {
        Ok(self.inspection_repo.list_by_lot(lot_id)?)
    }
}
