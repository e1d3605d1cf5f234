// ==========================================
// 金属材料质检流转系统 - 取样 API
// ==========================================
// 职责: 取样申请、标记已取样、标记已送检
// 红线: 先取样后送检; 每个标记只能设置一次
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{ensure_actor, ensure_role, load_active_lot};
use crate::db::begin_write;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::sample::{NewSampleRequest, SampleRequest};
use crate::domain::types::ActorRole;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::sample_request_repo::SampleRequestRepository;

/// 取样申请上的单向标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleFlag {
    Collected,
    SentToLab,
}

impl SampleFlag {
    fn apply(self, request: &mut SampleRequest, at: DateTime<Utc>) -> Result<(), String> {
        match self {
            SampleFlag::Collected => request.mark_collected(at),
            SampleFlag::SentToLab => request.mark_sent(at),
        }
    }

    fn action_type(self) -> ActionType {
        match self {
            SampleFlag::Collected => ActionType::MarkSampleCollected,
            SampleFlag::SentToLab => ActionType::MarkSampleSent,
        }
    }
}

pub struct SampleApi {
    conn: Arc<Mutex<Connection>>,
    sample_repo: Arc<SampleRequestRepository>,
}

impl SampleApi {
    pub fn new(conn: Arc<Mutex<Connection>>, sample_repo: Arc<SampleRequestRepository>) -> Self {
        Self { conn, sample_repo }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    /// 创建取样申请
    ///
    /// # 规则
    /// - QC / LAB / ADMIN
    /// - 批次处于实验室检验超状态
    pub fn create_sample_request(
        &self,
        lot_id: &str,
        input: NewSampleRequest,
        actor_id: &str,
        role: ActorRole,
    ) -> ApiResult<SampleRequest> {
        ensure_actor(actor_id)?;
        ensure_role(
            role,
            &[ActorRole::Qc, ActorRole::Lab, ActorRole::Admin],
            "申请取样",
        )?;
        input.validate().map_err(ApiError::ValidationError)?;

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;
        let lot = load_active_lot(&tx, lot_id)?;

        if !lot.status.is_testing() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前状态为 {}，不在实验室检验流程中，不能申请取样",
                lot_id, lot.status
            )));
        }

        let request = SampleRequest {
            request_id: Uuid::new_v4().to_string(),
            lot_id: lot_id.to_string(),
            requested_by: actor_id.to_string(),
            sample_size: input.sample_size,
            sample_unit: input.sample_unit,
            test_kinds: input.test_kinds,
            cutting_location: input.cutting_location,
            is_collected: false,
            collected_at: None,
            is_sent_to_lab: false,
            sent_at: None,
            created_at: Utc::now(),
        };
        SampleRequestRepository::insert_with(&tx, &request)?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(lot_id.to_string()),
            ActionType::CreateSampleRequest,
            actor_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&request);
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(lot_id = %lot_id, request_id = %request.request_id, "取样申请已创建");
        Ok(request)
    }

    /// 标记已取样
    ///
    /// # 权限
    /// - WAREHOUSE / LAB / ADMIN
    pub fn mark_collected(
        &self,
        request_id: &str,
        actor_id: &str,
        role: ActorRole,
    ) -> ApiResult<SampleRequest> {
        self.update_flags(request_id, actor_id, role, SampleFlag::Collected)
    }

    /// 标记已送检（必须先取样）
    ///
    /// # 权限
    /// - WAREHOUSE / LAB / ADMIN
    pub fn mark_sent_to_lab(
        &self,
        request_id: &str,
        actor_id: &str,
        role: ActorRole,
    ) -> ApiResult<SampleRequest> {
        self.update_flags(request_id, actor_id, role, SampleFlag::SentToLab)
    }

    fn update_flags(
        &self,
        request_id: &str,
        actor_id: &str,
        role: ActorRole,
        flag: SampleFlag,
    ) -> ApiResult<SampleRequest> {
        ensure_actor(actor_id)?;
        ensure_role(
            role,
            &[ActorRole::Warehouse, ActorRole::Lab, ActorRole::Admin],
            "更新取样状态",
        )?;

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;

        let mut request = SampleRequestRepository::find_by_id_with(&tx, request_id)?
            .ok_or_else(|| ApiError::NotFound(format!("SampleRequest(id={})不存在", request_id)))?;
        load_active_lot(&tx, &request.lot_id)?;

        let now = Utc::now();
        flag.apply(&mut request, now).map_err(ApiError::BusinessRuleViolation)?;

        SampleRequestRepository::update_flags_with(&tx, &request)?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(request.lot_id.clone()),
            flag.action_type(),
            actor_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&request);
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(
            lot_id = %request.lot_id,
            request_id = %request_id,
            collected = request.is_collected,
            sent = request.is_sent_to_lab,
            "取样状态已更新"
        );
        Ok(request)
    }

    pub fn list_for_lot(&self, lot_id: &str) -> ApiResult<Vec<SampleRequest>> {
        Ok(self.sample_repo.list_by_lot(lot_id)?)
    }
}
