// ==========================================
// 金属材料质检流转系统 - 实验室试验 API
// ==========================================
// 职责: 登记试验、录入试验结论
// 红线: 结论 is_passed 只能从空写入一次
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
use crate::domain::lab_test::{LabTest, NewLabTest};
use crate::domain::types::ActorRole;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::lab_test_repo::LabTestRepository;
use crate::repository::sample_request_repo::SampleRequestRepository;

pub struct LabTestApi {
    conn: Arc<Mutex<Connection>>,
    lab_test_repo: Arc<LabTestRepository>,
}

impl LabTestApi {
    pub fn new(conn: Arc<Mutex<Connection>>, lab_test_repo: Arc<LabTestRepository>) -> Self {
        Self {
            conn,
            lab_test_repo,
        }
    }

    fn get_conn(&self) -> ApiResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    /// 登记试验
    ///
    /// # 规则
    /// - LAB / ADMIN
    /// - 批次处于实验室检验超状态
    /// - 指定取样申请时，必须属于同一批次
    pub fn create_lab_test(
        &self,
        lot_id: &str,
        input: NewLabTest,
        actor_id: &str,
        role: ActorRole,
    ) -> ApiResult<LabTest> {
        ensure_actor(actor_id)?;
        ensure_role(role, &[ActorRole::Lab, ActorRole::Admin], "登记试验")?;

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;
        let lot = load_active_lot(&tx, lot_id)?;

        if !lot.status.is_testing() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前状态为 {}，不在实验室检验流程中，不能登记试验",
                lot_id, lot.status
            )));
        }

        if let Some(request_id) = &input.sample_request_id {
            match SampleRequestRepository::find_by_id_with(&tx, request_id)? {
                Some(request) if request.lot_id == lot_id => {}
                Some(_) => {
                    return Err(ApiError::InvalidInput(format!(
                        "取样申请 {} 不属于批次 {}",
                        request_id, lot_id
                    )))
                }
                None => {
                    return Err(ApiError::NotFound(format!(
                        "SampleRequest(id={})不存在",
                        request_id
                    )))
                }
            }
        }

        let test = LabTest {
            test_id: Uuid::new_v4().to_string(),
            lot_id: lot_id.to_string(),
            sample_request_id: input.sample_request_id,
            test_kind: input.test_kind,
            test_reference: input.test_reference,
            performed_by: actor_id.to_string(),
            results: None,
            is_passed: None,
            performed_at: Utc::now(),
            completed_at: None,
        };
        LabTestRepository::insert_with(&tx, &test)?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(lot_id.to_string()),
            ActionType::CreateLabTest,
            actor_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&test);
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(lot_id = %lot_id, test_id = %test.test_id, kind = %test.test_kind, "试验已登记");
        Ok(test)
    }

    /// 录入试验结论
    ///
    /// # 权限
    /// - LAB / ADMIN
    pub fn complete_lab_test(
        &self,
        test_id: &str,
        passed: bool,
        results: Option<String>,
        actor_id: &str,
        role: ActorRole,
    ) -> ApiResult<LabTest> {
        ensure_actor(actor_id)?;
        ensure_role(role, &[ActorRole::Lab, ActorRole::Admin], "录入试验结论")?;

        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;

        let mut test = LabTestRepository::find_by_id_with(&tx, test_id)?
            .ok_or_else(|| ApiError::NotFound(format!("LabTest(id={})不存在", test_id)))?;
        load_active_lot(&tx, &test.lot_id)?;

        let completed_at = Utc::now();
        test.complete(passed, results, completed_at)
            .map_err(ApiError::BusinessRuleViolation)?;
        LabTestRepository::complete_with(&tx, test_id, passed, test.results.as_deref(), completed_at)?;

        let log = ActionLog::new(
            Uuid::new_v4().to_string(),
            Some(test.lot_id.clone()),
            ActionType::CompleteLabTest,
            actor_id.to_string(),
        )
        .with_role(role.as_str())
        .with_payload(&test)
        .with_detail(if passed { "试验合格" } else { "试验不合格" });
        ActionLogRepository::insert_with(&tx, &log)?;
        tx.commit()?;

        info!(lot_id = %test.lot_id, test_id = %test_id, passed, "试验结论已录入");
        Ok(test)
    }

    pub fn list_for_lot(&self, lot_id: &str) -> ApiResult<Vec<LabTest>> {
        Ok(self.lab_test_repo.list_by_lot(lot_id)?)
    }
}
