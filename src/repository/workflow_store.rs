// ==========================================
// 金属材料质检流转系统 - 流转引擎 SQLite 存储
// ==========================================
// 职责: 实现 engine::LotStore，聚合批次与关联实体仓储
// 并发: 流转在 BEGIN IMMEDIATE 事务内完成快照、判定与 revision 条件写入
// ==========================================

use crate::db::begin_write;
use crate::engine::error::TransitionError;
use crate::engine::guards::GuardFacts;
use crate::engine::store::{LotSnapshot, LotStore, TransitionCommit, TransitionDecision};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::inspection_repo::InspectionRepository;
use crate::repository::lab_test_repo::LabTestRepository;
use crate::repository::material_lot_repo::MaterialLotRepository;
use crate::repository::sample_request_repo::SampleRequestRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct SqliteLotStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLotStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在调用方连接/事务内加载快照
    pub fn load_snapshot_with(conn: &Connection, lot_id: &str) -> RepositoryResult<Option<LotSnapshot>> {
        let lot = match MaterialLotRepository::find_by_id_with(conn, lot_id)? {
            Some(lot) => lot,
            None => return Ok(None),
        };

        let facts = GuardFacts {
            active_inspection: InspectionRepository::find_active_by_lot_with(conn, lot_id)?,
            lab_tests: LabTestRepository::list_by_lot_with(conn, lot_id)?,
            sample_requests: SampleRequestRepository::list_by_lot_with(conn, lot_id)?,
        };

        Ok(Some(LotSnapshot { lot, facts }))
    }
}

impl LotStore for SqliteLotStore {
    fn load_snapshot(&self, lot_id: &str) -> RepositoryResult<Option<LotSnapshot>> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let snapshot = Self::load_snapshot_with(&tx, lot_id)?;
        tx.commit()?;
        Ok(snapshot)
    }

    fn apply_transition(
        &self,
        lot_id: &str,
        decide: &mut TransitionDecision<'_>,
    ) -> Result<TransitionCommit, TransitionError> {
        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn).map_err(RepositoryError::from)?;

        let snapshot = match Self::load_snapshot_with(&tx, lot_id)? {
            Some(snapshot) => snapshot,
            None => return Ok(TransitionCommit::Missing),
        };

        // 判定失败时 tx 随 drop 回滚
        let write = match decide(&snapshot)? {
            Some(write) => write,
            None => return Ok(TransitionCommit::Skipped(snapshot.lot)),
        };

        let revision =
            MaterialLotRepository::update_status_with(&tx, lot_id, snapshot.lot.revision, &write)?;
        tx.commit().map_err(RepositoryError::from)?;

        Ok(TransitionCommit::Written {
            previous: snapshot.lot,
            revision,
        })
    }
}
