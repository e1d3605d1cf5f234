// ==========================================
// 金属材料质检流转系统 - 质检记录仓储
// ==========================================
// 红线: 同一批次最多一条有效记录（is_deleted = 0）
// ==========================================

use crate::db::begin_write;
use crate::domain::inspection::InspectionRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::material_lot_repo::{conversion_error, parse_timestamp};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT inspection_id, lot_id, inspector_id, criteria_json, defects_json,
           chemical_json, notes, requires_lab_verification, is_deleted, created_at
    FROM inspection_record
"#;

pub struct InspectionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InspectionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入新记录并使旧的有效记录失效
    ///
    /// 调用方负责事务边界（两条语句必须同一事务提交）
    ///
    /// # 返回
    /// - Ok(usize): 被取代的旧记录数量
    pub fn insert_superseding_with(
        conn: &Connection,
        record: &InspectionRecord,
    ) -> RepositoryResult<usize> {
        let superseded = conn.execute(
            "UPDATE inspection_record SET is_deleted = 1 WHERE lot_id = ?1 AND is_deleted = 0",
            params![record.lot_id],
        )?;

        conn.execute(
            r#"
            INSERT INTO inspection_record (
                inspection_id, lot_id, inspector_id, criteria_json, defects_json,
                chemical_json, notes, requires_lab_verification, is_deleted, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)
            "#,
            params![
                record.inspection_id,
                record.lot_id,
                record.inspector_id,
                serde_json::to_string(&record.criteria)?,
                serde_json::to_string(&record.defects)?,
                serde_json::to_string(&record.chemical_composition)?,
                record.notes,
                record.requires_lab_verification as i32,
                record.created_at.to_rfc3339(),
            ],
        )?;

        Ok(superseded)
    }

    /// 写入新记录（自带事务）
    pub fn insert_superseding(&self, record: &InspectionRecord) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = begin_write(&mut conn)?;
        let superseded = Self::insert_superseding_with(&tx, record)?;
        tx.commit()?;
        Ok(superseded)
    }

    /// 查询批次当前有效记录
    pub fn find_active_by_lot(&self, lot_id: &str) -> RepositoryResult<Option<InspectionRecord>> {
        let conn = self.get_conn()?;
        Self::find_active_by_lot_with(&conn, lot_id)
    }

    pub fn find_active_by_lot_with(
        conn: &Connection,
        lot_id: &str,
    ) -> RepositoryResult<Option<InspectionRecord>> {
        let sql = format!(
            "{} WHERE lot_id = ?1 AND is_deleted = 0 ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![lot_id], Self::map_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询批次全部记录（含已取代，时间正序）
    pub fn list_by_lot(&self, lot_id: &str) -> RepositoryResult<Vec<InspectionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE lot_id = ?1 ORDER BY created_at, rowid", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(params![lot_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }

    fn map_row(row: &Row) -> SqliteResult<InspectionRecord> {
        let criteria_json: String = row.get(3)?;
        let defects_json: String = row.get(4)?;
        let chemical_json: String = row.get(5)?;

        Ok(InspectionRecord {
            inspection_id: row.get(0)?,
            lot_id: row.get(1)?,
            inspector_id: row.get(2)?,
            criteria: serde_json::from_str(&criteria_json)
                .map_err(|e| conversion_error(3, e.to_string()))?,
            defects: serde_json::from_str(&defects_json)
                .map_err(|e| conversion_error(4, e.to_string()))?,
            chemical_composition: serde_json::from_str(&chemical_json)
                .map_err(|e| conversion_error(5, e.to_string()))?,
            notes: row.get(6)?,
            requires_lab_verification: row.get::<_, i32>(7)? != 0,
            is_deleted: row.get::<_, i32>(8)? != 0,
            created_at: parse_timestamp(9, &row.get::<_, String>(9)?)?,
        })
    }
}
