// ==========================================
// 金属材料质检流转系统 - 实验室试验仓储
// ==========================================
// 红线: is_passed 只能从 NULL 写入一次
// ==========================================

use crate::domain::lab_test::LabTest;
use crate::domain::types::TestKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::material_lot_repo::{
    conversion_error, parse_optional_timestamp, parse_timestamp,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT test_id, lot_id, sample_request_id, test_kind, test_reference,
           performed_by, results, is_passed, performed_at, completed_at
    FROM lab_test
"#;

pub struct LabTestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LabTestRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert_with(conn: &Connection, test: &LabTest) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO lab_test (
                test_id, lot_id, sample_request_id, test_kind, test_reference,
                performed_by, results, is_passed, performed_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                test.test_id,
                test.lot_id,
                test.sample_request_id,
                test.test_kind.as_str(),
                test.test_reference,
                test.performed_by,
                test.results,
                test.is_passed.map(|p| p as i32),
                test.performed_at.to_rfc3339(),
                test.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// 写入试验结论（条件更新: is_passed IS NULL）
    ///
    /// # 错误
    /// - `RepositoryError::NotFound`: test_id 不存在
    /// - `RepositoryError::BusinessRuleViolation`: 已有结论
    pub fn complete_with(
        conn: &Connection,
        test_id: &str,
        passed: bool,
        results: Option<&str>,
        completed_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE lab_test
               SET is_passed = ?1, results = ?2, completed_at = ?3
               WHERE test_id = ?4 AND is_passed IS NULL"#,
            params![passed as i32, results, completed_at.to_rfc3339(), test_id],
        )?;

        if rows == 0 {
            return match Self::find_by_id_with(conn, test_id)? {
                Some(existing) => Err(RepositoryError::BusinessRuleViolation(format!(
                    "试验 {} 已有结论(is_passed={:?})，不能重复录入",
                    test_id, existing.is_passed
                ))),
                None => Err(RepositoryError::NotFound {
                    entity: "LabTest".to_string(),
                    id: test_id.to_string(),
                }),
            };
        }
        Ok(())
    }

    pub fn find_by_id(&self, test_id: &str) -> RepositoryResult<Option<LabTest>> {
        let conn = self.get_conn()?;
        Self::find_by_id_with(&conn, test_id)
    }

    pub fn find_by_id_with(conn: &Connection, test_id: &str) -> RepositoryResult<Option<LabTest>> {
        let sql = format!("{} WHERE test_id = ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![test_id], Self::map_row) {
            Ok(test) => Ok(Some(test)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_by_lot(&self, lot_id: &str) -> RepositoryResult<Vec<LabTest>> {
        let conn = self.get_conn()?;
        Self::list_by_lot_with(&conn, lot_id)
    }

    pub fn list_by_lot_with(conn: &Connection, lot_id: &str) -> RepositoryResult<Vec<LabTest>> {
        let sql = format!("{} WHERE lot_id = ?1 ORDER BY performed_at, rowid", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let tests = stmt
            .query_map(params![lot_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(tests)
    }

    fn map_row(row: &Row) -> SqliteResult<LabTest> {
        let kind_raw: String = row.get(3)?;
        let test_kind = TestKind::from_str(&kind_raw)
            .ok_or_else(|| conversion_error(3, format!("未知试验类型: {}", kind_raw)))?;

        Ok(LabTest {
            test_id: row.get(0)?,
            lot_id: row.get(1)?,
            sample_request_id: row.get(2)?,
            test_kind,
            test_reference: row.get(4)?,
            performed_by: row.get(5)?,
            results: row.get(6)?,
            is_passed: row.get::<_, Option<i32>>(7)?.map(|v| v != 0),
            performed_at: parse_timestamp(8, &row.get::<_, String>(8)?)?,
            completed_at: parse_optional_timestamp(9, row.get(9)?)?,
        })
    }
}
