// ==========================================
// 金属材料质检流转系统 - 取样申请仓储
// ==========================================

use crate::domain::sample::SampleRequest;
use crate::domain::types::TestKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::material_lot_repo::{
    conversion_error, parse_optional_timestamp, parse_timestamp,
};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT request_id, lot_id, requested_by, sample_size, sample_unit, test_kinds,
           cutting_location, is_collected, collected_at, is_sent_to_lab, sent_at, created_at
    FROM sample_request
"#;

pub struct SampleRequestRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SampleRequestRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert_with(conn: &Connection, request: &SampleRequest) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO sample_request (
                request_id, lot_id, requested_by, sample_size, sample_unit, test_kinds,
                cutting_location, is_collected, collected_at, is_sent_to_lab, sent_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                request.request_id,
                request.lot_id,
                request.requested_by,
                request.sample_size,
                request.sample_unit,
                encode_test_kinds(&request.test_kinds),
                request.cutting_location,
                request.is_collected as i32,
                request.collected_at.map(|t| t.to_rfc3339()),
                request.is_sent_to_lab as i32,
                request.sent_at.map(|t| t.to_rfc3339()),
                request.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 更新取样/送检标记
    pub fn update_flags_with(conn: &Connection, request: &SampleRequest) -> RepositoryResult<()> {
        let rows = conn.execute(
            r#"UPDATE sample_request
               SET is_collected = ?1, collected_at = ?2, is_sent_to_lab = ?3, sent_at = ?4
               WHERE request_id = ?5"#,
            params![
                request.is_collected as i32,
                request.collected_at.map(|t| t.to_rfc3339()),
                request.is_sent_to_lab as i32,
                request.sent_at.map(|t| t.to_rfc3339()),
                request.request_id,
            ],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "SampleRequest".to_string(),
                id: request.request_id.clone(),
            });
        }
        Ok(())
    }

    pub fn find_by_id(&self, request_id: &str) -> RepositoryResult<Option<SampleRequest>> {
        let conn = self.get_conn()?;
        Self::find_by_id_with(&conn, request_id)
    }

    pub fn find_by_id_with(
        conn: &Connection,
        request_id: &str,
    ) -> RepositoryResult<Option<SampleRequest>> {
        let sql = format!("{} WHERE request_id = ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![request_id], Self::map_row) {
            Ok(request) => Ok(Some(request)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_by_lot(&self, lot_id: &str) -> RepositoryResult<Vec<SampleRequest>> {
        let conn = self.get_conn()?;
        Self::list_by_lot_with(&conn, lot_id)
    }

    pub fn list_by_lot_with(conn: &Connection, lot_id: &str) -> RepositoryResult<Vec<SampleRequest>> {
        let sql = format!("{} WHERE lot_id = ?1 ORDER BY created_at, rowid", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let requests = stmt
            .query_map(params![lot_id], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(requests)
    }

    fn map_row(row: &Row) -> SqliteResult<SampleRequest> {
        let kinds_raw: String = row.get(5)?;
        let test_kinds = decode_test_kinds(&kinds_raw)
            .map_err(|e| conversion_error(5, e))?;

        Ok(SampleRequest {
            request_id: row.get(0)?,
            lot_id: row.get(1)?,
            requested_by: row.get(2)?,
            sample_size: row.get(3)?,
            sample_unit: row.get(4)?,
            test_kinds,
            cutting_location: row.get(6)?,
            is_collected: row.get::<_, i32>(7)? != 0,
            collected_at: parse_optional_timestamp(8, row.get(8)?)?,
            is_sent_to_lab: row.get::<_, i32>(9)? != 0,
            sent_at: parse_optional_timestamp(10, row.get(10)?)?,
            created_at: parse_timestamp(11, &row.get::<_, String>(11)?)?,
        })
    }
}

/// 试验类型以逗号分隔存储: "MECHANICAL,CHEMICAL"
fn encode_test_kinds(kinds: &[TestKind]) -> String {
    kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_test_kinds(raw: &str) -> Result<Vec<TestKind>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| TestKind::from_str(s).ok_or_else(|| format!("未知试验类型: {}", s)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_kinds_encoding() {
        let kinds = vec![TestKind::Mechanical, TestKind::Metallographic];
        let raw = encode_test_kinds(&kinds);
        assert_eq!(raw, "MECHANICAL,METALLOGRAPHIC");
        assert_eq!(decode_test_kinds(&raw).unwrap(), kinds);
        assert!(decode_test_kinds("MECHANICAL,XRAY").is_err());
    }
}
