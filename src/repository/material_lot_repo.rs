// ==========================================
// 金属材料质检流转系统 - 材料批次仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发控制: revision 乐观锁，所有写入 revision = revision + 1
// ==========================================

use crate::domain::material::{Dimensions, MaterialLot};
use crate::domain::types::{LotStatus, ShapeType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT lot_id, material_grade, shape, dimensions_json, quantity, unit,
           certificate_number, certificate_date, melt_number, no_melt_number,
           batch_number, supplier_id, created_by, status, edit_requested,
           edit_comment, is_deleted, revision, created_at, updated_at
    FROM material_lot
"#;

/// 状态写入内容（状态 + 依赖标记，一条 UPDATE 写入）
#[derive(Debug, Clone, PartialEq)]
pub struct StatusWrite {
    pub status: LotStatus,
    pub edit_requested: bool,
    pub edit_comment: Option<String>,
}

// ==========================================
// MaterialLotRepository - 材料批次仓储
// ==========================================
pub struct MaterialLotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialLotRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入新批次
    pub fn insert(&self, lot: &MaterialLot) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, lot)
    }

    /// 在调用方事务内插入新批次
    pub fn insert_with(conn: &Connection, lot: &MaterialLot) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT INTO material_lot (
                lot_id, material_grade, shape, dimensions_json, quantity, unit,
                certificate_number, certificate_date, melt_number, no_melt_number,
                batch_number, supplier_id, created_by, status, edit_requested,
                edit_comment, is_deleted, revision, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20
            )
            "#,
            params![
                lot.lot_id,
                lot.material_grade,
                lot.shape.as_str(),
                serde_json::to_string(&lot.dimensions)?,
                lot.quantity,
                lot.unit,
                lot.certificate_number,
                lot.certificate_date.format("%Y-%m-%d").to_string(),
                lot.melt_number,
                lot.no_melt_number as i32,
                lot.batch_number,
                lot.supplier_id,
                lot.created_by,
                lot.status.as_str(),
                lot.edit_requested as i32,
                lot.edit_comment,
                lot.is_deleted as i32,
                lot.revision,
                lot.created_at.to_rfc3339(),
                lot.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// 更新状态（带乐观锁检查）
    ///
    /// status / edit_requested / edit_comment 在同一条 UPDATE 中写入
    ///
    /// # 返回
    /// - Ok(new_revision)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision不匹配 (其他请求已更新)
    /// - `RepositoryError::NotFound`: lot_id不存在
    pub fn update_status(
        &self,
        lot_id: &str,
        expected_revision: i64,
        write: &StatusWrite,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::update_status_with(&conn, lot_id, expected_revision, write)
    }

    pub fn update_status_with(
        conn: &Connection,
        lot_id: &str,
        expected_revision: i64,
        write: &StatusWrite,
    ) -> RepositoryResult<i64> {
        let rows_affected = conn.execute(
            r#"UPDATE material_lot
               SET status = ?1, edit_requested = ?2, edit_comment = ?3,
                   updated_at = ?4, revision = revision + 1
               WHERE lot_id = ?5 AND revision = ?6 AND is_deleted = 0"#,
            params![
                write.status.as_str(),
                write.edit_requested as i32,
                write.edit_comment,
                Utc::now().to_rfc3339(),
                lot_id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            return Err(Self::classify_missed_write(conn, lot_id, expected_revision));
        }
        Ok(expected_revision + 1)
    }

    /// 更新非状态字段（带乐观锁检查）
    pub fn update_details_with(
        conn: &Connection,
        lot: &MaterialLot,
        expected_revision: i64,
    ) -> RepositoryResult<i64> {
        let rows_affected = conn.execute(
            r#"UPDATE material_lot
               SET material_grade = ?1, shape = ?2, dimensions_json = ?3,
                   quantity = ?4, unit = ?5, certificate_number = ?6,
                   certificate_date = ?7, melt_number = ?8, no_melt_number = ?9,
                   batch_number = ?10, supplier_id = ?11,
                   updated_at = ?12, revision = revision + 1
               WHERE lot_id = ?13 AND revision = ?14 AND is_deleted = 0"#,
            params![
                lot.material_grade,
                lot.shape.as_str(),
                serde_json::to_string(&lot.dimensions)?,
                lot.quantity,
                lot.unit,
                lot.certificate_number,
                lot.certificate_date.format("%Y-%m-%d").to_string(),
                lot.melt_number,
                lot.no_melt_number as i32,
                lot.batch_number,
                lot.supplier_id,
                Utc::now().to_rfc3339(),
                lot.lot_id,
                expected_revision,
            ],
        )?;

        if rows_affected == 0 {
            return Err(Self::classify_missed_write(conn, &lot.lot_id, expected_revision));
        }
        Ok(expected_revision + 1)
    }

    /// 软删除（带乐观锁检查）
    pub fn soft_delete_with(
        conn: &Connection,
        lot_id: &str,
        expected_revision: i64,
    ) -> RepositoryResult<i64> {
        let rows_affected = conn.execute(
            r#"UPDATE material_lot
               SET is_deleted = 1, updated_at = ?1, revision = revision + 1
               WHERE lot_id = ?2 AND revision = ?3 AND is_deleted = 0"#,
            params![Utc::now().to_rfc3339(), lot_id, expected_revision],
        )?;

        if rows_affected == 0 {
            return Err(Self::classify_missed_write(conn, lot_id, expected_revision));
        }
        Ok(expected_revision + 1)
    }

    /// 判断写入未命中是记录不存在还是revision冲突
    fn classify_missed_write(conn: &Connection, lot_id: &str, expected: i64) -> RepositoryError {
        let current: Result<(i64, i32), _> = conn.query_row(
            "SELECT revision, is_deleted FROM material_lot WHERE lot_id = ?1",
            params![lot_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );

        match current {
            Ok((_, deleted)) if deleted != 0 => RepositoryError::NotFound {
                entity: "MaterialLot".to_string(),
                id: lot_id.to_string(),
            },
            Ok((actual, _)) => RepositoryError::OptimisticLockFailure {
                lot_id: lot_id.to_string(),
                expected,
                actual,
            },
            Err(rusqlite::Error::QueryReturnedNoRows) => RepositoryError::NotFound {
                entity: "MaterialLot".to_string(),
                id: lot_id.to_string(),
            },
            Err(e) => e.into(),
        }
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 lot_id 查询（包含已软删除记录）
    pub fn find_by_id(&self, lot_id: &str) -> RepositoryResult<Option<MaterialLot>> {
        let conn = self.get_conn()?;
        Self::find_by_id_with(&conn, lot_id)
    }

    pub fn find_by_id_with(conn: &Connection, lot_id: &str) -> RepositoryResult<Option<MaterialLot>> {
        let sql = format!("{} WHERE lot_id = ?1", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![lot_id], Self::map_row) {
            Ok(lot) => Ok(Some(lot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询批次列表
    ///
    /// # 参数
    /// - status: 可选状态过滤
    /// - include_deleted: 是否包含已软删除批次
    pub fn list(
        &self,
        status: Option<LotStatus>,
        include_deleted: bool,
    ) -> RepositoryResult<Vec<MaterialLot>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "{} WHERE (?1 IS NULL OR status = ?1) AND (?2 = 1 OR is_deleted = 0) ORDER BY created_at, lot_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let lots = stmt
            .query_map(
                params![status.map(|s| s.as_str()), include_deleted as i32],
                Self::map_row,
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(lots)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn map_row(row: &Row) -> SqliteResult<MaterialLot> {
        let dimensions_json: String = row.get(3)?;
        let dimensions: Dimensions = serde_json::from_str(&dimensions_json)
            .map_err(|e| conversion_error(3, e.to_string()))?;

        let certificate_date_str: String = row.get(7)?;
        let certificate_date = NaiveDate::parse_from_str(&certificate_date_str, "%Y-%m-%d")
            .map_err(|e| conversion_error(7, e.to_string()))?;

        // 状态列可能含历史别名，解析时统一到规范名称
        let status_str: String = row.get(13)?;
        let status = LotStatus::from_str(&status_str)
            .ok_or_else(|| conversion_error(13, format!("未知批次状态: {}", status_str)))?;

        Ok(MaterialLot {
            lot_id: row.get(0)?,
            material_grade: row.get(1)?,
            shape: ShapeType::from_str(&row.get::<_, String>(2)?),
            dimensions,
            quantity: row.get(4)?,
            unit: row.get(5)?,
            certificate_number: row.get(6)?,
            certificate_date,
            melt_number: row.get(8)?,
            no_melt_number: row.get::<_, i32>(9)? != 0,
            batch_number: row.get(10)?,
            supplier_id: row.get(11)?,
            created_by: row.get(12)?,
            status,
            edit_requested: row.get::<_, i32>(14)? != 0,
            edit_comment: row.get(15)?,
            is_deleted: row.get::<_, i32>(16)? != 0,
            revision: row.get(17)?,
            created_at: parse_timestamp(18, &row.get::<_, String>(18)?)?,
            updated_at: parse_timestamp(19, &row.get::<_, String>(19)?)?,
        })
    }
}

/// 构造列转换错误
pub(crate) fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

/// 解析 RFC3339 时间戳
pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> SqliteResult<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| conversion_error(idx, e.to_string()))
}

/// 解析可空 RFC3339 时间戳
pub(crate) fn parse_optional_timestamp(
    idx: usize,
    raw: Option<String>,
) -> SqliteResult<Option<DateTime<Utc>>> {
    raw.map(|s| parse_timestamp(idx, &s)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::material::NewMaterialLot;

    fn setup() -> MaterialLotRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        MaterialLotRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn make_lot(lot_id: &str) -> MaterialLot {
        let input = NewMaterialLot {
            material_grade: "12X18H10T".to_string(),
            shape: ShapeType::Rod,
            dimensions: Dimensions {
                diameter_mm: Some(40.0),
                ..Default::default()
            },
            quantity: 120.0,
            unit: "kg".to_string(),
            certificate_number: "C-100".to_string(),
            certificate_date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            melt_number: None,
            no_melt_number: true,
            batch_number: Some("B-1".to_string()),
            supplier_id: "SUP-9".to_string(),
        };
        MaterialLot::from_new(lot_id.to_string(), input, "wh".to_string())
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup();
        let lot = make_lot("L1");
        repo.insert(&lot).unwrap();

        let found = repo.find_by_id("L1").unwrap().unwrap();
        assert_eq!(found.status, LotStatus::Received);
        assert_eq!(found.dimensions.diameter_mm, Some(40.0));
        assert_eq!(found.shape, ShapeType::Rod);
        assert!(found.no_melt_number);
        assert_eq!(found.revision, 0);

        assert!(repo.find_by_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_update_status_optimistic_lock() {
        let repo = setup();
        repo.insert(&make_lot("L1")).unwrap();

        let write = StatusWrite {
            status: LotStatus::PendingQc,
            edit_requested: false,
            edit_comment: None,
        };
        assert_eq!(repo.update_status("L1", 0, &write).unwrap(), 1);

        // 过期 revision → 乐观锁冲突
        let stale = repo.update_status("L1", 0, &write).unwrap_err();
        match stale {
            RepositoryError::OptimisticLockFailure { expected, actual, .. } => {
                assert_eq!(expected, 0);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let missing = repo.update_status("L404", 0, &write).unwrap_err();
        assert!(matches!(missing, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_legacy_status_read_as_canonical() {
        let repo = setup();
        repo.insert(&make_lot("L1")).unwrap();
        {
            let conn = repo.get_conn().unwrap();
            conn.execute(
                "UPDATE material_lot SET status = 'QC_CHECKED' WHERE lot_id = 'L1'",
                [],
            )
            .unwrap();
        }
        let lot = repo.find_by_id("L1").unwrap().unwrap();
        assert_eq!(lot.status, LotStatus::QcPassed);
    }

    #[test]
    fn test_list_filters_deleted_and_status() {
        let repo = setup();
        repo.insert(&make_lot("L1")).unwrap();
        repo.insert(&make_lot("L2")).unwrap();
        {
            let conn = repo.get_conn().unwrap();
            MaterialLotRepository::soft_delete_with(&conn, "L2", 0).unwrap();
        }

        assert_eq!(repo.list(None, false).unwrap().len(), 1);
        assert_eq!(repo.list(None, true).unwrap().len(), 2);
        assert_eq!(repo.list(Some(LotStatus::Received), false).unwrap().len(), 1);
        assert_eq!(repo.list(Some(LotStatus::PendingQc), false).unwrap().len(), 0);
    }
}
