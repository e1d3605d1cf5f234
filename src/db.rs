// ==========================================
// 金属材料质检流转系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表（幂等），不做迁移
// ==========================================

use rusqlite::OptionalExtension;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 开启写事务（BEGIN IMMEDIATE）
///
/// 开启即持有写锁: 事务内的读取校验与写入之间，其他连接不能写入
pub fn begin_write(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

/// 初始化 schema（CREATE TABLE IF NOT EXISTS，幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS material_lot (
            lot_id TEXT PRIMARY KEY,
            material_grade TEXT NOT NULL,
            shape TEXT NOT NULL,
            dimensions_json TEXT NOT NULL,
            quantity REAL NOT NULL,
            unit TEXT NOT NULL,
            certificate_number TEXT NOT NULL,
            certificate_date TEXT NOT NULL,
            melt_number TEXT,
            no_melt_number INTEGER NOT NULL DEFAULT 0,
            batch_number TEXT,
            supplier_id TEXT NOT NULL,
            created_by TEXT NOT NULL,
            status TEXT NOT NULL,
            edit_requested INTEGER NOT NULL DEFAULT 0,
            edit_comment TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            revision INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_material_lot_status ON material_lot(status);

        CREATE TABLE IF NOT EXISTS inspection_record (
            inspection_id TEXT PRIMARY KEY,
            lot_id TEXT NOT NULL REFERENCES material_lot(lot_id),
            inspector_id TEXT NOT NULL,
            criteria_json TEXT NOT NULL,
            defects_json TEXT NOT NULL,
            chemical_json TEXT NOT NULL,
            notes TEXT,
            requires_lab_verification INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_inspection_lot ON inspection_record(lot_id);
        -- 每个批次最多一条有效质检记录
        CREATE UNIQUE INDEX IF NOT EXISTS uq_inspection_active_lot
            ON inspection_record(lot_id) WHERE is_deleted = 0;

        CREATE TABLE IF NOT EXISTS sample_request (
            request_id TEXT PRIMARY KEY,
            lot_id TEXT NOT NULL REFERENCES material_lot(lot_id),
            requested_by TEXT NOT NULL,
            sample_size REAL NOT NULL,
            sample_unit TEXT NOT NULL,
            test_kinds TEXT NOT NULL,
            cutting_location TEXT,
            is_collected INTEGER NOT NULL DEFAULT 0,
            collected_at TEXT,
            is_sent_to_lab INTEGER NOT NULL DEFAULT 0,
            sent_at TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sample_request_lot ON sample_request(lot_id);

        CREATE TABLE IF NOT EXISTS lab_test (
            test_id TEXT PRIMARY KEY,
            lot_id TEXT NOT NULL REFERENCES material_lot(lot_id),
            sample_request_id TEXT REFERENCES sample_request(request_id),
            test_kind TEXT NOT NULL,
            test_reference TEXT,
            performed_by TEXT NOT NULL,
            results TEXT,
            is_passed INTEGER,
            performed_at TEXT NOT NULL,
            completed_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_lab_test_lot ON lab_test(lot_id);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            lot_id TEXT,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            actor_role TEXT,
            payload_json TEXT,
            detail TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_action_log_lot ON action_log(lot_id);
        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
