// ==========================================
// 金属材料质检流转系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::workflow_config_trait::WorkflowConfigReader;
use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(key = %key, value = %value, "配置已更新");
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn get_bool_or_default(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_or_default(key, if default { "true" } else { "false" })?;
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => {
                tracing::warn!(key = %key, value = %other, "配置值无法解析为布尔值，使用默认值");
                Ok(default)
            }
        }
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// WorkflowConfigReader 实现
// ==========================================
impl WorkflowConfigReader for ConfigManager {
    fn get_max_transition_retries(&self) -> Result<u32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::MAX_TRANSITION_RETRIES, "3")?;
        Ok(value.trim().parse::<u32>().unwrap_or(3))
    }

    fn get_audit_enabled(&self) -> Result<bool, Box<dyn Error>> {
        self.get_bool_or_default(config_keys::AUDIT_ENABLED, true)
    }

    fn get_notifications_enabled(&self) -> Result<bool, Box<dyn Error>> {
        self.get_bool_or_default(config_keys::NOTIFICATIONS_ENABLED, true)
    }

    fn get_edit_request_requires_comment(&self) -> Result<bool, Box<dyn Error>> {
        self.get_bool_or_default(config_keys::EDIT_REQUEST_REQUIRES_COMMENT, true)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const MAX_TRANSITION_RETRIES: &str = "workflow.max_transition_retries";
    pub const AUDIT_ENABLED: &str = "workflow.audit_enabled";
    pub const NOTIFICATIONS_ENABLED: &str = "workflow.notifications_enabled";
    pub const EDIT_REQUEST_REQUIRES_COMMENT: &str = "workflow.edit_request_requires_comment";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_missing() {
        let config = setup();
        assert_eq!(config.get_max_transition_retries().unwrap(), 3);
        assert!(config.get_audit_enabled().unwrap());
        assert!(config.get_notifications_enabled().unwrap());
        assert!(config.get_edit_request_requires_comment().unwrap());
    }

    #[test]
    fn test_override_and_snapshot() {
        let config = setup();
        config
            .set_global_config_value(config_keys::MAX_TRANSITION_RETRIES, "5")
            .unwrap();
        config
            .set_global_config_value(config_keys::AUDIT_ENABLED, "off")
            .unwrap();

        assert_eq!(config.get_max_transition_retries().unwrap(), 5);
        assert!(!config.get_audit_enabled().unwrap());

        let snapshot: HashMap<String, String> =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.get("workflow.max_transition_retries").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = setup();
        config
            .set_global_config_value(config_keys::MAX_TRANSITION_RETRIES, "many")
            .unwrap();
        config
            .set_global_config_value(config_keys::NOTIFICATIONS_ENABLED, "maybe")
            .unwrap();
        assert_eq!(config.get_max_transition_retries().unwrap(), 3);
        assert!(config.get_notifications_enabled().unwrap());
    }
}
