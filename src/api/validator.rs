// ==========================================
// 金属材料质检流转系统 - API 操作校验
// ==========================================
// 职责: 角色权限、操作人、批次可用性等公共前置校验
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::material::MaterialLot;
use crate::domain::types::ActorRole;
use crate::repository::material_lot_repo::MaterialLotRepository;
use rusqlite::Connection;

/// 校验操作人非空
pub fn ensure_actor(actor_id: &str) -> ApiResult<()> {
    if actor_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
    }
    Ok(())
}

/// 校验角色是否在允许列表中
pub fn ensure_role(role: ActorRole, allowed: &[ActorRole], operation: &str) -> ApiResult<()> {
    if allowed.contains(&role) {
        return Ok(());
    }
    let allowed_names: Vec<&str> = allowed.iter().map(|r| r.as_str()).collect();
    Err(ApiError::Forbidden(format!(
        "角色 {} 不能执行「{}」（允许: {}）",
        role,
        operation,
        allowed_names.join("/")
    )))
}

/// 在调用方事务内加载未删除批次
pub fn load_active_lot(conn: &Connection, lot_id: &str) -> ApiResult<MaterialLot> {
    match MaterialLotRepository::find_by_id_with(conn, lot_id)? {
        Some(lot) if !lot.is_deleted => Ok(lot),
        _ => Err(ApiError::NotFound(format!("MaterialLot(id={})不存在", lot_id))),
    }
}
