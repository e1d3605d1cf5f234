// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

#![allow(dead_code)]

use chrono::NaiveDate;
use material_qc::app::AppState;
use material_qc::db::{init_schema, open_sqlite_connection};
use material_qc::domain::material::{Dimensions, MaterialLot, NewMaterialLot};
use material_qc::domain::types::{LotStatus, ShapeType};
use material_qc::repository::material_lot_repo::{MaterialLotRepository, StatusWrite};
use rusqlite::Connection;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开共享连接
pub fn open_shared(db_path: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_sqlite_connection(db_path).unwrap()))
}

/// 基于临时数据库创建完整应用状态
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    (temp_file, state)
}

/// 板材入库登记样例
pub fn sheet_lot_input() -> NewMaterialLot {
    NewMaterialLot {
        material_grade: "09G2S".to_string(),
        shape: ShapeType::Sheet,
        dimensions: Dimensions {
            thickness_mm: Some(12.0),
            width_mm: Some(1500.0),
            length_mm: Some(6000.0),
            ..Default::default()
        },
        quantity: 4.2,
        unit: "t".to_string(),
        certificate_number: "CERT-2026-0117".to_string(),
        certificate_date: NaiveDate::from_ymd_opt(2026, 1, 17).unwrap(),
        melt_number: Some("M-33871".to_string()),
        no_melt_number: false,
        batch_number: Some("B-12".to_string()),
        supplier_id: "SUP-SEVERSTAL".to_string(),
    }
}

/// 直接写入一个批次（状态 RECEIVED），返回 lot_id
pub fn seed_lot(conn: &Arc<Mutex<Connection>>, lot_id: &str) -> String {
    let lot = MaterialLot::from_new(lot_id.to_string(), sheet_lot_input(), "wh_user".to_string());
    let guard = conn.lock().unwrap();
    MaterialLotRepository::insert_with(&guard, &lot).unwrap();
    lot.lot_id
}

/// 绕过引擎强制设置批次状态（构造测试前置条件）
pub fn force_status(conn: &Arc<Mutex<Connection>>, lot_id: &str, status: LotStatus) {
    let guard = conn.lock().unwrap();
    let lot = MaterialLotRepository::find_by_id_with(&guard, lot_id)
        .unwrap()
        .unwrap();
    MaterialLotRepository::update_status_with(
        &guard,
        lot_id,
        lot.revision,
        &StatusWrite {
            status,
            edit_requested: lot.edit_requested,
            edit_comment: lot.edit_comment.clone(),
        },
    )
    .unwrap();
}

/// 读取批次
pub fn load_lot(conn: &Arc<Mutex<Connection>>, lot_id: &str) -> MaterialLot {
    let guard = conn.lock().unwrap();
    MaterialLotRepository::find_by_id_with(&guard, lot_id)
        .unwrap()
        .unwrap()
}
