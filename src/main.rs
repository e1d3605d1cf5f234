// ==========================================
// 金属材料质检流转系统 - 主入口
// ==========================================
// 职责: 初始化日志/数据库/配置，装配引擎与通知投递任务
// ==========================================

use std::sync::Arc;

use material_qc::app::{get_default_db_path, AppState};
use material_qc::notify::{spawn_notification_worker, LogNotificationDispatcher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统（MATERIAL_QC_LOG_JSON=1 时输出 JSON）
    if std::env::var("MATERIAL_QC_LOG_JSON").map(|v| v == "1").unwrap_or(false) {
        material_qc::logging::init_json();
    } else {
        material_qc::logging::init();
    }

    tracing::info!("==================================================");
    tracing::info!("{}", material_qc::APP_NAME);
    tracing::info!("系统版本: {}", material_qc::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let worker = state
        .take_notification_receiver()
        .map(|rx| spawn_notification_worker(rx, Arc::new(LogNotificationDispatcher)));

    tracing::info!(
        "配置快照: {}",
        state
            .config_manager
            .get_config_snapshot()
            .map_err(|e| anyhow::anyhow!("读取配置失败: {}", e))?
    );

    // 状态目录
    for info in state.workflow_api.status_catalogue() {
        tracing::info!(
            status = %info.status,
            terminal = info.is_terminal,
            testing = info.is_testing,
            "{}",
            info.description
        );
    }

    // 释放引擎（及其持有的通知发送端），等待投递任务排空
    drop(state);
    if let Some(handle) = worker {
        let delivered = handle.await?;
        tracing::info!(delivered, "通知投递任务已退出");
    }

    Ok(())
}
