// ==========================================
// 金属材料质检流转系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::api::{InspectionApi, LabTestApi, LotApi, SampleApi, WorkflowApi};
use crate::config::config_manager::ConfigManager;
use crate::config::workflow_config_trait::WorkflowConfigReader;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{CompositeEventSink, LotStore, TransitionEngine};
use crate::notify::Notification;
use crate::repository::{
    ActionLogRepository, InspectionRepository, LabTestRepository, MaterialLotRepository,
    SampleRequestRepository, SqliteLotStore,
};
use crate::sinks::{AuditLogSink, NotificationSink};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 批次API
    pub lot_api: Arc<LotApi>,

    /// 质检API
    pub inspection_api: Arc<InspectionApi>,

    /// 取样API
    pub sample_api: Arc<SampleApi>,

    /// 实验室试验API
    pub lab_test_api: Arc<LabTestApi>,

    /// 流转API
    pub workflow_api: Arc<WorkflowApi>,

    /// 流转引擎
    pub engine: Arc<TransitionEngine>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,

    /// 通知队列接收端（由入口程序取走并启动投递任务）
    notification_rx: Mutex<Option<UnboundedReceiver<Notification>>>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化表结构
    /// 2. 初始化所有Repository
    /// 3. 按配置组装事件接收器与流转引擎
    /// 4. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        Self::from_connection(db_path, conn)
    }

    /// 从已打开的连接创建（测试可使用内存数据库）
    pub fn from_connection(db_path: String, conn: Connection) -> Result<Self, String> {
        init_schema(&conn).map_err(|e| format!("数据库初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let lot_repo = Arc::new(MaterialLotRepository::new(conn.clone()));
        let inspection_repo = Arc::new(InspectionRepository::new(conn.clone()));
        let sample_repo = Arc::new(SampleRequestRepository::new(conn.clone()));
        let lab_test_repo = Arc::new(LabTestRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 事件接收器
        // ==========================================
        let mut sinks = CompositeEventSink::new();

        let audit_enabled = config_manager.get_audit_enabled().unwrap_or_else(|e| {
            tracing::warn!("读取 audit_enabled 失败，使用默认值: {}", e);
            true
        });
        if audit_enabled {
            sinks.push(Arc::new(AuditLogSink::new(action_log_repo.clone())));
        }

        let notifications_enabled = config_manager.get_notifications_enabled().unwrap_or_else(|e| {
            tracing::warn!("读取 notifications_enabled 失败，使用默认值: {}", e);
            true
        });
        let notification_rx = if notifications_enabled {
            let (tx, rx) = mpsc::unbounded_channel();
            sinks.push(Arc::new(NotificationSink::new(tx)));
            Some(rx)
        } else {
            None
        };

        tracing::info!(
            audit_enabled,
            notifications_enabled,
            sink_count = sinks.len(),
            "事件接收器已装配"
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let store: Arc<dyn LotStore> = Arc::new(SqliteLotStore::new(conn.clone()));
        let engine = Arc::new(
            TransitionEngine::from_config(store, config_manager.as_ref()).with_sink(Arc::new(sinks)),
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let lot_api = Arc::new(LotApi::new(conn.clone(), lot_repo, engine.clone()));
        let inspection_api = Arc::new(InspectionApi::new(conn.clone(), inspection_repo));
        let sample_api = Arc::new(SampleApi::new(conn.clone(), sample_repo));
        let lab_test_api = Arc::new(LabTestApi::new(conn, lab_test_repo));
        let workflow_api = Arc::new(WorkflowApi::new(engine.clone(), action_log_repo.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            lot_api,
            inspection_api,
            sample_api,
            lab_test_api,
            workflow_api,
            engine,
            config_manager,
            action_log_repo,
            notification_rx: Mutex::new(notification_rx),
        })
    }

    /// 取走通知队列接收端（只能取一次; 通知关闭时为 None）
    pub fn take_notification_receiver(&self) -> Option<UnboundedReceiver<Notification>> {
        self.notification_rx
            .lock()
            .ok()
            .and_then(|mut guard| guard.take())
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 MATERIAL_QC_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("MATERIAL_QC_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./material_qc.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("material-qc-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("material-qc");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("material_qc.db");
    }

    path.to_string_lossy().to_string()
}
