// ==========================================
// 金属材料质检流转系统 - 流转配置读取 Trait
// ==========================================
// 职责: 定义流转引擎/API 所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use std::error::Error;

// ==========================================
// WorkflowConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）, DefaultWorkflowConfig（内置默认值）
pub trait WorkflowConfigReader: Send + Sync {
    /// 乐观锁冲突后的最大重新校验次数
    ///
    /// # 默认值
    /// - 3
    fn get_max_transition_retries(&self) -> Result<u32, Box<dyn Error>>;

    /// 是否将状态流转写入 action_log
    ///
    /// # 默认值
    /// - true
    fn get_audit_enabled(&self) -> Result<bool, Box<dyn Error>>;

    /// 是否发送部门通知
    ///
    /// # 默认值
    /// - true
    fn get_notifications_enabled(&self) -> Result<bool, Box<dyn Error>>;

    /// 申请修改时是否必须填写原因
    ///
    /// # 默认值
    /// - true
    fn get_edit_request_requires_comment(&self) -> Result<bool, Box<dyn Error>>;
}

/// 内置默认配置（无数据库场景/单元测试）
#[derive(Debug, Clone)]
pub struct DefaultWorkflowConfig {
    pub max_transition_retries: u32,
    pub audit_enabled: bool,
    pub notifications_enabled: bool,
    pub edit_request_requires_comment: bool,
}

impl Default for DefaultWorkflowConfig {
    fn default() -> Self {
        Self {
            max_transition_retries: 3,
            audit_enabled: true,
            notifications_enabled: true,
            edit_request_requires_comment: true,
        }
    }
}

impl WorkflowConfigReader for DefaultWorkflowConfig {
    fn get_max_transition_retries(&self) -> Result<u32, Box<dyn Error>> {
        Ok(self.max_transition_retries)
    }

    fn get_audit_enabled(&self) -> Result<bool, Box<dyn Error>> {
        Ok(self.audit_enabled)
    }

    fn get_notifications_enabled(&self) -> Result<bool, Box<dyn Error>> {
        Ok(self.notifications_enabled)
    }

    fn get_edit_request_requires_comment(&self) -> Result<bool, Box<dyn Error>> {
        Ok(self.edit_request_requires_comment)
    }
}
