// ==========================================
// 金属材料质检流转系统 - 操作日志数据仓储
// ==========================================
// 对齐: action_log 表
// 红线: 所有写入必须记录
// ==========================================


mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::ActionLogRepository;

/// action_ts 存储格式（微秒精度，保证同秒内排序稳定）
pub(crate) const ACTION_TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// action_ts 解析格式（兼容无小数秒的旧数据）
pub(crate) const ACTION_TS_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
