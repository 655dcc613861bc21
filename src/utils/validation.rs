//! 输入验证工具函数
//!
//! 校验失败返回 `CompanionError::Validation`,调用方保留原值

use crate::error::{CompanionError, Result};
use crate::settings::{MAX_REFRESH_INTERVAL_MS, MIN_REFRESH_INTERVAL_MS};

/// 验证刷新间隔(毫秒)
pub fn validate_refresh_interval(interval_ms: u64) -> Result<u64> {
    if !(MIN_REFRESH_INTERVAL_MS..=MAX_REFRESH_INTERVAL_MS).contains(&interval_ms) {
        return Err(CompanionError::Validation(format!(
            "刷新间隔必须在 {} 到 {} 毫秒之间: {}",
            MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS, interval_ms
        )));
    }
    Ok(interval_ms)
}

/// 验证任务名称
pub fn validate_task_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CompanionError::Validation("任务名称不能为空".to_string()));
    }
    Ok(())
}

/// 验证金币奖励
pub fn validate_reward(reward: f64) -> Result<()> {
    if !reward.is_finite() || reward < 0.0 {
        return Err(CompanionError::Validation(format!("无效的奖励数值: {}", reward)));
    }
    Ok(())
}
