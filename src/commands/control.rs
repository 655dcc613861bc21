//! 控制器控制命令
//!
//! 提供控制器状态查询和启停接口，包括：
//! - 控制器状态查询
//! - 全部启动/停止
//! - 价格通知和 WvW 通知的关闭

use serde::Serialize;
use tracing::info;

use crate::app::CompanionApp;
use crate::models::PriceLimitKind;

/// 单个控制器的运行状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerStatus {
    pub name: &'static str,
    pub running: bool,
    pub refresh_interval_ms: u64,
}

/// 获取全部控制器状态
pub fn get_controller_status(app: &CompanionApp) -> Vec<ControllerStatus> {
    vec![
        ControllerStatus {
            name: "commerce",
            running: app.commerce().is_running(),
            refresh_interval_ms: app.commerce().refresh_interval(),
        },
        ControllerStatus {
            name: "wvw",
            running: app.wvw().is_running(),
            refresh_interval_ms: app.wvw().objectives_refresh_interval(),
        },
        ControllerStatus {
            name: "player_tasks",
            running: app.tasks().is_running(),
            refresh_interval_ms: app.tasks().refresh_interval(),
        },
    ]
}

/// 切换轮询状态(暂停/恢复)
pub fn toggle_polling(app: &CompanionApp, enabled: bool) -> Result<usize, String> {
    if enabled {
        info!("恢复轮询");
        Ok(app.start_all())
    } else {
        info!("暂停轮询");
        Ok(app.stop_all())
    }
}

/// 关闭一条价格通知
pub fn dismiss_price_notification(
    app: &CompanionApp,
    item_id: i32,
    kind: PriceLimitKind,
) -> Result<bool, String> {
    Ok(app.commerce().dismiss_notification((item_id, kind)))
}

/// 关闭一条目标点易主通知
pub fn dismiss_wvw_notification(app: &CompanionApp, objective_id: &str) -> Result<bool, String> {
    if objective_id.trim().is_empty() {
        return Err("目标点 ID 不能为空".to_string());
    }
    Ok(app.wvw().dismiss_notification(objective_id))
}
