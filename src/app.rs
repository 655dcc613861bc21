//! 应用程序组装和生命周期
//!
//! 负责把各个模块连接起来，包括：
//! - 加载用户设置
//! - 创建 GW2 API 客户端和游戏进程检测
//! - 创建三个控制器和任务追踪器视图模型
//! - 统一启动/停止控制器，退出时保存设置

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use crate::api::Gw2ApiClient;
use crate::controllers::{
    CommerceController, CommerceSource, PlayerTasksController, PositionSource, WvWController, WvWSource,
};
use crate::error::{CompanionError, Result};
use crate::event_bus::{AppEvent, EventBus};
use crate::settings::{SettingsPersistence, SettingsStore};
use crate::utils::{GameProcessMonitor, SysinfoGameMonitor};
use crate::viewmodels::{FileDialogService, TaskEditorDialog, TaskTrackerViewModel};

/// 事件总线容量
const EVENT_BUS_CAPACITY: usize = 256;

/// 外部协作者,由宿主程序提供
pub struct Collaborators {
    pub commerce_source: Arc<dyn CommerceSource>,
    pub wvw_source: Arc<dyn WvWSource>,
    pub position: Arc<dyn PositionSource>,
    pub game: Arc<dyn GameProcessMonitor>,
    pub file_dialogs: Arc<dyn FileDialogService>,
    pub task_editor: Arc<dyn TaskEditorDialog>,
}

/// 伴侣应用 - 持有所有控制器和共享状态
pub struct CompanionApp {
    settings: Arc<SettingsStore>,
    persistence: Arc<dyn SettingsPersistence>,
    event_bus: Arc<EventBus>,
    commerce: Arc<CommerceController>,
    wvw: Arc<WvWController>,
    tasks: Arc<PlayerTasksController>,
    task_tracker: Arc<TaskTrackerViewModel>,
}

impl CompanionApp {
    /// 用已经准备好的协作者组装应用
    pub fn new(
        settings: Arc<SettingsStore>,
        persistence: Arc<dyn SettingsPersistence>,
        event_bus: Arc<EventBus>,
        collaborators: Collaborators,
    ) -> Self {
        let commerce = Arc::new(CommerceController::new(
            collaborators.commerce_source,
            settings.clone(),
            event_bus.clone(),
        ));
        let wvw = Arc::new(WvWController::new(
            collaborators.wvw_source,
            collaborators.position.clone(),
            settings.clone(),
            event_bus.clone(),
        ));
        let tasks = Arc::new(PlayerTasksController::new(
            collaborators.position,
            collaborators.game,
            settings.clone(),
            event_bus.clone(),
        ));
        let task_tracker = Arc::new(TaskTrackerViewModel::new(
            tasks.clone(),
            collaborators.file_dialogs,
            collaborators.task_editor,
        ));

        Self {
            settings,
            persistence,
            event_bus,
            commerce,
            wvw,
            tasks,
            task_tracker,
        }
    }

    /// 生产环境的组装:加载设置,创建 API 客户端和进程检测
    pub async fn bootstrap(
        persistence: Arc<dyn SettingsPersistence>,
        position: Arc<dyn PositionSource>,
        file_dialogs: Arc<dyn FileDialogService>,
        task_editor: Arc<dyn TaskEditorDialog>,
    ) -> anyhow::Result<Self> {
        info!("初始化 GW2 覆盖层...");

        let settings = Arc::new(
            SettingsStore::load_from(persistence.as_ref())
                .await
                .context("加载用户设置失败")?,
        );
        let api_settings = settings.read(|s| s.api.clone());
        let api = Arc::new(Gw2ApiClient::new(&api_settings)?);
        info!("GW2 API 地址: {}", api.base_url());

        let collaborators = Collaborators {
            commerce_source: api.clone(),
            wvw_source: api,
            position,
            game: Arc::new(SysinfoGameMonitor::new()),
            file_dialogs,
            task_editor,
        };

        Ok(Self::new(
            settings,
            persistence,
            Arc::new(EventBus::new(EVENT_BUS_CAPACITY)),
            collaborators,
        ))
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn commerce(&self) -> &Arc<CommerceController> {
        &self.commerce
    }

    pub fn wvw(&self) -> &Arc<WvWController> {
        &self.wvw
    }

    pub fn tasks(&self) -> &Arc<PlayerTasksController> {
        &self.tasks
    }

    pub fn task_tracker(&self) -> &Arc<TaskTrackerViewModel> {
        &self.task_tracker
    }

    /// 启动全部控制器,返回本次新启动的数量
    pub fn start_all(&self) -> usize {
        let started = [self.commerce.start(), self.wvw.start(), self.tasks.start()]
            .into_iter()
            .filter(|started| *started)
            .count();
        info!("已启动 {} 个控制器", started);
        started
    }

    /// 停止全部控制器,返回本次停止的数量
    pub fn stop_all(&self) -> usize {
        let stopped = [self.commerce.stop(), self.wvw.stop(), self.tasks.stop()]
            .into_iter()
            .filter(|stopped| *stopped)
            .count();
        info!("已停止 {} 个控制器", stopped);
        stopped
    }

    /// 写入设置文件
    pub async fn save_settings(&self) -> Result<()> {
        self.settings
            .save_to(self.persistence.as_ref())
            .await
            .map_err(|e| CompanionError::Persistence(format!("{:#}", e)))?;
        self.event_bus.publish(AppEvent::SettingsSaved);
        Ok(())
    }

    /// 退出:停止控制器并保存设置
    pub async fn shutdown(&self) -> Result<()> {
        info!("正在关闭...");
        self.stop_all();
        if let Err(e) = self.save_settings().await {
            error!("退出时保存设置失败: {}", e);
            return Err(e);
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::offline_app;
    use super::*;
    use crate::event_bus::drain;
    use crate::models::PlayerTask;
    use crate::settings::{JsonSettingsFile, UserSettings};

    #[tokio::test]
    async fn test_start_and_stop_all() {
        let dir = tempfile::tempdir().unwrap();
        let app = offline_app(Arc::new(JsonSettingsFile::new(dir.path().join("settings.json"))));

        assert_eq!(app.start_all(), 3);
        // 重复启动不会产生第二个轮询
        assert_eq!(app.start_all(), 0);
        assert!(app.commerce().is_running());
        assert!(app.wvw().is_running());
        assert!(app.tasks().is_running());

        assert_eq!(app.stop_all(), 3);
        assert_eq!(app.stop_all(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_saves_settings() {
        let dir = tempfile::tempdir().unwrap();
        let file = Arc::new(JsonSettingsFile::new(dir.path().join("settings.json")));
        let app = offline_app(file.clone());
        let mut events = app.event_bus().subscribe();

        app.start_all();
        app.tasks()
            .add_or_update_task(PlayerTask::new("Daily vistas"))
            .unwrap();
        app.shutdown().await.unwrap();

        assert!(!app.tasks().is_running());
        let saved: UserSettings = file.load().await.unwrap();
        assert_eq!(saved.tasks.tasks.len(), 1);
        assert_eq!(saved.tasks.tasks[0].name, "Daily vistas");
        assert!(drain(&mut events).contains(&AppEvent::SettingsSaved));
    }
}
