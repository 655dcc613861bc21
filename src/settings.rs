use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CompanionError;
use crate::models::{PlayerTask, PriceWatch, SortDirection, Units, WvWMap};
use crate::utils::{get_settings_path, validate_refresh_interval};

/// 刷新间隔下限(毫秒)
pub const MIN_REFRESH_INTERVAL_MS: u64 = 250;
/// 刷新间隔上限(毫秒)
pub const MAX_REFRESH_INTERVAL_MS: u64 = 3_600_000;

/// 任务列表可用的排序属性
pub const TASK_SORT_NAME: &str = "name";
pub const TASK_SORT_DISTANCE: &str = "distance";

pub const DEFAULT_API_BASE_URL: &str = "https://api.guildwars2.com/v2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksUserData {
    pub tasks: Vec<PlayerTask>,
    pub completed_tasks: BTreeSet<Uuid>,
    pub sort_property: String,
    pub sort_direction: SortDirection,
    pub distance_units: Units,
    pub refresh_interval_ms: u64,
    /// 只显示当前地图上的任务
    pub hide_other_maps: bool,
    pub last_daily_reset: Option<DateTime<Utc>>,
}

impl Default for TasksUserData {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            completed_tasks: BTreeSet::new(),
            sort_property: TASK_SORT_NAME.to_string(),
            sort_direction: SortDirection::Ascending,
            distance_units: Units::Feet,
            refresh_interval_ms: 250,
            hide_other_maps: false,
            last_daily_reset: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonSettings {
    pub completed_paths: BTreeSet<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommerceUserData {
    pub price_watches: Vec<PriceWatch>,
    pub refresh_interval_ms: u64,
    pub notifications_enabled: bool,
}

impl Default for CommerceUserData {
    fn default() -> Self {
        Self {
            price_watches: Vec::new(),
            refresh_interval_ms: 30_000,
            notifications_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WvWUserData {
    pub world_id: Option<i32>,
    pub map_override: WvWMap,
    pub objectives_refresh_interval_ms: u64,
    pub notify_on_owner_change: bool,
}

impl Default for WvWUserData {
    fn default() -> Self {
        Self {
            world_id: None,
            map_override: WvWMap::Unknown,
            objectives_refresh_interval_ms: 2_000,
            notify_on_owner_change: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub use_system_proxy: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 30,
            use_system_proxy: true,
        }
    }
}

/// 全部用户设置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub tasks: TasksUserData,
    pub dungeons: DungeonSettings,
    pub commerce: CommerceUserData,
    pub wvw: WvWUserData,
    pub api: ApiSettings,
}

impl UserSettings {
    pub fn sanitize(&mut self) {
        let clamp = |ms: u64| ms.clamp(MIN_REFRESH_INTERVAL_MS, MAX_REFRESH_INTERVAL_MS);
        self.tasks.refresh_interval_ms = clamp(self.tasks.refresh_interval_ms);
        self.commerce.refresh_interval_ms = clamp(self.commerce.refresh_interval_ms);
        self.wvw.objectives_refresh_interval_ms = clamp(self.wvw.objectives_refresh_interval_ms);

        if self.tasks.sort_property != TASK_SORT_NAME && self.tasks.sort_property != TASK_SORT_DISTANCE {
            self.tasks.sort_property = TASK_SORT_NAME.to_string();
        }
        self.api.timeout_secs = self.api.timeout_secs.clamp(1, 300);
        if self.api.base_url.trim().is_empty() {
            self.api.base_url = DEFAULT_API_BASE_URL.to_string();
        }
    }
}

/// 部分更新,只应用 Some 的字段
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub distance_units: Option<Units>,
    pub task_sort_property: Option<String>,
    pub task_refresh_interval_ms: Option<u64>,
    pub commerce_refresh_interval_ms: Option<u64>,
    pub commerce_notifications_enabled: Option<bool>,
    pub wvw_world_id: Option<i32>,
    pub wvw_map_override: Option<WvWMap>,
    pub wvw_refresh_interval_ms: Option<u64>,
    pub wvw_notify_on_owner_change: Option<bool>,
}

/// 任务列表只能按名称或距离排序
pub fn validate_task_sort_property(property: &str) -> crate::error::Result<()> {
    if property != TASK_SORT_NAME && property != TASK_SORT_DISTANCE {
        return Err(CompanionError::Validation(format!("未知的排序属性: {}", property)));
    }
    Ok(())
}

/// 设置持久化(启动时加载,退出时保存)
#[async_trait]
pub trait SettingsPersistence: Send + Sync {
    async fn load(&self) -> Result<UserSettings>;
    async fn save(&self, settings: &UserSettings) -> Result<()>;
}

/// JSON 文件持久化
pub struct JsonSettingsFile {
    path: PathBuf,
}

impl JsonSettingsFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// 平台数据目录下的默认设置文件
    pub fn default_location() -> Self {
        Self::new(get_settings_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SettingsPersistence for JsonSettingsFile {
    async fn load(&self) -> Result<UserSettings> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("无法创建设置目录 {}", parent.display()))?;
        }

        let mut settings = match tokio::fs::read(&self.path).await {
            Ok(bytes) if !bytes.is_empty() => serde_json::from_slice::<UserSettings>(&bytes)
                .unwrap_or_else(|e| {
                    warn!("设置文件解析失败,使用默认设置 {}: {}", self.path.display(), e);
                    UserSettings::default()
                }),
            _ => {
                let default = UserSettings::default();
                self.save(&default).await?;
                default
            }
        };
        settings.sanitize();
        Ok(settings)
    }

    async fn save(&self, settings: &UserSettings) -> Result<()> {
        let mut normalized = settings.clone();
        normalized.sanitize();
        let json = serde_json::to_string_pretty(&normalized)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("无法写入 {}", self.path.display()))
    }
}

/// 进程内共享的用户设置
///
/// 读操作可并发,写操作串行
pub struct SettingsStore {
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(settings: UserSettings) -> Self {
        Self {
            data: RwLock::new(settings),
        }
    }

    pub async fn load_from(persistence: &dyn SettingsPersistence) -> Result<Self> {
        let settings = persistence.load().await?;
        info!("用户设置已加载");
        Ok(Self::new(settings))
    }

    pub async fn save_to(&self, persistence: &dyn SettingsPersistence) -> Result<()> {
        let snapshot = self.snapshot();
        persistence.save(&snapshot).await?;
        info!("用户设置已保存");
        Ok(())
    }

    pub fn read<R>(&self, f: impl FnOnce(&UserSettings) -> R) -> R {
        f(&self.read_guard())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut UserSettings) -> R) -> R {
        f(&mut self.write_guard())
    }

    pub fn snapshot(&self) -> UserSettings {
        self.read_guard().clone()
    }

    /// 应用部分更新;任一字段无效时整体拒绝,保留原值
    pub fn apply(&self, update: SettingsUpdate) -> crate::error::Result<()> {
        for interval in [
            update.task_refresh_interval_ms,
            update.commerce_refresh_interval_ms,
            update.wvw_refresh_interval_ms,
        ]
        .into_iter()
        .flatten()
        {
            validate_refresh_interval(interval)?;
        }
        if let Some(property) = &update.task_sort_property {
            validate_task_sort_property(property)?;
        }

        let mut config = self.write_guard();
        if let Some(units) = update.distance_units {
            config.tasks.distance_units = units;
        }
        if let Some(property) = update.task_sort_property {
            config.tasks.sort_property = property;
        }
        if let Some(interval) = update.task_refresh_interval_ms {
            config.tasks.refresh_interval_ms = interval;
        }
        if let Some(interval) = update.commerce_refresh_interval_ms {
            config.commerce.refresh_interval_ms = interval;
        }
        if let Some(enabled) = update.commerce_notifications_enabled {
            config.commerce.notifications_enabled = enabled;
        }
        if let Some(world_id) = update.wvw_world_id {
            config.wvw.world_id = Some(world_id);
        }
        if let Some(map) = update.wvw_map_override {
            config.wvw.map_override = map;
        }
        if let Some(interval) = update.wvw_refresh_interval_ms {
            config.wvw.objectives_refresh_interval_ms = interval;
        }
        if let Some(enabled) = update.wvw_notify_on_owner_change {
            config.wvw.notify_on_owner_change = enabled;
        }
        Ok(())
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(UserSettings::default())
    }
}
