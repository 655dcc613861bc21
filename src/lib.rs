// GW2 覆盖层伴侣 - 核心库
//
// 后台控制器定期刷新数据,维护可观察集合;视图模型提供排序/过滤视图和命令;
// 设置统一保存在 SettingsStore 中,退出时写回磁盘

// 声明模块
pub mod api;
pub mod app;
pub mod commands;
pub mod controllers;
pub mod error;
pub mod event_bus;
pub mod logger;
pub mod models;
pub mod observable;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod viewmodels;

// 重新导出常用类型
pub use app::{Collaborators, CompanionApp};
pub use error::{CompanionError, Result};
pub use event_bus::{AppEvent, EventBus, NoticeLevel};
pub use settings::{JsonSettingsFile, SettingsPersistence, SettingsStore, SettingsUpdate, UserSettings};
