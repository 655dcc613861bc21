//! 设置管理命令
//!
//! 提供用户设置的读取和更新接口，包括：
//! - 设置的获取和部分更新
//! - 价格监视的添加和删除
//! - 设置保存

use tracing::info;

use crate::app::CompanionApp;
use crate::models::PriceWatch;
use crate::settings::{validate_task_sort_property, SettingsUpdate, UserSettings};

/// 获取用户设置
pub fn get_settings(app: &CompanionApp) -> Result<UserSettings, String> {
    Ok(app.settings().snapshot())
}

/// 更新设置;任一字段无效时整体拒绝
pub fn update_settings(app: &CompanionApp, update: SettingsUpdate) -> Result<UserSettings, String> {
    // 排序和单位交给任务追踪器,由它更新视图并发出选择属性通知
    let mut rest = update.clone();
    let sort_property = rest.task_sort_property.take();
    let distance_units = rest.distance_units.take();
    if let Some(property) = &sort_property {
        validate_task_sort_property(property).map_err(|e| e.to_string())?;
    }
    app.settings().apply(rest).map_err(|e| e.to_string())?;

    if let Some(property) = sort_property {
        app.task_tracker()
            .set_sort_property(&property)
            .map_err(|e| e.to_string())?;
    }
    if let Some(units) = distance_units {
        app.task_tracker().set_distance_units(units);
    }

    // 刷新间隔需要同步给正在运行的轮询
    if let Some(interval) = update.task_refresh_interval_ms {
        app.tasks().set_refresh_interval(interval).map_err(|e| e.to_string())?;
        info!("任务刷新间隔更新为: {}ms", interval);
    }
    if let Some(interval) = update.commerce_refresh_interval_ms {
        app.commerce().set_refresh_interval(interval).map_err(|e| e.to_string())?;
        info!("价格刷新间隔更新为: {}ms", interval);
    }
    if let Some(interval) = update.wvw_refresh_interval_ms {
        app.wvw()
            .set_objectives_refresh_interval(interval)
            .map_err(|e| e.to_string())?;
        info!("WvW 刷新间隔更新为: {}ms", interval);
    }

    // 地图覆盖需要立即重新筛选当前目标点
    if let Some(map) = update.wvw_map_override {
        app.wvw().set_map_override(map);
    }

    Ok(app.settings().snapshot())
}

/// 添加或修改价格监视
pub fn add_price_watch(app: &CompanionApp, watch: PriceWatch) -> Result<(), String> {
    app.commerce().add_price_watch(watch).map_err(|e| e.to_string())
}

/// 删除价格监视
pub fn remove_price_watch(app: &CompanionApp, item_id: i32) -> Result<bool, String> {
    Ok(app.commerce().remove_price_watch(item_id))
}

/// 立即保存设置
pub async fn save_settings(app: &CompanionApp) -> Result<(), String> {
    app.save_settings().await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::offline_app;
    use crate::models::{Units, WvWMap};
    use crate::event_bus::{drain, AppEvent};
    use crate::settings::{JsonSettingsFile, SettingsPersistence, TASK_SORT_DISTANCE};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_update_settings_reaches_controllers() {
        let dir = tempfile::tempdir().unwrap();
        let app = offline_app(Arc::new(JsonSettingsFile::new(dir.path().join("settings.json"))));

        let update = SettingsUpdate {
            distance_units: Some(Units::Meters),
            commerce_refresh_interval_ms: Some(60_000),
            wvw_map_override: Some(WvWMap::BlueBorderlands),
            ..Default::default()
        };
        let settings = update_settings(&app, update).unwrap();

        assert_eq!(settings.tasks.distance_units, Units::Meters);
        assert_eq!(app.commerce().refresh_interval(), 60_000);
        assert_eq!(app.wvw().map_override(), WvWMap::BlueBorderlands);
    }

    #[tokio::test]
    async fn test_sort_and_units_update_reaches_task_tracker() {
        let dir = tempfile::tempdir().unwrap();
        let app = offline_app(Arc::new(JsonSettingsFile::new(dir.path().join("settings.json"))));
        let mut events = app.event_bus().subscribe();

        let update = SettingsUpdate {
            task_sort_property: Some(TASK_SORT_DISTANCE.to_string()),
            distance_units: Some(Units::Meters),
            ..Default::default()
        };
        let settings = update_settings(&app, update).unwrap();
        assert_eq!(settings.tasks.sort_property, TASK_SORT_DISTANCE);

        // 视图排序和选择属性同步
        let tracker = app.task_tracker();
        assert_eq!(tracker.player_tasks().sort_descriptions()[0].property, TASK_SORT_DISTANCE);
        assert!(tracker.sort_by_distance());
        assert!(!tracker.sort_by_name());
        assert!(tracker.is_meters_selected());

        let events = drain(&mut events);
        for property in ["sort_by_name", "sort_by_distance", "is_feet_selected", "is_meters_selected"] {
            assert!(events.contains(&AppEvent::PropertyChanged {
                entity: "task_tracker".to_string(),
                property,
            }));
        }

        // 未知排序属性整体拒绝
        let update = SettingsUpdate {
            task_sort_property: Some("level".to_string()),
            distance_units: Some(Units::Feet),
            ..Default::default()
        };
        assert!(update_settings(&app, update).is_err());
        assert!(tracker.is_meters_selected());
        assert_eq!(tracker.player_tasks().sort_descriptions()[0].property, TASK_SORT_DISTANCE);
    }

    #[tokio::test]
    async fn test_invalid_update_keeps_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let app = offline_app(Arc::new(JsonSettingsFile::new(dir.path().join("settings.json"))));
        let before = get_settings(&app).unwrap();

        let update = SettingsUpdate {
            distance_units: Some(Units::Meters),
            task_refresh_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(update_settings(&app, update).is_err());
        assert_eq!(get_settings(&app).unwrap(), before);
        assert_eq!(app.tasks().refresh_interval(), before.tasks.refresh_interval_ms);
    }

    #[tokio::test]
    async fn test_price_watch_commands_persist() {
        let dir = tempfile::tempdir().unwrap();
        let file = Arc::new(JsonSettingsFile::new(dir.path().join("settings.json")));
        let app = offline_app(file.clone());

        let mut watch = PriceWatch::new(19721);
        watch.sell_upper_limit = Some(3000);
        add_price_watch(&app, watch).unwrap();
        assert!(add_price_watch(&app, PriceWatch::new(0)).is_err());

        save_settings(&app).await.unwrap();
        let saved = file.load().await.unwrap();
        assert_eq!(saved.commerce.price_watches.len(), 1);

        assert_eq!(remove_price_watch(&app, 19721), Ok(true));
        assert_eq!(remove_price_watch(&app, 19721), Ok(false));
    }
}
