// 玩家任务视图模型

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::event_bus::EventBus;
use crate::models::{PlayerPosition, PlayerTask, RewardSplit};
use crate::observable::{SortKey, Sortable, Tracked};
use crate::settings::{SettingsStore, TASK_SORT_DISTANCE, TASK_SORT_NAME};

#[derive(Clone)]
pub struct PlayerTaskViewModel {
    task: PlayerTask,
    /// 与玩家的距离(地图单位),不在同一张地图时为 None
    distance: Option<f64>,
    is_on_current_map: bool,
    settings: Arc<SettingsStore>,
    event_bus: Arc<EventBus>,
}

impl PlayerTaskViewModel {
    pub fn new(task: PlayerTask, settings: Arc<SettingsStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            task,
            distance: None,
            is_on_current_map: false,
            settings,
            event_bus,
        }
    }

    pub fn task(&self) -> &PlayerTask {
        &self.task
    }

    pub fn id(&self) -> Uuid {
        self.task.id
    }

    pub fn name(&self) -> &str {
        &self.task.name
    }

    pub fn reward(&self) -> RewardSplit {
        RewardSplit::from_gold(self.task.reward)
    }

    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    pub fn is_on_current_map(&self) -> bool {
        self.is_on_current_map
    }

    /// 按设置中的单位格式化距离
    pub fn distance_display(&self) -> Option<String> {
        let units = self.settings.read(|s| s.tasks.distance_units);
        self.distance
            .map(|d| format!("{:.0} {}", units.from_map_units(d), units.suffix()))
    }

    pub fn is_completed(&self) -> bool {
        self.settings
            .read(|s| s.tasks.completed_tasks.contains(&self.task.id))
    }

    /// 写入完成状态;不可完成的任务或无变化的写入不会发出通知
    pub fn set_completed(&self, completed: bool) -> bool {
        if !self.task.is_completable {
            return false;
        }

        let id = self.task.id;
        let changed = self.settings.write(|s| {
            if completed {
                s.tasks.completed_tasks.insert(id)
            } else {
                s.tasks.completed_tasks.remove(&id)
            }
        });
        if changed {
            debug!("任务 {} 完成状态: {}", id, completed);
            self.event_bus.raise_property_changed(id.to_string(), "is_completed");
        }
        changed
    }

    /// 根据玩家位置更新距离,返回变化的字段
    pub(crate) fn update_position(&mut self, position: Option<&PlayerPosition>) -> Vec<&'static str> {
        let (distance, on_map) = match (position, self.task.map_id, self.task.location) {
            (Some(player), Some(map_id), Some(location)) if player.map_id == map_id => {
                (Some(player.position.distance_to(&location)), true)
            }
            (Some(player), Some(map_id), None) if player.map_id == map_id => (None, true),
            _ => (None, false),
        };

        let mut fields = Vec::new();
        if self.distance != distance {
            self.distance = distance;
            fields.push("distance");
        }
        if self.is_on_current_map != on_map {
            self.is_on_current_map = on_map;
            fields.push("is_on_current_map");
        }
        fields
    }
}

impl Tracked for PlayerTaskViewModel {
    type Key = Uuid;
    type Record = PlayerTask;

    fn key(&self) -> Uuid {
        self.task.id
    }

    fn record_key(record: &PlayerTask) -> Uuid {
        record.id
    }

    fn update_from(&mut self, record: PlayerTask) -> Vec<&'static str> {
        if self.task == record {
            return Vec::new();
        }
        let mut fields = vec!["task"];
        if self.task.name != record.name {
            fields.push("name");
        }
        if self.task.map_id != record.map_id || self.task.location != record.location {
            // 位置变化后要等下一次轮询才能得到新距离
            self.distance = None;
            self.is_on_current_map = false;
            fields.extend(["distance", "is_on_current_map"]);
        }
        self.task = record;
        fields
    }
}

impl Sortable for PlayerTaskViewModel {
    fn sort_key(&self, property: &str) -> SortKey {
        match property {
            TASK_SORT_NAME => SortKey::Text(self.task.name.clone()),
            TASK_SORT_DISTANCE => self.distance.map_or(SortKey::Missing, SortKey::Number),
            _ => SortKey::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::drain;
    use crate::models::{Point, Units};

    fn task_vm(settings: &Arc<SettingsStore>, bus: &Arc<EventBus>) -> PlayerTaskViewModel {
        let task = PlayerTask::new("Harvest").at(15, Point::new(0.0, 0.0, 0.0));
        PlayerTaskViewModel::new(task, settings.clone(), bus.clone())
    }

    #[test]
    fn test_position_updates_distance() {
        let settings = Arc::new(SettingsStore::default());
        let bus = Arc::new(EventBus::new(16));
        let mut vm = task_vm(&settings, &bus);

        let here = PlayerPosition {
            map_id: 15,
            position: Point::new(120.0, 0.0, 0.0),
        };
        assert_eq!(vm.update_position(Some(&here)), vec!["distance", "is_on_current_map"]);
        assert_eq!(vm.distance(), Some(120.0));
        assert_eq!(vm.distance_display().as_deref(), Some("10 ft"));
        assert!(vm.update_position(Some(&here)).is_empty());

        settings.write(|s| s.tasks.distance_units = Units::Meters);
        assert_eq!(vm.distance_display().as_deref(), Some("3 m"));

        let elsewhere = PlayerPosition {
            map_id: 28,
            position: Point::new(0.0, 0.0, 0.0),
        };
        vm.update_position(Some(&elsewhere));
        assert_eq!(vm.distance(), None);
        assert!(!vm.is_on_current_map());
        assert_eq!(vm.sort_key(TASK_SORT_DISTANCE), SortKey::Missing);
    }

    #[test]
    fn test_completion_round_trip() {
        let settings = Arc::new(SettingsStore::default());
        let bus = Arc::new(EventBus::new(16));
        let vm = task_vm(&settings, &bus);
        let mut events = bus.subscribe();

        assert!(vm.set_completed(true));
        assert!(!vm.set_completed(true));
        assert!(vm.set_completed(false));
        assert!(!vm.is_completed());
        assert_eq!(drain(&mut events).len(), 2);
    }

    #[test]
    fn test_uncompletable_task_ignores_toggle() {
        let settings = Arc::new(SettingsStore::default());
        let bus = Arc::new(EventBus::new(16));
        let mut task = PlayerTask::new("Reminder");
        task.is_completable = false;
        let vm = PlayerTaskViewModel::new(task, settings.clone(), bus);

        assert!(!vm.set_completed(true));
        assert!(settings.read(|s| s.tasks.completed_tasks.is_empty()));
    }

    #[test]
    fn test_update_from_reports_changed_fields() {
        let settings = Arc::new(SettingsStore::default());
        let bus = Arc::new(EventBus::new(16));
        let mut vm = task_vm(&settings, &bus);

        let same = vm.task().clone();
        assert!(vm.update_from(same).is_empty());

        let mut renamed = vm.task().clone();
        renamed.name = "Harvest nodes".into();
        assert_eq!(vm.update_from(renamed), vec!["task", "name"]);
        assert_eq!(vm.name(), "Harvest nodes");
    }
}
