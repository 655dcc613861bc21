// 地下城路线视图模型

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::event_bus::EventBus;
use crate::models::{DungeonPath, RewardSplit};
use crate::observable::Tracked;
use crate::settings::SettingsStore;

/// 地下城路线视图模型
///
/// 完成状态不在本地缓存,每次都从设置中的已完成集合读取
#[derive(Clone)]
pub struct PathViewModel {
    path: DungeonPath,
    settings: Arc<SettingsStore>,
    event_bus: Arc<EventBus>,
}

impl PathViewModel {
    pub fn new(path: DungeonPath, settings: Arc<SettingsStore>, event_bus: Arc<EventBus>) -> Self {
        Self {
            path,
            settings,
            event_bus,
        }
    }

    pub fn path(&self) -> &DungeonPath {
        &self.path
    }

    pub fn path_id(&self) -> Uuid {
        self.path.id
    }

    pub fn display_name(&self) -> &str {
        &self.path.display_name
    }

    pub fn nickname(&self) -> &str {
        &self.path.nickname
    }

    pub fn reward(&self) -> RewardSplit {
        RewardSplit::from_gold(self.path.gold_reward)
    }

    /// 奖励的金币部分
    pub fn reward_gold(&self) -> i64 {
        self.reward().gold
    }

    /// 奖励的银币部分
    pub fn reward_silver(&self) -> i64 {
        self.reward().silver
    }

    pub fn is_completed(&self) -> bool {
        self.settings
            .read(|s| s.dungeons.completed_paths.contains(&self.path.id))
    }

    /// 写入完成状态;只有集合成员真正变化时才发出通知,返回是否变化
    pub fn set_completed(&self, completed: bool) -> bool {
        let id = self.path.id;
        let changed = self.settings.write(|s| {
            if completed {
                s.dungeons.completed_paths.insert(id)
            } else {
                s.dungeons.completed_paths.remove(&id)
            }
        });

        if changed {
            if completed {
                debug!("Adding \"{}\" to CompletedPaths", id);
            } else {
                debug!("Removing \"{}\" from CompletedPaths", id);
            }
            self.event_bus.raise_property_changed(id.to_string(), "is_completed");
        }
        changed
    }
}

impl Tracked for PathViewModel {
    type Key = Uuid;
    type Record = DungeonPath;

    fn key(&self) -> Uuid {
        self.path.id
    }

    fn record_key(record: &DungeonPath) -> Uuid {
        record.id
    }

    fn update_from(&mut self, record: DungeonPath) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.path.display_name != record.display_name {
            fields.push("display_name");
        }
        if self.path.nickname != record.nickname {
            fields.push("nickname");
        }
        if self.path.gold_reward != record.gold_reward {
            fields.extend(["reward_gold", "reward_silver"]);
        }
        self.path = record;
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::{drain, AppEvent};

    fn fixture(reward: f64) -> (PathViewModel, Arc<SettingsStore>, Arc<EventBus>) {
        let settings = Arc::new(SettingsStore::default());
        let bus = Arc::new(EventBus::new(64));
        let vm = PathViewModel::new(
            DungeonPath::new("Path 1", "AC p1", reward),
            settings.clone(),
            bus.clone(),
        );
        (vm, settings, bus)
    }

    #[test]
    fn test_reward_split() {
        let (vm, _, _) = fixture(1.26);
        assert_eq!(vm.reward_gold(), 1);
        assert_eq!(vm.reward_silver(), 26);

        let (vm, _, _) = fixture(1.995);
        assert_eq!((vm.reward_gold(), vm.reward_silver()), (2, 0));

        let (vm, _, _) = fixture(-3.0);
        assert_eq!((vm.reward_gold(), vm.reward_silver()), (0, 0));
    }

    #[test]
    fn test_toggle_twice_restores_membership_with_two_notifications() {
        let (vm, settings, bus) = fixture(1.0);
        let mut events = bus.subscribe();
        let before = settings.read(|s| s.dungeons.completed_paths.clone());

        assert!(vm.set_completed(true));
        assert!(vm.is_completed());
        assert!(vm.set_completed(false));
        assert!(!vm.is_completed());

        assert_eq!(settings.read(|s| s.dungeons.completed_paths.clone()), before);
        let events = drain(&mut events);
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| *e == AppEvent::property(vm.path_id().to_string(), "is_completed")));
    }

    #[test]
    fn test_noop_writes_do_not_notify() {
        let (vm, _, bus) = fixture(1.0);
        let mut events = bus.subscribe();

        assert!(!vm.set_completed(false));
        assert!(vm.set_completed(true));
        assert!(!vm.set_completed(true));

        assert_eq!(drain(&mut events).len(), 1);
    }

    #[test]
    fn test_completion_is_derived_from_settings() {
        let (vm, settings, _) = fixture(1.0);
        let clone = vm.clone();

        settings.write(|s| s.dungeons.completed_paths.insert(vm.path_id()));
        assert!(vm.is_completed());
        assert!(clone.is_completed());

        settings.write(|s| s.dungeons.completed_paths.clear());
        assert!(!clone.is_completed());
    }
}
