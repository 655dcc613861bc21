// WvW 控制器 - 轮询对战状态,维护目标点列表和易主提醒

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::lock;
use super::refresh::{Refreshable, RefreshLoop};
use super::sources::{PositionSource, WvWSource};
use crate::error::Result;
use crate::event_bus::{AppEvent, EventBus};
use crate::models::{PlayerPosition, TeamColor, WvWMap, WvWMatch, WvWObjective};
use crate::observable::ObservableCollection;
use crate::settings::{SettingsStore, WvWUserData};
use crate::viewmodels::{WvWObjectiveViewModel, WvWTeamViewModel};

const CONTROLLER_NAME: &str = "wvw";

/// 一次轮询的结果
struct WvWTick {
    /// 未配置世界时为 None
    matchup: Option<WvWMatch>,
    position: Option<PlayerPosition>,
}

/// WvW 控制器
pub struct WvWController {
    inner: Arc<WvWInner>,
    refresh: RefreshLoop,
}

struct WvWInner {
    source: Arc<dyn WvWSource>,
    position: Arc<dyn PositionSource>,
    settings: Arc<SettingsStore>,
    event_bus: Arc<EventBus>,
    worlds: Arc<ObservableCollection<WvWTeamViewModel>>,
    all_objectives: Arc<ObservableCollection<WvWObjectiveViewModel>>,
    current_objectives: Arc<ObservableCollection<WvWObjectiveViewModel>>,
    notifications: Arc<ObservableCollection<WvWObjectiveViewModel>>,
    /// 最近一次轮询得到的玩家地图
    player_map: Mutex<WvWMap>,
    write_lock: Mutex<()>,
}

impl WvWController {
    pub fn new(
        source: Arc<dyn WvWSource>,
        position: Arc<dyn PositionSource>,
        settings: Arc<SettingsStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let interval_ms = settings.read(|s| s.wvw.objectives_refresh_interval_ms);
        let refresh = RefreshLoop::new(CONTROLLER_NAME, interval_ms, event_bus.clone());
        let inner = Arc::new(WvWInner {
            source,
            position,
            settings,
            event_bus,
            worlds: Arc::new(ObservableCollection::new("worlds")),
            all_objectives: Arc::new(ObservableCollection::new("all_objectives")),
            current_objectives: Arc::new(ObservableCollection::new("current_objectives")),
            notifications: Arc::new(ObservableCollection::new("wvw_notifications")),
            player_map: Mutex::new(WvWMap::Unknown),
            write_lock: Mutex::new(()),
        });
        Self { inner, refresh }
    }

    /// 覆盖玩家所在地图的地图;`Unknown` 表示不覆盖
    pub fn map_override(&self) -> WvWMap {
        self.inner.settings.read(|s| s.wvw.map_override)
    }

    /// 修改覆盖地图并立即重新筛选当前目标点
    pub fn set_map_override(&self, map: WvWMap) {
        let _guard = lock(&self.inner.write_lock);
        let changed = self.inner.settings.write(|s| {
            let changed = s.wvw.map_override != map;
            s.wvw.map_override = map;
            changed
        });
        if changed {
            info!("WvW 覆盖地图: {:?}", map);
            self.inner.refresh_current_objectives();
            self.inner
                .event_bus
                .raise_property_changed(CONTROLLER_NAME, "map_override");
        }
    }

    pub fn objectives_refresh_interval(&self) -> u64 {
        self.refresh.refresh_interval()
    }

    pub fn set_objectives_refresh_interval(&self, interval_ms: u64) -> Result<()> {
        self.refresh.set_refresh_interval(interval_ms)?;
        self.inner
            .settings
            .write(|s| s.wvw.objectives_refresh_interval_ms = interval_ms);
        Ok(())
    }

    pub fn user_data(&self) -> WvWUserData {
        self.inner.settings.read(|s| s.wvw.clone())
    }

    pub fn worlds(&self) -> &Arc<ObservableCollection<WvWTeamViewModel>> {
        &self.inner.worlds
    }

    pub fn all_objectives(&self) -> &Arc<ObservableCollection<WvWObjectiveViewModel>> {
        &self.inner.all_objectives
    }

    pub fn current_objectives(&self) -> &Arc<ObservableCollection<WvWObjectiveViewModel>> {
        &self.inner.current_objectives
    }

    pub fn wvw_notifications(&self) -> &Arc<ObservableCollection<WvWObjectiveViewModel>> {
        &self.inner.notifications
    }

    pub fn start(&self) -> bool {
        self.refresh.start(self.inner.clone())
    }

    pub fn stop(&self) -> bool {
        self.refresh.stop()
    }

    pub fn is_running(&self) -> bool {
        self.refresh.is_running()
    }

    /// 关闭一条易主提醒
    pub fn dismiss_notification(&self, objective_id: &str) -> bool {
        let _guard = lock(&self.inner.write_lock);
        self.inner
            .notifications
            .remove(&objective_id.to_string())
            .is_some()
    }
}

#[async_trait]
impl Refreshable for WvWInner {
    type Snapshot = WvWTick;

    fn name(&self) -> &'static str {
        CONTROLLER_NAME
    }

    async fn fetch(&self) -> Result<WvWTick> {
        let position = match self.position.current_position().await {
            Ok(position) => position,
            Err(e) => {
                debug!("读取玩家位置失败: {}", e);
                None
            }
        };

        let Some(world_id) = self.settings.read(|s| s.wvw.world_id) else {
            return Ok(WvWTick {
                matchup: None,
                position,
            });
        };
        let matchup = self.source.fetch_match(world_id).await?;
        Ok(WvWTick {
            matchup: Some(matchup),
            position,
        })
    }

    fn apply(&self, tick: WvWTick) {
        let _guard = lock(&self.write_lock);
        let player_map = tick
            .position
            .map_or(WvWMap::Unknown, |p| WvWMap::from_map_id(p.map_id));
        *lock(&self.player_map) = player_map;

        let matchup = tick.matchup.unwrap_or_default();
        let previous_owners: HashMap<String, TeamColor> = self
            .all_objectives
            .with_items(|items| items.iter().map(|vm| (vm.id().to_string(), vm.owner())).collect());

        let records: Vec<(WvWObjective, Option<f64>)> = matchup
            .objectives
            .into_iter()
            .map(|objective| {
                let distance = distance_to(&objective, tick.position.as_ref());
                (objective, distance)
            })
            .collect();
        let changed_owners: Vec<(String, TeamColor, TeamColor)> = records
            .iter()
            .filter_map(|(objective, _)| {
                let previous = *previous_owners.get(&objective.id)?;
                (previous != objective.owner).then(|| (objective.id.clone(), previous, objective.owner))
            })
            .collect();
        let current = on_map(self.current_map(), records.iter().cloned());

        // 三个集合都来自同一次轮询,记录全部准备好后连续替换
        self.worlds.reconcile(matchup.teams, WvWTeamViewModel::new);
        self.all_objectives
            .reconcile(records, |(objective, distance)| WvWObjectiveViewModel::new(objective, distance));
        self.current_objectives
            .reconcile(current, |(objective, distance)| WvWObjectiveViewModel::new(objective, distance));

        if !changed_owners.is_empty() && self.settings.read(|s| s.wvw.notify_on_owner_change) {
            self.raise_owner_notifications(changed_owners);
        }
    }
}

impl WvWInner {
    /// 覆盖地图优先,否则使用玩家所在地图
    fn current_map(&self) -> WvWMap {
        let override_map = self.settings.read(|s| s.wvw.map_override);
        if override_map != WvWMap::Unknown {
            override_map
        } else {
            *lock(&self.player_map)
        }
    }

    /// 按覆盖地图或玩家地图重新筛选当前目标点
    fn refresh_current_objectives(&self) {
        let records = self.all_objectives.with_items(|items| {
            on_map(
                self.current_map(),
                items.iter().map(|vm| (vm.objective().clone(), vm.distance())),
            )
        });
        self.current_objectives
            .reconcile(records, |(objective, distance)| WvWObjectiveViewModel::new(objective, distance));
    }

    fn raise_owner_notifications(&self, changes: Vec<(String, TeamColor, TeamColor)>) {
        for (objective_id, previous, owner) in changes {
            let Some(vm) = self.all_objectives.get(&objective_id) else {
                warn!("易主的目标点 {} 已不在列表中", objective_id);
                continue;
            };
            info!("{} 易主: {:?} -> {:?}", vm.name(), previous, owner);
            // 旧提醒被新提醒替换
            self.notifications.remove(&objective_id);
            self.notifications.push(vm);
            self.event_bus.publish(AppEvent::ObjectiveOwnerChanged {
                objective_id,
                previous,
                owner,
            });
        }
    }
}

/// 只保留指定地图上的目标点;地图未知时为空
fn on_map(
    map: WvWMap,
    records: impl Iterator<Item = (WvWObjective, Option<f64>)>,
) -> Vec<(WvWObjective, Option<f64>)> {
    if map == WvWMap::Unknown {
        return Vec::new();
    }
    records.filter(|(objective, _)| objective.map == map).collect()
}

/// 玩家与目标点在同一张地图时的距离
fn distance_to(objective: &WvWObjective, position: Option<&PlayerPosition>) -> Option<f64> {
    let player = position?;
    let location = objective.location?;
    (WvWMap::from_map_id(player.map_id) == objective.map).then(|| player.position.distance_to(&location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::sources::SharedPosition;
    use crate::event_bus::drain;
    use crate::models::{ObjectiveType, Point, WvWTeam};

    struct FixedMatch(Mutex<WvWMatch>);

    #[async_trait]
    impl WvWSource for FixedMatch {
        async fn fetch_match(&self, _world_id: i32) -> Result<WvWMatch> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    fn objective(id: &str, map: WvWMap, owner: TeamColor) -> WvWObjective {
        WvWObjective {
            id: id.into(),
            name: format!("objective {}", id),
            kind: ObjectiveType::Tower,
            map,
            owner,
            claimed_by: None,
            last_flipped: None,
            location: Some(Point::new(0.0, 0.0, 0.0)),
        }
    }

    fn matchup(owner: TeamColor) -> WvWMatch {
        WvWMatch {
            match_id: "1-1".into(),
            teams: vec![WvWTeam {
                world_id: 1001,
                name: "Anvil Rock".into(),
                color: TeamColor::Green,
                score: 100,
            }],
            objectives: vec![
                objective("38-1", WvWMap::EternalBattlegrounds, owner),
                objective("95-1", WvWMap::GreenBorderlands, TeamColor::Red),
            ],
        }
    }

    fn fixture() -> (WvWController, Arc<SharedPosition>, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(64));
        let settings = Arc::new(SettingsStore::default());
        settings.write(|s| s.wvw.world_id = Some(1001));
        let position = Arc::new(SharedPosition::new());
        let controller = WvWController::new(
            Arc::new(FixedMatch(Mutex::new(matchup(TeamColor::Red)))),
            position.clone(),
            settings,
            bus.clone(),
        );
        (controller, position, bus)
    }

    fn tick(owner: TeamColor, position: Option<PlayerPosition>) -> WvWTick {
        WvWTick {
            matchup: Some(matchup(owner)),
            position,
        }
    }

    #[test]
    fn test_current_objectives_follow_player_map_and_override() {
        let (controller, _, _) = fixture();
        let on_ebg = PlayerPosition {
            map_id: 38,
            position: Point::new(120.0, 0.0, 0.0),
        };

        controller.inner.apply(tick(TeamColor::Red, Some(on_ebg)));
        assert_eq!(controller.all_objectives().len(), 2);
        assert_eq!(controller.current_objectives().keys(), vec!["38-1".to_string()]);
        let current = controller.current_objectives().get(&"38-1".to_string()).unwrap();
        assert_eq!(current.distance(), Some(120.0));

        controller.set_map_override(WvWMap::GreenBorderlands);
        assert_eq!(controller.current_objectives().keys(), vec!["95-1".to_string()]);

        controller.set_map_override(WvWMap::Unknown);
        controller.inner.apply(tick(TeamColor::Red, None));
        assert!(controller.current_objectives().is_empty());
    }

    #[test]
    fn test_tick_updates_all_collections_together() {
        let (controller, _, _) = fixture();
        let on_ebg = PlayerPosition {
            map_id: 38,
            position: Point::new(0.0, 40.0, 0.0),
        };
        controller.inner.apply(tick(TeamColor::Red, Some(on_ebg)));

        let mut next = matchup(TeamColor::Blue);
        next.teams[0].score = 250;
        next.objectives.retain(|o| o.map == WvWMap::EternalBattlegrounds);
        controller.inner.apply(WvWTick {
            matchup: Some(next),
            position: Some(on_ebg),
        });

        assert_eq!(controller.worlds().snapshot()[0].score(), 250);
        assert_eq!(controller.all_objectives().keys(), vec!["38-1".to_string()]);
        let all = controller.all_objectives().get(&"38-1".to_string()).unwrap();
        let current = controller.current_objectives().get(&"38-1".to_string()).unwrap();
        assert_eq!(current.owner(), TeamColor::Blue);
        assert_eq!(current.owner(), all.owner());
        assert_eq!(current.distance(), Some(40.0));
        assert_eq!(current.distance(), all.distance());
    }

    #[test]
    fn test_owner_change_raises_notification() {
        let (controller, _, bus) = fixture();
        let mut events = bus.subscribe();

        controller.inner.apply(tick(TeamColor::Red, None));
        assert!(controller.wvw_notifications().is_empty());

        controller.inner.apply(tick(TeamColor::Blue, None));
        let notifications = controller.wvw_notifications().snapshot();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].previous_owner(), Some(TeamColor::Red));

        let owner_events: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, AppEvent::ObjectiveOwnerChanged { .. }))
            .collect();
        assert_eq!(
            owner_events,
            vec![AppEvent::ObjectiveOwnerChanged {
                objective_id: "38-1".into(),
                previous: TeamColor::Red,
                owner: TeamColor::Blue,
            }]
        );

        assert!(controller.dismiss_notification("38-1"));
        assert!(controller.wvw_notifications().is_empty());
    }

    #[test]
    fn test_owner_change_notification_disabled() {
        let (controller, _, _) = fixture();
        controller
            .inner
            .settings
            .write(|s| s.wvw.notify_on_owner_change = false);

        controller.inner.apply(tick(TeamColor::Red, None));
        controller.inner.apply(tick(TeamColor::Green, None));
        assert!(controller.wvw_notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_reads_shared_position() {
        let (controller, position, _) = fixture();
        position.set(Some(PlayerPosition {
            map_id: 95,
            position: Point::new(0.0, 0.0, 0.0),
        }));

        controller.start();
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        controller.stop();

        assert_eq!(controller.worlds().len(), 1);
        assert_eq!(controller.current_objectives().keys(), vec!["95-1".to_string()]);
    }
}
