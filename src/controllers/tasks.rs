// 玩家任务控制器
//
// 轮询玩家位置并更新每个任务的距离;负责任务的增删、文件加载/导入/导出,
// 以及每日重置时清除每日任务的完成状态

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::lock;
use super::refresh::{Refreshable, RefreshLoop};
use super::sources::PositionSource;
use crate::error::Result;
use crate::event_bus::{AppEvent, EventBus, NoticeLevel};
use crate::models::{PlayerPosition, PlayerTask};
use crate::observable::{ObservableCollection, ReconcileSummary};
use crate::settings::{SettingsStore, TasksUserData};
use crate::storage::{read_task_file, write_task_file};
use crate::utils::{parse_waypoint_code, validate_reward, validate_task_name, GameProcessMonitor};
use crate::viewmodels::PlayerTaskViewModel;

const CONTROLLER_NAME: &str = "player_tasks";

/// 每日重置时间: 每天 00:00 UTC
const DAILY_RESET_CRON: &str = "0 0 0 * * * *";

fn daily_reset_schedule() -> &'static Schedule {
    static SCHEDULE: OnceLock<Schedule> = OnceLock::new();
    SCHEDULE.get_or_init(|| Schedule::from_str(DAILY_RESET_CRON).expect("静态 cron 表达式无效"))
}

/// 一次轮询的结果
struct TaskTick {
    game_running: bool,
    position: Option<PlayerPosition>,
    now: DateTime<Utc>,
}

/// 玩家任务控制器
pub struct PlayerTasksController {
    inner: Arc<TasksInner>,
    refresh: RefreshLoop,
}

struct TasksInner {
    position: Arc<dyn PositionSource>,
    game: Arc<dyn GameProcessMonitor>,
    settings: Arc<SettingsStore>,
    event_bus: Arc<EventBus>,
    player_tasks: Arc<ObservableCollection<PlayerTaskViewModel>>,
    last_position: Mutex<Option<PlayerPosition>>,
    write_lock: Mutex<()>,
}

impl PlayerTasksController {
    /// 创建控制器,并从设置中恢复任务列表
    pub fn new(
        position: Arc<dyn PositionSource>,
        game: Arc<dyn GameProcessMonitor>,
        settings: Arc<SettingsStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let (interval_ms, tasks) = settings.read(|s| (s.tasks.refresh_interval_ms, s.tasks.tasks.clone()));
        let refresh = RefreshLoop::new(CONTROLLER_NAME, interval_ms, event_bus.clone());
        let inner = Arc::new(TasksInner {
            position,
            game,
            settings,
            event_bus,
            player_tasks: Arc::new(ObservableCollection::new("player_tasks")),
            last_position: Mutex::new(None),
            write_lock: Mutex::new(()),
        });

        let restored: Vec<PlayerTaskViewModel> = tasks.into_iter().map(|t| inner.create_view_model(t)).collect();
        info!("恢复了 {} 个玩家任务", restored.len());
        inner.player_tasks.replace_all(restored);

        Self { inner, refresh }
    }

    pub fn refresh_interval(&self) -> u64 {
        self.refresh.refresh_interval()
    }

    pub fn set_refresh_interval(&self, interval_ms: u64) -> Result<()> {
        self.refresh.set_refresh_interval(interval_ms)?;
        self.inner
            .settings
            .write(|s| s.tasks.refresh_interval_ms = interval_ms);
        Ok(())
    }

    pub fn user_data(&self) -> TasksUserData {
        self.inner.settings.read(|s| s.tasks.clone())
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.inner.settings
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.event_bus
    }

    pub fn player_tasks(&self) -> &Arc<ObservableCollection<PlayerTaskViewModel>> {
        &self.inner.player_tasks
    }

    /// 最近一次轮询得到的玩家位置
    pub fn last_position(&self) -> Option<PlayerPosition> {
        *lock(&self.inner.last_position)
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

    /// 添加新任务,或按 Id 更新已有任务
    pub fn add_or_update_task(&self, task: PlayerTask) -> Result<()> {
        let result = validate_task(&task).map(|_| {
            let _guard = lock(&self.inner.write_lock);
            let id = task.id;
            self.inner.merge_tasks(vec![task]);
            self.inner.persist_tasks();
            debug!("任务已保存: {}", id);
        });
        self.inner.report("保存任务", result)
    }

    /// 删除单个任务
    pub fn delete_task(&self, id: Uuid) -> bool {
        let _guard = lock(&self.inner.write_lock);
        let Some(removed) = self.inner.player_tasks.remove(&id) else {
            return false;
        };
        self.inner.settings.write(|s| s.tasks.completed_tasks.remove(&id));
        self.inner.persist_tasks();
        info!("已删除任务: {}", removed.name());
        true
    }

    /// 删除全部任务,返回删除数量
    pub fn delete_all_tasks(&self) -> usize {
        let _guard = lock(&self.inner.write_lock);
        let ids = self.inner.player_tasks.keys();
        let count = self.inner.player_tasks.clear();
        self.inner.settings.write(|s| {
            for id in &ids {
                s.tasks.completed_tasks.remove(id);
            }
        });
        self.inner.persist_tasks();
        info!("已删除全部 {} 个任务", count);
        count
    }

    /// 从文件加载任务,替换当前列表
    pub async fn load_tasks_file(&self, path: &Path) -> Result<usize> {
        info!("加载任务文件: {:?}", path);
        let result = read_task_file(path).await.map(|tasks| {
            let _guard = lock(&self.inner.write_lock);
            let count = tasks.len();
            let ids: HashSet<Uuid> = tasks.iter().map(|t| t.id).collect();
            let replacement = tasks.into_iter().map(|t| self.inner.create_view_model(t)).collect();
            self.inner.player_tasks.replace_all(replacement);
            // 被替换掉的任务不再保留完成标记
            self.inner
                .settings
                .write(|s| s.tasks.completed_tasks.retain(|id| ids.contains(id)));
            self.inner.persist_tasks();
            count
        });
        self.inner.report("加载任务文件", result)
    }

    /// 从文件导入任务,按 Id 合并进当前列表
    pub async fn import_tasks(&self, path: &Path) -> Result<ReconcileSummary> {
        info!("导入任务文件: {:?}", path);
        let result = read_task_file(path).await.map(|tasks| {
            let _guard = lock(&self.inner.write_lock);
            let summary = self.inner.merge_tasks(tasks);
            self.inner.persist_tasks();
            summary
        });
        self.inner.report("导入任务", result)
    }

    /// 导出当前任务列表
    pub async fn export_tasks(&self, path: &Path) -> Result<usize> {
        info!("导出任务文件: {:?}", path);
        let tasks = {
            let _guard = lock(&self.inner.write_lock);
            self.inner.current_tasks()
        };
        let result = write_task_file(path, &tasks).await.map(|_| tasks.len());
        self.inner.report("导出任务", result)
    }
}

fn validate_task(task: &PlayerTask) -> Result<()> {
    validate_task_name(&task.name)?;
    validate_reward(task.reward)?;
    if let Some(code) = task.waypoint_code.as_deref().filter(|c| !c.trim().is_empty()) {
        parse_waypoint_code(code)?;
    }
    Ok(())
}

#[async_trait]
impl Refreshable for TasksInner {
    type Snapshot = TaskTick;

    fn name(&self) -> &'static str {
        CONTROLLER_NAME
    }

    async fn fetch(&self) -> Result<TaskTick> {
        let now = Utc::now();
        if !self.game.is_game_running() {
            return Ok(TaskTick {
                game_running: false,
                position: None,
                now,
            });
        }
        let position = self.position.current_position().await?;
        Ok(TaskTick {
            game_running: true,
            position,
            now,
        })
    }

    fn apply(&self, tick: TaskTick) {
        let _guard = lock(&self.write_lock);
        self.check_daily_reset(tick.now);

        if !tick.game_running {
            return;
        }
        *lock(&self.last_position) = tick.position;
        self.player_tasks
            .update_all(|vm| vm.update_position(tick.position.as_ref()));
    }
}

impl TasksInner {
    fn create_view_model(&self, task: PlayerTask) -> PlayerTaskViewModel {
        let mut vm = PlayerTaskViewModel::new(task, self.settings.clone(), self.event_bus.clone());
        vm.update_position(lock(&self.last_position).as_ref());
        vm
    }

    /// 合并任务并立即按最近位置计算距离(调用方持有写锁)
    fn merge_tasks(&self, tasks: Vec<PlayerTask>) -> ReconcileSummary {
        let ids: HashSet<Uuid> = tasks.iter().map(|t| t.id).collect();
        let summary = self.player_tasks.upsert(tasks, |t| self.create_view_model(t));
        let position = *lock(&self.last_position);
        for id in &ids {
            self.player_tasks
                .update(id, |vm| vm.update_position(position.as_ref()));
        }
        summary
    }

    fn current_tasks(&self) -> Vec<PlayerTask> {
        self.player_tasks
            .with_items(|items| items.iter().map(|vm| vm.task().clone()).collect())
    }

    fn persist_tasks(&self) {
        let tasks = self.current_tasks();
        self.settings.write(|s| s.tasks.tasks = tasks);
    }

    /// 距离上次重置已经跨过 00:00 UTC 时清除每日任务的完成状态
    fn check_daily_reset(&self, now: DateTime<Utc>) {
        let Some(last) = self.settings.read(|s| s.tasks.last_daily_reset) else {
            self.settings.write(|s| s.tasks.last_daily_reset = Some(now));
            return;
        };
        let Some(next_reset) = daily_reset_schedule().after(&last).next() else {
            return;
        };
        if next_reset > now {
            return;
        }

        let daily: HashSet<Uuid> = self.player_tasks.with_items(|items| {
            items
                .iter()
                .filter(|vm| vm.task().is_daily)
                .map(|vm| vm.id())
                .collect()
        });
        let cleared: Vec<Uuid> = self.settings.write(|s| {
            s.tasks.last_daily_reset = Some(now);
            let cleared: Vec<Uuid> = s
                .tasks
                .completed_tasks
                .iter()
                .filter(|id| daily.contains(id))
                .copied()
                .collect();
            for id in &cleared {
                s.tasks.completed_tasks.remove(id);
            }
            cleared
        });

        info!("每日重置: 清除了 {} 个每日任务的完成状态", cleared.len());
        for id in &cleared {
            self.event_bus.raise_property_changed(id.to_string(), "is_completed");
        }
        self.event_bus.publish(AppEvent::DailyReset {
            controller: CONTROLLER_NAME,
            cleared: cleared.len(),
        });
    }

    /// 用户操作失败时记录日志并通知界面
    fn report<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!("{}失败: {}", operation, e);
            self.event_bus
                .notify_user(NoticeLevel::Error, format!("{}失败: {}", operation, e));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controllers::sources::SharedPosition;
    use crate::error::CompanionError;
    use crate::event_bus::drain;
    use crate::models::Point;
    use crate::utils::AssumeRunning;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct FakeGame(AtomicBool);

    impl GameProcessMonitor for FakeGame {
        fn is_game_running(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn controller_with(game: Arc<dyn GameProcessMonitor>) -> (PlayerTasksController, Arc<SharedPosition>, Arc<EventBus>) {
        let bus = Arc::new(EventBus::new(256));
        let position = Arc::new(SharedPosition::new());
        let controller = PlayerTasksController::new(
            position.clone(),
            game,
            Arc::new(SettingsStore::default()),
            bus.clone(),
        );
        (controller, position, bus)
    }

    fn controller() -> (PlayerTasksController, Arc<SharedPosition>, Arc<EventBus>) {
        controller_with(Arc::new(AssumeRunning))
    }

    fn names(controller: &PlayerTasksController) -> Vec<String> {
        controller
            .player_tasks()
            .snapshot()
            .iter()
            .map(|vm| vm.name().to_string())
            .collect()
    }

    fn tick(game_running: bool, position: Option<PlayerPosition>, now: DateTime<Utc>) -> TaskTick {
        TaskTick {
            game_running,
            position,
            now,
        }
    }

    #[test]
    fn test_add_update_and_delete() {
        let (controller, _, _) = controller();
        let mut task = PlayerTask::new("Harvest");
        controller.add_or_update_task(task.clone()).unwrap();
        controller.add_or_update_task(PlayerTask::new("Vista")).unwrap();

        task.name = "Harvest nodes".into();
        controller.add_or_update_task(task.clone()).unwrap();
        assert_eq!(names(&controller), vec!["Harvest nodes", "Vista"]);
        assert_eq!(controller.user_data().tasks.len(), 2);

        assert!(controller.delete_task(task.id));
        assert!(!controller.delete_task(task.id));
        assert_eq!(controller.delete_all_tasks(), 1);
        assert!(controller.player_tasks().is_empty());
        assert!(controller.user_data().tasks.is_empty());
    }

    #[test]
    fn test_invalid_task_rejected_with_notice() {
        let (controller, _, bus) = controller();
        let mut events = bus.subscribe();

        let err = controller.add_or_update_task(PlayerTask::new("  ")).unwrap_err();
        assert!(matches!(err, CompanionError::Validation(_)));

        let mut bad_waypoint = PlayerTask::new("Travel");
        bad_waypoint.waypoint_code = Some("[&AgH1WQAA]".into());
        assert!(controller.add_or_update_task(bad_waypoint).is_err());

        assert!(controller.player_tasks().is_empty());
        let notices = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, AppEvent::UserNotice { level: NoticeLevel::Error, .. }))
            .count();
        assert_eq!(notices, 2);
    }

    #[tokio::test]
    async fn test_export_then_load_reproduces_tasks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.xml");
        let (source, _, _) = controller();
        let mut located = PlayerTask::new("Jumping puzzle").at(28, Point::new(10.5, -3.25, 7.0));
        located.reward = 2.5;
        source.add_or_update_task(located).unwrap();
        source.add_or_update_task(PlayerTask::new("Daily chest")).unwrap();

        assert_eq!(source.export_tasks(&path).await.unwrap(), 2);

        let (target, _, _) = controller();
        target.add_or_update_task(PlayerTask::new("Replaced")).unwrap();
        assert_eq!(target.load_tasks_file(&path).await.unwrap(), 2);

        let exported: Vec<PlayerTask> = source.player_tasks().snapshot().iter().map(|vm| vm.task().clone()).collect();
        let loaded: Vec<PlayerTask> = target.player_tasks().snapshot().iter().map(|vm| vm.task().clone()).collect();
        assert_eq!(loaded, exported);
        assert_eq!(target.user_data().tasks, exported);
    }

    #[tokio::test]
    async fn test_load_drops_completion_of_replaced_tasks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.xml");
        let (controller, _, _) = controller();
        let replaced = PlayerTask::new("Old daily");
        let kept = PlayerTask::new("Kept weekly");
        controller.add_or_update_task(replaced.clone()).unwrap();
        controller.add_or_update_task(kept.clone()).unwrap();
        controller.settings().write(|s| {
            s.tasks.completed_tasks.insert(replaced.id);
            s.tasks.completed_tasks.insert(kept.id);
        });

        write_task_file(&path, &[kept.clone(), PlayerTask::new("New")]).await.unwrap();
        assert_eq!(controller.load_tasks_file(&path).await.unwrap(), 2);

        let completed = controller.settings().read(|s| s.tasks.completed_tasks.clone());
        assert!(!completed.contains(&replaced.id));
        assert!(completed.contains(&kept.id));
        assert_eq!(completed.len(), 1);
    }

    #[tokio::test]
    async fn test_import_merges_by_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.xml");
        let (controller, _, _) = controller();
        let mut shared = PlayerTask::new("Shared");
        controller.add_or_update_task(shared.clone()).unwrap();
        controller.add_or_update_task(PlayerTask::new("Local only")).unwrap();

        shared.name = "Shared (imported)".into();
        write_task_file(&path, &[shared, PlayerTask::new("New")]).await.unwrap();

        let summary = controller.import_tasks(&path).await.unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(names(&controller), vec!["Shared (imported)", "Local only", "New"]);
    }

    #[tokio::test]
    async fn test_bad_import_leaves_tasks_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xml");
        tokio::fs::write(&path, r#"<PlayerTasks><PlayerTask Id="not-a-uuid" Name="x"/></PlayerTasks>"#)
            .await
            .unwrap();
        let (controller, _, bus) = controller();
        controller.add_or_update_task(PlayerTask::new("Keep me")).unwrap();
        let mut events = bus.subscribe();

        let err = controller.import_tasks(&path).await.unwrap_err();
        assert!(matches!(err, CompanionError::FileFormat { .. }));
        assert!(controller.load_tasks_file(&path).await.is_err());
        assert_eq!(names(&controller), vec!["Keep me"]);
        assert!(drain(&mut events)
            .iter()
            .any(|e| matches!(e, AppEvent::UserNotice { .. })));
    }

    #[test]
    fn test_positions_only_update_while_game_running() {
        let game = Arc::new(FakeGame(AtomicBool::new(false)));
        let (controller, _, _) = controller_with(game.clone());
        let task = PlayerTask::new("Node").at(15, Point::new(0.0, 0.0, 0.0));
        controller.add_or_update_task(task.clone()).unwrap();
        let here = PlayerPosition {
            map_id: 15,
            position: Point::new(36.0, 0.0, 0.0),
        };

        controller.inner.apply(tick(false, Some(here), Utc::now()));
        assert_eq!(controller.player_tasks().get(&task.id).unwrap().distance(), None);

        controller.inner.apply(tick(true, Some(here), Utc::now()));
        let vm = controller.player_tasks().get(&task.id).unwrap();
        assert_eq!(vm.distance(), Some(36.0));
        assert!(vm.is_on_current_map());

        // 新任务立即使用最近一次的位置
        let nearby = PlayerTask::new("Nearby").at(15, Point::new(0.0, 12.0, 0.0));
        controller.add_or_update_task(nearby.clone()).unwrap();
        let vm = controller.player_tasks().get(&nearby.id).unwrap();
        assert!((vm.distance().unwrap() - (36.0f64 * 36.0 + 12.0 * 12.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_daily_reset_clears_only_daily_tasks() {
        let (controller, _, bus) = controller();
        let mut daily = PlayerTask::new("Daily");
        daily.is_daily = true;
        let weekly = PlayerTask::new("Weekly");
        controller.add_or_update_task(daily.clone()).unwrap();
        controller.add_or_update_task(weekly.clone()).unwrap();

        let settings = controller.settings().clone();
        settings.write(|s| {
            s.tasks.last_daily_reset = Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());
            s.tasks.completed_tasks.insert(daily.id);
            s.tasks.completed_tasks.insert(weekly.id);
        });
        let mut events = bus.subscribe();

        let before_reset = Utc.with_ymd_and_hms(2024, 5, 1, 23, 59, 59).unwrap();
        controller.inner.apply(tick(false, None, before_reset));
        assert_eq!(settings.read(|s| s.tasks.completed_tasks.len()), 2);

        let after_reset = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 5).unwrap();
        controller.inner.apply(tick(false, None, after_reset));
        controller.inner.apply(tick(false, None, after_reset));

        assert!(settings.read(|s| s.tasks.completed_tasks.contains(&weekly.id)));
        assert!(!settings.read(|s| s.tasks.completed_tasks.contains(&daily.id)));
        assert_eq!(settings.read(|s| s.tasks.last_daily_reset), Some(after_reset));

        let resets: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, AppEvent::DailyReset { .. }))
            .collect();
        assert_eq!(
            resets,
            vec![AppEvent::DailyReset {
                controller: CONTROLLER_NAME,
                cleared: 1
            }]
        );
    }

    #[test]
    fn test_first_tick_records_reset_baseline() {
        let (controller, _, _) = controller();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        controller.inner.apply(tick(false, None, now));
        assert_eq!(controller.user_data().last_daily_reset, Some(now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_loop_updates_distances() {
        let (controller, position, _) = controller();
        let task = PlayerTask::new("Node").at(15, Point::new(0.0, 0.0, 0.0));
        controller.add_or_update_task(task.clone()).unwrap();
        position.set(Some(PlayerPosition {
            map_id: 15,
            position: Point::new(0.0, 24.0, 0.0),
        }));

        controller.start();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        controller.stop();

        assert_eq!(controller.player_tasks().get(&task.id).unwrap().distance(), Some(24.0));
    }

    #[test]
    fn test_tasks_restored_from_settings() {
        let settings = Arc::new(SettingsStore::default());
        settings.write(|s| s.tasks.tasks = vec![PlayerTask::new("Persisted")]);
        let controller = PlayerTasksController::new(
            Arc::new(SharedPosition::new()),
            Arc::new(AssumeRunning),
            settings,
            Arc::new(EventBus::default()),
        );
        assert_eq!(names(&controller), vec!["Persisted"]);
    }
}
