// 任务追踪器视图模型
//
// 排序选择、距离单位选择以及任务文件相关命令;
// 排序只作用于视图,不改变控制器集合的顺序和成员

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::controllers::PlayerTasksController;
use crate::error::Result;
use crate::models::{PlayerTask, SortDirection, Units};
use crate::observable::CollectionView;
use crate::settings::{validate_task_sort_property, TasksUserData, TASK_SORT_DISTANCE, TASK_SORT_NAME};

use super::PlayerTaskViewModel;

/// 属性变更通知使用的实体名
const ENTITY: &str = "task_tracker";

/// 文件对话框的过滤条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFilter {
    pub description: &'static str,
    pub extension: &'static str,
}

/// 任务文件过滤条件
pub const TASK_FILE_FILTER: FileFilter = FileFilter {
    description: "Player Task Files (*.xml)",
    extension: "xml",
};

/// 文件对话框,由界面层实现
pub trait FileDialogService: Send + Sync {
    /// 选择要打开的已存在文件;取消时返回 None
    fn open_file(&self, filter: &FileFilter) -> Option<PathBuf>;

    /// 选择保存位置;取消时返回 None
    fn save_file(&self, filter: &FileFilter) -> Option<PathBuf>;
}

/// 新建任务对话框,由界面层实现
pub trait TaskEditorDialog: Send + Sync {
    /// 以模板任务打开编辑框,用户确认后返回编辑结果
    fn edit_new_task(&self, template: PlayerTask) -> Option<PlayerTask>;
}

/// 任务追踪器视图模型
pub struct TaskTrackerViewModel {
    controller: Arc<PlayerTasksController>,
    player_tasks: CollectionView<PlayerTaskViewModel>,
    file_dialogs: Arc<dyn FileDialogService>,
    task_editor: Arc<dyn TaskEditorDialog>,
}

impl TaskTrackerViewModel {
    pub fn new(
        controller: Arc<PlayerTasksController>,
        file_dialogs: Arc<dyn FileDialogService>,
        task_editor: Arc<dyn TaskEditorDialog>,
    ) -> Self {
        let player_tasks = CollectionView::new(controller.player_tasks().clone());

        // 开启"隐藏其他地图"时,只显示当前地图上或没有位置的任务
        let settings = controller.settings().clone();
        player_tasks.set_filter(move |vm: &PlayerTaskViewModel| {
            !settings.read(|s| s.tasks.hide_other_maps) || vm.is_on_current_map() || vm.task().map_id.is_none()
        });

        let view_model = Self {
            controller,
            player_tasks,
            file_dialogs,
            task_editor,
        };

        let saved = view_model.user_data().sort_property;
        let property = match saved.as_str() {
            TASK_SORT_DISTANCE => TASK_SORT_DISTANCE,
            _ => TASK_SORT_NAME,
        };
        view_model.on_sorting_property_changed(property, SortDirection::Ascending);
        view_model
    }

    /// 排序/过滤后的任务视图
    pub fn player_tasks(&self) -> &CollectionView<PlayerTaskViewModel> {
        &self.player_tasks
    }

    pub fn user_data(&self) -> TasksUserData {
        self.controller.user_data()
    }

    pub fn is_feet_selected(&self) -> bool {
        self.distance_units() == Units::Feet
    }

    pub fn set_feet_selected(&self, value: bool) {
        if value {
            self.select_units(Units::Feet);
        }
    }

    pub fn is_meters_selected(&self) -> bool {
        self.distance_units() == Units::Meters
    }

    pub fn set_meters_selected(&self, value: bool) {
        if value {
            self.select_units(Units::Meters);
        }
    }

    pub fn sort_by_name(&self) -> bool {
        self.sort_property() == TASK_SORT_NAME
    }

    pub fn set_sort_by_name(&self, value: bool) {
        if value && !self.sort_by_name() {
            self.on_sorting_property_changed(TASK_SORT_NAME, SortDirection::Ascending);
        }
    }

    pub fn sort_by_distance(&self) -> bool {
        self.sort_property() == TASK_SORT_DISTANCE
    }

    pub fn set_sort_by_distance(&self, value: bool) {
        if value && !self.sort_by_distance() {
            self.on_sorting_property_changed(TASK_SORT_DISTANCE, SortDirection::Ascending);
        }
    }

    /// 按名称切换排序属性(设置界面使用),视图和选择属性同步更新
    pub fn set_sort_property(&self, property: &str) -> Result<()> {
        validate_task_sort_property(property)?;
        if self.sort_property() != property {
            self.on_sorting_property_changed(property, SortDirection::Ascending);
        }
        Ok(())
    }

    /// 切换距离单位,两个单位选择属性都会收到通知
    pub fn set_distance_units(&self, units: Units) {
        if self.distance_units() != units {
            self.select_units(units);
        }
    }

    pub fn hide_other_maps(&self) -> bool {
        self.controller.settings().read(|s| s.tasks.hide_other_maps)
    }

    pub fn set_hide_other_maps(&self, value: bool) {
        let changed = self.controller.settings().write(|s| {
            let changed = s.tasks.hide_other_maps != value;
            s.tasks.hide_other_maps = value;
            changed
        });
        if changed {
            self.controller
                .event_bus()
                .raise_property_changed(ENTITY, "hide_other_maps");
        }
    }

    // ========== 命令 ==========

    /// 打开新建任务对话框,以玩家当前位置作为模板;返回是否添加了任务
    pub fn add_new_task(&self) -> Result<bool> {
        info!("显示新建任务对话框");
        let mut template = PlayerTask::new("");
        if let Some(position) = self.controller.last_position() {
            template = template.at(position.map_id, position.position);
        }
        match self.task_editor.edit_new_task(template) {
            Some(task) => self.controller.add_or_update_task(task).map(|_| true),
            None => Ok(false),
        }
    }

    /// 删除全部任务
    pub fn delete_all(&self) -> usize {
        info!("删除全部任务");
        self.controller.delete_all_tasks()
    }

    /// 选择文件并替换当前任务列表;取消对话框时返回 false
    pub async fn load_tasks(&self) -> Result<bool> {
        info!("加载任务");
        let Some(path) = self.file_dialogs.open_file(&TASK_FILE_FILTER) else {
            return Ok(false);
        };
        self.controller.load_tasks_file(&path).await?;
        Ok(true)
    }

    /// 选择文件并合并进当前任务列表
    pub async fn import_tasks(&self) -> Result<bool> {
        info!("导入任务");
        let Some(path) = self.file_dialogs.open_file(&TASK_FILE_FILTER) else {
            return Ok(false);
        };
        self.controller.import_tasks(&path).await?;
        Ok(true)
    }

    /// 选择保存位置并导出任务列表
    pub async fn export_tasks(&self) -> Result<bool> {
        info!("导出任务");
        let Some(mut path) = self.file_dialogs.save_file(&TASK_FILE_FILTER) else {
            return Ok(false);
        };
        if path.extension().is_none() {
            path.set_extension(TASK_FILE_FILTER.extension);
        }
        self.controller.export_tasks(&path).await?;
        Ok(true)
    }

    fn distance_units(&self) -> Units {
        self.controller.settings().read(|s| s.tasks.distance_units)
    }

    fn sort_property(&self) -> String {
        self.controller
            .settings()
            .read(|s| s.tasks.sort_property.clone())
    }

    fn select_units(&self, units: Units) {
        self.controller
            .settings()
            .write(|s| s.tasks.distance_units = units);
        let bus = self.controller.event_bus();
        bus.raise_property_changed(ENTITY, "is_feet_selected");
        bus.raise_property_changed(ENTITY, "is_meters_selected");
    }

    /// 替换视图的排序并写入设置,同时通知所有排序选择属性
    fn on_sorting_property_changed(&self, property: &str, direction: SortDirection) {
        self.player_tasks.set_sort(property, direction);
        self.controller.settings().write(|s| {
            s.tasks.sort_property = property.to_string();
            s.tasks.sort_direction = direction;
        });
        let bus = self.controller.event_bus();
        bus.raise_property_changed(ENTITY, "sort_by_name");
        bus.raise_property_changed(ENTITY, "sort_by_distance");
    }
}
