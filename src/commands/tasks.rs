//! 任务追踪器命令
//!
//! 把 TaskTrackerViewModel 的命令按名称注册，供界面层的按钮和菜单调用

use std::sync::Arc;

use tracing::debug;

use super::CommandSet;
use crate::viewmodels::TaskTrackerViewModel;

pub const ADD_NEW_TASK: &str = "add_new_task";
pub const DELETE_ALL_TASKS: &str = "delete_all";
pub const LOAD_TASKS: &str = "load_tasks";
pub const IMPORT_TASKS: &str = "import_tasks";
pub const EXPORT_TASKS: &str = "export_tasks";

/// 创建任务追踪器的命令集合
pub fn task_tracker_commands(tracker: Arc<TaskTrackerViewModel>) -> CommandSet {
    let mut commands = CommandSet::new();

    let vm = tracker.clone();
    commands.register(ADD_NEW_TASK, move || {
        let vm = vm.clone();
        async move {
            if !vm.add_new_task()? {
                debug!("新建任务已取消");
            }
            Ok(())
        }
    });

    let vm = tracker.clone();
    commands.register(DELETE_ALL_TASKS, move || {
        let vm = vm.clone();
        async move {
            vm.delete_all();
            Ok(())
        }
    });

    let vm = tracker.clone();
    commands.register(LOAD_TASKS, move || {
        let vm = vm.clone();
        async move {
            if !vm.load_tasks().await? {
                debug!("加载任务已取消");
            }
            Ok(())
        }
    });

    let vm = tracker.clone();
    commands.register(IMPORT_TASKS, move || {
        let vm = vm.clone();
        async move {
            if !vm.import_tasks().await? {
                debug!("导入任务已取消");
            }
            Ok(())
        }
    });

    let vm = tracker;
    commands.register(EXPORT_TASKS, move || {
        let vm = vm.clone();
        async move {
            if !vm.export_tasks().await? {
                debug!("导出任务已取消");
            }
            Ok(())
        }
    });

    commands
}
