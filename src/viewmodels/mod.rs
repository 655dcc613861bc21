// 视图模型模块
//
// 视图模型包装数据记录和设置引用,对外提供派生属性与命令;
// 属性变更通过事件总线发布,由界面线程自行订阅

pub mod item_price;
pub mod path;
pub mod player_task;
pub mod task_tracker;
pub mod wvw;

pub use item_price::{ItemPriceViewModel, PriceNotificationViewModel};
pub use path::PathViewModel;
pub use player_task::PlayerTaskViewModel;
pub use task_tracker::{FileDialogService, FileFilter, TaskEditorDialog, TaskTrackerViewModel, TASK_FILE_FILTER};
pub use wvw::{WvWObjectiveViewModel, WvWTeamViewModel};
