// 可观察集合 - 有序容器 + 变更通知
//
// 集合成员只能由所属控制器修改;视图模型只能读取或在其上做排序/过滤投影

pub mod collection;
pub mod view;

pub use collection::{CollectionChange, ObservableCollection, ReconcileSummary, Tracked};
pub use view::{CollectionView, SortDescription, SortKey, Sortable};
