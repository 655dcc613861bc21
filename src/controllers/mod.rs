// 控制器模块 - 后台轮询并维护各个领域的可观察集合

pub mod commerce;
pub mod refresh;
pub mod sources;
pub mod tasks;
pub mod wvw;

use std::sync::{Mutex, MutexGuard};

pub use commerce::CommerceController;
pub use refresh::{RefreshLoop, Refreshable};
pub use sources::{CommerceSource, PositionSource, SharedPosition, WvWSource};
pub use tasks::PlayerTasksController;
pub use wvw::WvWController;

/// 获取互斥锁,锁被污染时继续使用其中的数据
pub(crate) fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
