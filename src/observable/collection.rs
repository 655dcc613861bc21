// 可观察集合实现
//
// 所有写操作都在同一把写锁内完成,通知在释放锁之后发出,
// 读者不会看到只更新了一半的集合

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;
use tracing::{debug, trace};

/// 可放入可观察集合的条目
pub trait Tracked: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;
    /// 轮询返回的原始记录
    type Record: Send;

    fn key(&self) -> Self::Key;

    fn record_key(record: &Self::Record) -> Self::Key;

    /// 用新记录原地更新,返回实际变化的字段名
    fn update_from(&mut self, record: Self::Record) -> Vec<&'static str>;
}

/// 集合变更通知
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionChange<K> {
    Added { key: K, index: usize },
    Removed { key: K, index: usize },
    Updated { key: K, fields: Vec<&'static str> },
    /// 整体内容被替换
    Reset,
}

/// 一次对账的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.updated == 0
    }
}

/// 可观察集合
pub struct ObservableCollection<T: Tracked> {
    name: &'static str,
    items: RwLock<Vec<T>>,
    changes: broadcast::Sender<CollectionChange<T::Key>>,
}

impl<T: Tracked> ObservableCollection<T> {
    pub fn new(name: &'static str) -> Self {
        let (changes, _) = broadcast::channel(512);
        Self {
            name,
            items: RwLock::new(Vec::new()),
            changes,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 订阅变更通知,丢弃接收器即取消订阅
    pub fn subscribe(&self) -> broadcast::Receiver<CollectionChange<T::Key>> {
        self.changes.subscribe()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// 当前内容的快照
    pub fn snapshot(&self) -> Vec<T> {
        self.read().clone()
    }

    pub fn keys(&self) -> Vec<T::Key> {
        self.read().iter().map(Tracked::key).collect()
    }

    pub fn get(&self, key: &T::Key) -> Option<T> {
        self.read().iter().find(|item| &item.key() == key).cloned()
    }

    pub fn contains(&self, key: &T::Key) -> bool {
        self.read().iter().any(|item| &item.key() == key)
    }

    /// 在读锁内访问全部条目
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.read())
    }

    // ========== 以下写操作仅供所属控制器使用 ==========

    /// 追加条目,键已存在时返回 false
    pub(crate) fn push(&self, item: T) -> bool {
        let key = item.key();
        let index = {
            let mut items = self.write();
            if items.iter().any(|existing| existing.key() == key) {
                return false;
            }
            items.push(item);
            items.len() - 1
        };
        self.publish(vec![CollectionChange::Added { key, index }]);
        true
    }

    pub(crate) fn remove(&self, key: &T::Key) -> Option<T> {
        let (removed, index) = {
            let mut items = self.write();
            let index = items.iter().position(|item| &item.key() == key)?;
            (items.remove(index), index)
        };
        self.publish(vec![CollectionChange::Removed {
            key: key.clone(),
            index,
        }]);
        Some(removed)
    }

    /// 清空集合,返回移除的条目数
    pub(crate) fn clear(&self) -> usize {
        let count = {
            let mut items = self.write();
            let count = items.len();
            items.clear();
            count
        };
        if count > 0 {
            self.publish(vec![CollectionChange::Reset]);
        }
        count
    }

    /// 替换全部内容(集合实例本身不变)
    pub(crate) fn replace_all(&self, replacement: Vec<T>) {
        *self.write() = replacement;
        self.publish(vec![CollectionChange::Reset]);
    }

    /// 原地修改单个条目
    pub(crate) fn update(&self, key: &T::Key, f: impl FnOnce(&mut T) -> Vec<&'static str>) -> bool {
        let fields = {
            let mut items = self.write();
            let Some(item) = items.iter_mut().find(|item| &item.key() == key) else {
                return false;
            };
            f(item)
        };
        if !fields.is_empty() {
            self.publish(vec![CollectionChange::Updated {
                key: key.clone(),
                fields,
            }]);
        }
        true
    }

    /// 原地修改全部条目,返回发生变化的条目数
    pub(crate) fn update_all(&self, mut f: impl FnMut(&mut T) -> Vec<&'static str>) -> usize {
        let changes: Vec<_> = {
            let mut items = self.write();
            items
                .iter_mut()
                .filter_map(|item| {
                    let fields = f(item);
                    (!fields.is_empty()).then(|| CollectionChange::Updated {
                        key: item.key(),
                        fields,
                    })
                })
                .collect()
        };
        let count = changes.len();
        self.publish(changes);
        count
    }

    /// 与最新轮询结果对账:删除过期条目,原地更新已有条目,按顺序追加新条目
    pub(crate) fn reconcile(
        &self,
        fresh: Vec<T::Record>,
        create: impl FnMut(T::Record) -> T,
    ) -> ReconcileSummary {
        let fresh_keys: HashSet<T::Key> = fresh.iter().map(T::record_key).collect();
        let (summary, changes) = {
            let mut items = self.write();
            let mut summary = ReconcileSummary::default();
            let mut changes = Vec::new();

            let mut index = 0;
            while index < items.len() {
                let key = items[index].key();
                if fresh_keys.contains(&key) {
                    index += 1;
                } else {
                    items.remove(index);
                    summary.removed += 1;
                    changes.push(CollectionChange::Removed { key, index });
                }
            }

            Self::merge_locked(&mut items, fresh, create, &mut summary, &mut changes);
            (summary, changes)
        };

        if !summary.is_empty() {
            debug!(
                "{} 对账完成: 新增 {}, 删除 {}, 更新 {}",
                self.name, summary.added, summary.removed, summary.updated
            );
        }
        self.publish(changes);
        summary
    }

    /// 合并记录:已有键原地更新,新键追加,不删除任何条目
    pub(crate) fn upsert(
        &self,
        records: Vec<T::Record>,
        create: impl FnMut(T::Record) -> T,
    ) -> ReconcileSummary {
        let (summary, changes) = {
            let mut items = self.write();
            let mut summary = ReconcileSummary::default();
            let mut changes = Vec::new();
            Self::merge_locked(&mut items, records, create, &mut summary, &mut changes);
            (summary, changes)
        };
        self.publish(changes);
        summary
    }

    fn merge_locked(
        items: &mut Vec<T>,
        records: Vec<T::Record>,
        mut create: impl FnMut(T::Record) -> T,
        summary: &mut ReconcileSummary,
        changes: &mut Vec<CollectionChange<T::Key>>,
    ) {
        let mut positions: HashMap<T::Key, usize> = items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.key(), index))
            .collect();

        for record in records {
            let key = T::record_key(&record);
            if let Some(index) = positions.get(&key).copied() {
                let fields = items[index].update_from(record);
                if !fields.is_empty() {
                    summary.updated += 1;
                    changes.push(CollectionChange::Updated { key, fields });
                }
            } else {
                items.push(create(record));
                let index = items.len() - 1;
                positions.insert(key.clone(), index);
                summary.added += 1;
                changes.push(CollectionChange::Added { key, index });
            }
        }
    }

    fn publish(&self, changes: Vec<CollectionChange<T::Key>>) {
        for change in changes {
            if self.changes.send(change).is_err() {
                trace!("{} 变更已发布但无订阅者", self.name);
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.items.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.items.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
