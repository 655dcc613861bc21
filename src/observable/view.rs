// 集合视图 - 对可观察集合做非破坏性的排序/过滤投影
//
// 视图每次读取都基于源集合的最新内容计算,从不修改源集合的顺序或成员

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ObservableCollection, Tracked};
use crate::models::SortDirection;

/// 条目在某个属性上的排序键
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Text(String),
    Number(f64),
    /// 没有值的条目总是排在最后
    Missing,
}

impl SortKey {
    fn compare(&self, other: &SortKey, direction: SortDirection) -> Ordering {
        let ordering = match (self, other) {
            (SortKey::Missing, SortKey::Missing) => return Ordering::Equal,
            (SortKey::Missing, _) => return Ordering::Greater,
            (_, SortKey::Missing) => return Ordering::Less,
            (SortKey::Text(a), SortKey::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        };
        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// 可排序的条目
pub trait Sortable {
    fn sort_key(&self, property: &str) -> SortKey;
}

/// 排序描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortDescription {
    pub property: String,
    pub direction: SortDirection,
}

impl SortDescription {
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }
}

type Filter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// 自动刷新的集合视图
pub struct CollectionView<T: Tracked + Sortable> {
    source: Arc<ObservableCollection<T>>,
    sort_descriptions: Mutex<Vec<SortDescription>>,
    filter: Mutex<Option<Filter<T>>>,
}

impl<T: Tracked + Sortable> CollectionView<T> {
    pub fn new(source: Arc<ObservableCollection<T>>) -> Self {
        Self {
            source,
            sort_descriptions: Mutex::new(Vec::new()),
            filter: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &Arc<ObservableCollection<T>> {
        &self.source
    }

    pub fn sort_descriptions(&self) -> Vec<SortDescription> {
        lock(&self.sort_descriptions).clone()
    }

    pub fn clear_sort(&self) {
        lock(&self.sort_descriptions).clear();
    }

    /// 追加一个次级排序
    pub fn add_sort(&self, description: SortDescription) {
        lock(&self.sort_descriptions).push(description);
    }

    /// 清除旧的排序后设置唯一的排序键
    pub fn set_sort(&self, property: impl Into<String>, direction: SortDirection) {
        let mut descriptions = lock(&self.sort_descriptions);
        descriptions.clear();
        descriptions.push(SortDescription::new(property, direction));
    }

    pub fn set_filter(&self, filter: impl Fn(&T) -> bool + Send + Sync + 'static) {
        *lock(&self.filter) = Some(Arc::new(filter));
    }

    pub fn clear_filter(&self) {
        *lock(&self.filter) = None;
    }

    /// 按当前排序/过滤规则计算的条目列表
    pub fn items(&self) -> Vec<T> {
        let descriptions = self.sort_descriptions();
        let filter = lock(&self.filter).clone();

        let mut items: Vec<T> = match filter {
            Some(filter) => self
                .source
                .with_items(|all| all.iter().filter(|item| filter(*item)).cloned().collect()),
            None => self.source.snapshot(),
        };

        if !descriptions.is_empty() {
            // 稳定排序,相同键保持源集合中的顺序
            items.sort_by(|a, b| {
                descriptions
                    .iter()
                    .map(|d| {
                        a.sort_key(&d.property)
                            .compare(&b.sort_key(&d.property), d.direction)
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        items
    }

    pub fn keys(&self) -> Vec<T::Key> {
        self.items().iter().map(Tracked::key).collect()
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
