// 交易所控制器 - 轮询价格监视中的物品价格并生成价格提醒

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::refresh::{Refreshable, RefreshLoop};
use super::sources::CommerceSource;
use super::lock;
use crate::error::{CompanionError, Result};
use crate::event_bus::{AppEvent, EventBus};
use crate::models::{ItemPrice, PriceLimitKind, PriceWatch};
use crate::observable::{ObservableCollection, Tracked};
use crate::settings::{CommerceUserData, SettingsStore};
use crate::viewmodels::{ItemPriceViewModel, PriceNotificationViewModel};

const CONTROLLER_NAME: &str = "commerce";

/// 交易所控制器
pub struct CommerceController {
    inner: Arc<CommerceInner>,
    refresh: RefreshLoop,
}

struct CommerceInner {
    source: Arc<dyn CommerceSource>,
    settings: Arc<SettingsStore>,
    event_bus: Arc<EventBus>,
    item_prices: Arc<ObservableCollection<ItemPriceViewModel>>,
    price_notifications: Arc<ObservableCollection<PriceNotificationViewModel>>,
    /// 轮询对账与用户操作互斥
    write_lock: Mutex<()>,
}

impl CommerceController {
    pub fn new(
        source: Arc<dyn CommerceSource>,
        settings: Arc<SettingsStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let interval_ms = settings.read(|s| s.commerce.refresh_interval_ms);
        let refresh = RefreshLoop::new(CONTROLLER_NAME, interval_ms, event_bus.clone());
        let inner = Arc::new(CommerceInner {
            source,
            settings,
            event_bus,
            item_prices: Arc::new(ObservableCollection::new("item_prices")),
            price_notifications: Arc::new(ObservableCollection::new("price_notifications")),
            write_lock: Mutex::new(()),
        });
        Self { inner, refresh }
    }

    pub fn refresh_interval(&self) -> u64 {
        self.refresh.refresh_interval()
    }

    /// 修改刷新间隔并写入设置;无效值被拒绝且保留原值
    pub fn set_refresh_interval(&self, interval_ms: u64) -> Result<()> {
        self.refresh.set_refresh_interval(interval_ms)?;
        self.inner
            .settings
            .write(|s| s.commerce.refresh_interval_ms = interval_ms);
        Ok(())
    }

    /// 交易所相关的用户设置
    pub fn user_data(&self) -> CommerceUserData {
        self.inner.settings.read(|s| s.commerce.clone())
    }

    pub fn item_prices(&self) -> &Arc<ObservableCollection<ItemPriceViewModel>> {
        &self.inner.item_prices
    }

    pub fn price_notifications(&self) -> &Arc<ObservableCollection<PriceNotificationViewModel>> {
        &self.inner.price_notifications
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

    /// 添加或替换价格监视
    pub fn add_price_watch(&self, watch: PriceWatch) -> Result<()> {
        if watch.item_id <= 0 {
            return Err(CompanionError::Validation(format!(
                "无效的物品ID: {}",
                watch.item_id
            )));
        }
        let limits = [
            watch.buy_upper_limit,
            watch.buy_lower_limit,
            watch.sell_upper_limit,
            watch.sell_lower_limit,
        ];
        if limits.iter().flatten().any(|limit| *limit < 0) {
            return Err(CompanionError::Validation("价格限制不能为负数".to_string()));
        }

        let _guard = lock(&self.inner.write_lock);
        self.inner.settings.write(|s| {
            let watches = &mut s.commerce.price_watches;
            match watches.iter_mut().find(|w| w.item_id == watch.item_id) {
                Some(existing) => *existing = watch.clone(),
                None => watches.push(watch.clone()),
            }
        });
        self.inner.item_prices.update(&watch.item_id, |vm| {
            let price = vm.price().clone();
            vm.update_from((price, watch.clone()))
        });
        info!("价格监视已保存: {}", watch.item_id);
        Ok(())
    }

    /// 删除价格监视及其价格条目和提醒
    pub fn remove_price_watch(&self, item_id: i32) -> bool {
        let _guard = lock(&self.inner.write_lock);
        let removed = self.inner.settings.write(|s| {
            let before = s.commerce.price_watches.len();
            s.commerce.price_watches.retain(|w| w.item_id != item_id);
            before != s.commerce.price_watches.len()
        });
        if removed {
            self.inner.item_prices.remove(&item_id);
            for kind in PriceLimitKind::ALL {
                self.inner.price_notifications.remove(&(item_id, kind));
            }
            info!("价格监视已删除: {}", item_id);
        }
        removed
    }

    /// 关闭一条价格提醒
    pub fn dismiss_notification(&self, key: (i32, PriceLimitKind)) -> bool {
        let _guard = lock(&self.inner.write_lock);
        self.inner.price_notifications.remove(&key).is_some()
    }
}

#[async_trait]
impl Refreshable for CommerceInner {
    type Snapshot = Vec<ItemPrice>;

    fn name(&self) -> &'static str {
        CONTROLLER_NAME
    }

    async fn fetch(&self) -> Result<Vec<ItemPrice>> {
        let item_ids: Vec<i32> = self
            .settings
            .read(|s| s.commerce.price_watches.iter().map(|w| w.item_id).collect());
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("获取 {} 个物品的价格", item_ids.len());
        self.source.fetch_prices(&item_ids).await
    }

    fn apply(&self, prices: Vec<ItemPrice>) {
        let _guard = lock(&self.write_lock);
        let (watches, notifications_enabled) = self.settings.read(|s| {
            let watches: HashMap<i32, PriceWatch> = s
                .commerce
                .price_watches
                .iter()
                .map(|w| (w.item_id, w.clone()))
                .collect();
            (watches, s.commerce.notifications_enabled)
        });

        // 轮询期间被删除的监视不再显示
        let records: Vec<(ItemPrice, PriceWatch)> = prices
            .into_iter()
            .filter_map(|price| {
                let watch = watches.get(&price.item_id)?.clone();
                Some((price, watch))
            })
            .collect();
        self.item_prices
            .reconcile(records, |(price, watch)| ItemPriceViewModel::new(price, watch));

        if notifications_enabled {
            self.raise_notifications();
        }
    }
}

impl CommerceInner {
    /// 为新触发的限制添加提醒;同一物品同一限制在关闭前只提醒一次
    fn raise_notifications(&self) {
        let triggered: Vec<PriceNotificationViewModel> = self.item_prices.with_items(|items| {
            items
                .iter()
                .flat_map(|vm| {
                    vm.triggered_limits().iter().map(move |kind| PriceNotificationViewModel {
                        item_id: vm.item_id(),
                        item_name: vm.name().to_string(),
                        kind: *kind,
                        price: vm.current_value(*kind),
                        limit: vm.limit_value(*kind).unwrap_or_default(),
                        raised_at: Utc::now(),
                    })
                })
                .collect()
        });

        for notification in triggered {
            let (item_id, kind) = (notification.item_id, notification.kind);
            if self.price_notifications.contains(&(item_id, kind)) {
                continue;
            }
            info!("价格提醒: {}", notification.message());
            self.price_notifications.push(notification);
            self.event_bus
                .publish(AppEvent::PriceNotification { item_id, kind });
        }
    }
}
