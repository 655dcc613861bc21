// 交易所价格视图模型

use chrono::{DateTime, Utc};

use crate::models::{Coins, ItemPrice, PriceLimitKind, PriceWatch};
use crate::observable::{SortKey, Sortable, Tracked};

/// 价格监视条目
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPriceViewModel {
    price: ItemPrice,
    watch: PriceWatch,
    triggered: Vec<PriceLimitKind>,
}

impl ItemPriceViewModel {
    pub fn new(price: ItemPrice, watch: PriceWatch) -> Self {
        let triggered = watch.triggered_limits(&price);
        Self {
            price,
            watch,
            triggered,
        }
    }

    pub fn item_id(&self) -> i32 {
        self.price.item_id
    }

    pub fn name(&self) -> &str {
        if self.price.name.is_empty() {
            &self.watch.name
        } else {
            &self.price.name
        }
    }

    pub fn price(&self) -> &ItemPrice {
        &self.price
    }

    pub fn watch(&self) -> &PriceWatch {
        &self.watch
    }

    pub fn buy_price(&self) -> Coins {
        Coins::from_copper(self.price.buy_price)
    }

    pub fn sell_price(&self) -> Coins {
        Coins::from_copper(self.price.sell_price)
    }

    pub fn triggered_limits(&self) -> &[PriceLimitKind] {
        &self.triggered
    }

    pub fn is_limit_triggered(&self, kind: PriceLimitKind) -> bool {
        self.triggered.contains(&kind)
    }

    /// 触发限制时对应的限制值
    pub fn limit_value(&self, kind: PriceLimitKind) -> Option<i64> {
        match kind {
            PriceLimitKind::BuyAbove => self.watch.buy_upper_limit,
            PriceLimitKind::BuyBelow => self.watch.buy_lower_limit,
            PriceLimitKind::SellAbove => self.watch.sell_upper_limit,
            PriceLimitKind::SellBelow => self.watch.sell_lower_limit,
        }
    }

    /// 触发限制时对应的当前价格
    pub fn current_value(&self, kind: PriceLimitKind) -> i64 {
        match kind {
            PriceLimitKind::BuyAbove | PriceLimitKind::BuyBelow => self.price.buy_price,
            PriceLimitKind::SellAbove | PriceLimitKind::SellBelow => self.price.sell_price,
        }
    }
}

impl Tracked for ItemPriceViewModel {
    type Key = i32;
    type Record = (ItemPrice, PriceWatch);

    fn key(&self) -> i32 {
        self.price.item_id
    }

    fn record_key(record: &(ItemPrice, PriceWatch)) -> i32 {
        record.0.item_id
    }

    fn update_from(&mut self, (price, watch): (ItemPrice, PriceWatch)) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.price.name != price.name {
            fields.push("name");
        }
        if self.price.buy_price != price.buy_price || self.price.buy_quantity != price.buy_quantity {
            fields.push("buy_price");
        }
        if self.price.sell_price != price.sell_price || self.price.sell_quantity != price.sell_quantity {
            fields.push("sell_price");
        }
        if self.watch != watch {
            fields.push("watch");
        }

        let triggered = watch.triggered_limits(&price);
        if triggered != self.triggered {
            fields.push("triggered_limits");
        }
        self.price = price;
        self.watch = watch;
        self.triggered = triggered;
        fields
    }
}

impl Sortable for ItemPriceViewModel {
    fn sort_key(&self, property: &str) -> SortKey {
        match property {
            "name" => SortKey::Text(self.name().to_string()),
            "buy_price" => SortKey::Number(self.price.buy_price as f64),
            "sell_price" => SortKey::Number(self.price.sell_price as f64),
            _ => SortKey::Missing,
        }
    }
}

/// 价格提醒
#[derive(Debug, Clone, PartialEq)]
pub struct PriceNotificationViewModel {
    pub item_id: i32,
    pub item_name: String,
    pub kind: PriceLimitKind,
    pub price: i64,
    pub limit: i64,
    pub raised_at: DateTime<Utc>,
}

impl PriceNotificationViewModel {
    pub fn price_coins(&self) -> Coins {
        Coins::from_copper(self.price)
    }

    pub fn message(&self) -> String {
        format!(
            "{}: {} ({} / 限制 {})",
            self.item_name,
            self.kind.label(),
            Coins::from_copper(self.price),
            Coins::from_copper(self.limit)
        )
    }
}

impl Tracked for PriceNotificationViewModel {
    type Key = (i32, PriceLimitKind);
    type Record = PriceNotificationViewModel;

    fn key(&self) -> (i32, PriceLimitKind) {
        (self.item_id, self.kind)
    }

    fn record_key(record: &PriceNotificationViewModel) -> (i32, PriceLimitKind) {
        (record.item_id, record.kind)
    }

    fn update_from(&mut self, record: PriceNotificationViewModel) -> Vec<&'static str> {
        if self.price == record.price {
            return Vec::new();
        }
        self.price = record.price;
        vec!["price"]
    }
}
