// 交易所价格与价格监视

use serde::{Deserialize, Serialize};

/// 一个物品的当前交易所价格(铜币)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPrice {
    pub item_id: i32,
    pub name: String,
    /// 最高求购价
    pub buy_price: i64,
    pub buy_quantity: i64,
    /// 最低出售价
    pub sell_price: i64,
    pub sell_quantity: i64,
}

/// 价格监视限制的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceLimitKind {
    BuyAbove,
    BuyBelow,
    SellAbove,
    SellBelow,
}

impl PriceLimitKind {
    pub const ALL: [PriceLimitKind; 4] = [
        PriceLimitKind::BuyAbove,
        PriceLimitKind::BuyBelow,
        PriceLimitKind::SellAbove,
        PriceLimitKind::SellBelow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::BuyAbove => "求购价高于上限",
            Self::BuyBelow => "求购价低于下限",
            Self::SellAbove => "出售价高于上限",
            Self::SellBelow => "出售价低于下限",
        }
    }
}

/// 用户配置的价格监视
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceWatch {
    pub item_id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub buy_upper_limit: Option<i64>,
    #[serde(default)]
    pub buy_lower_limit: Option<i64>,
    #[serde(default)]
    pub sell_upper_limit: Option<i64>,
    #[serde(default)]
    pub sell_lower_limit: Option<i64>,
}

impl PriceWatch {
    pub fn new(item_id: i32) -> Self {
        Self {
            item_id,
            name: String::new(),
            buy_upper_limit: None,
            buy_lower_limit: None,
            sell_upper_limit: None,
            sell_lower_limit: None,
        }
    }

    /// 返回当前价格触发的全部限制
    pub fn triggered_limits(&self, price: &ItemPrice) -> Vec<PriceLimitKind> {
        PriceLimitKind::ALL
            .into_iter()
            .filter(|kind| self.is_triggered(*kind, price))
            .collect()
    }

    pub fn is_triggered(&self, kind: PriceLimitKind, price: &ItemPrice) -> bool {
        match kind {
            PriceLimitKind::BuyAbove => self.buy_upper_limit.is_some_and(|l| price.buy_price > l),
            PriceLimitKind::BuyBelow => self.buy_lower_limit.is_some_and(|l| price.buy_price < l),
            PriceLimitKind::SellAbove => self.sell_upper_limit.is_some_and(|l| price.sell_price > l),
            PriceLimitKind::SellBelow => self.sell_lower_limit.is_some_and(|l| price.sell_price < l),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(buy: i64, sell: i64) -> ItemPrice {
        ItemPrice {
            item_id: 19721,
            name: "Glob of Ectoplasm".into(),
            buy_price: buy,
            buy_quantity: 10,
            sell_price: sell,
            sell_quantity: 10,
        }
    }

    #[test]
    fn test_triggered_limits() {
        let mut watch = PriceWatch::new(19721);
        assert!(watch.triggered_limits(&price(100, 200)).is_empty());

        watch.buy_upper_limit = Some(150);
        watch.sell_lower_limit = Some(250);
        assert_eq!(
            watch.triggered_limits(&price(160, 200)),
            vec![PriceLimitKind::BuyAbove, PriceLimitKind::SellBelow]
        );
        assert!(watch.triggered_limits(&price(150, 250)).is_empty());
    }
}
