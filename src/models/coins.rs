// 货币拆分 - 金/银/铜

use serde::{Deserialize, Serialize};

/// 小数金币奖励拆分为金、银两部分
///
/// `silver` 始终落在 `[0, 100)`;四舍五入得到 100 时进位到金币
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardSplit {
    pub gold: i64,
    pub silver: i64,
}

impl RewardSplit {
    /// 按 `floor(R)` 与 `round(frac(R) * 100)` 拆分
    ///
    /// 负数、NaN、无穷大视为无效输入,按 0 处理
    pub fn from_gold(reward: f64) -> Self {
        if !reward.is_finite() || reward <= 0.0 {
            return Self::default();
        }

        let whole = reward.floor();
        let mut gold = whole as i64;
        let mut silver = ((reward - whole) * 100.0).round() as i64;
        if silver >= 100 {
            gold += silver / 100;
            silver %= 100;
        }

        Self { gold, silver }
    }

    /// 重新合成小数金币
    pub fn as_gold(&self) -> f64 {
        self.gold as f64 + self.silver as f64 / 100.0
    }
}

/// 以铜币为单位的价格拆分(1 金 = 100 银 = 10000 铜)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coins {
    pub gold: i64,
    pub silver: i64,
    pub copper: i64,
}

impl Coins {
    pub fn from_copper(total: i64) -> Self {
        let total = total.max(0);
        Self {
            gold: total / 10_000,
            silver: (total % 10_000) / 100,
            copper: total % 100,
        }
    }

    pub fn to_copper(&self) -> i64 {
        self.gold * 10_000 + self.silver * 100 + self.copper
    }
}

impl std::fmt::Display for Coins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.gold, self.silver) {
            (0, 0) => write!(f, "{}c", self.copper),
            (0, s) => write!(f, "{}s {}c", s, self.copper),
            (g, s) => write!(f, "{}g {}s {}c", g, s, self.copper),
        }
    }
}
