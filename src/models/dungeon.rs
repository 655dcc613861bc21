// 地下城路线

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 一条地下城路线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonPath {
    pub id: Uuid,
    /// 显示名称,如 "Story", "Path 1"
    pub display_name: String,
    /// 玩家常用的简称
    pub nickname: String,
    /// 通关奖励(小数金币)
    pub gold_reward: f64,
}

impl DungeonPath {
    pub fn new(display_name: impl Into<String>, nickname: impl Into<String>, gold_reward: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            nickname: nickname.into(),
            gold_reward,
        }
    }
}
