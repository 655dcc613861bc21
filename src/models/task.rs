// 玩家任务

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Point;

/// 玩家自定义任务
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTask {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// 每日任务会在每日重置时清除完成状态
    #[serde(default)]
    pub is_daily: bool,
    /// 可完成的任务才显示完成勾选框
    #[serde(default = "default_true")]
    pub is_completable: bool,
    /// 任务奖励(小数金币)
    #[serde(default)]
    pub reward: f64,
    #[serde(default)]
    pub map_id: Option<i32>,
    #[serde(default)]
    pub location: Option<Point>,
    /// 路点聊天码,例如 `[&BDgAAAA=]`
    #[serde(default)]
    pub waypoint_code: Option<String>,
}

fn default_true() -> bool {
    true
}

impl PlayerTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            category: String::new(),
            is_daily: false,
            is_completable: true,
            reward: 0.0,
            map_id: None,
            location: None,
            waypoint_code: None,
        }
    }

    pub fn at(mut self, map_id: i32, location: Point) -> Self {
        self.map_id = Some(map_id);
        self.location = Some(location);
        self
    }
}
