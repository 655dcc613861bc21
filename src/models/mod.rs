// 数据模型模块 - 定义所有的数据结构
//
// 这里只有纯数据记录,不包含行为;派生状态由视图模型结合设置计算

pub mod coins;
pub mod commerce;
pub mod dungeon;
pub mod task;
pub mod wvw;

use serde::{Deserialize, Serialize};

pub use coins::{Coins, RewardSplit};
pub use commerce::{ItemPrice, PriceLimitKind, PriceWatch};
pub use dungeon::DungeonPath;
pub use task::PlayerTask;
pub use wvw::{ObjectiveType, TeamColor, WvWMatch, WvWObjective, WvWTeam};

/// 每英尺包含的地图单位(游戏地图单位为英寸)
const MAP_UNITS_PER_FOOT: f64 = 12.0;
/// 每个地图单位对应的米数
const METERS_PER_MAP_UNIT: f64 = 0.0254;

/// 距离显示单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Units {
    #[default]
    Feet,
    Meters,
}

impl Units {
    /// 将地图单位换算为当前显示单位
    pub fn from_map_units(&self, map_units: f64) -> f64 {
        match self {
            Self::Feet => map_units / MAP_UNITS_PER_FOOT,
            Self::Meters => map_units * METERS_PER_MAP_UNIT,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Feet => "ft",
            Self::Meters => "m",
        }
    }
}

/// WvW 地图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WvWMap {
    /// 未知地图,作为覆盖值时表示不覆盖
    #[default]
    Unknown,
    EternalBattlegrounds,
    RedBorderlands,
    GreenBorderlands,
    BlueBorderlands,
}

impl WvWMap {
    /// 由 API 中的地图类型字符串解析
    pub fn from_api_type(map_type: &str) -> Self {
        match map_type {
            "Center" => Self::EternalBattlegrounds,
            "RedHome" => Self::RedBorderlands,
            "GreenHome" => Self::GreenBorderlands,
            "BlueHome" => Self::BlueBorderlands,
            _ => Self::Unknown,
        }
    }

    /// 由游戏内地图ID解析
    pub fn from_map_id(map_id: i32) -> Self {
        match map_id {
            38 => Self::EternalBattlegrounds,
            1099 => Self::RedBorderlands,
            95 => Self::GreenBorderlands,
            96 => Self::BlueBorderlands,
            _ => Self::Unknown,
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// 三维坐标(地图单位)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// 玩家当前位置快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPosition {
    pub map_id: i32,
    pub position: Point,
}
