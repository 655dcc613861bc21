// WvW 比赛、队伍与目标点

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Point, WvWMap};

/// 队伍颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TeamColor {
    Red,
    Green,
    Blue,
    #[default]
    Neutral,
}

impl TeamColor {
    pub fn from_api(owner: &str) -> Self {
        match owner {
            "Red" => Self::Red,
            "Green" => Self::Green,
            "Blue" => Self::Blue,
            _ => Self::Neutral,
        }
    }
}

/// 目标点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveType {
    Castle,
    Keep,
    Tower,
    Camp,
    Other,
}

impl ObjectiveType {
    pub fn from_api(kind: &str) -> Self {
        match kind {
            "Castle" => Self::Castle,
            "Keep" => Self::Keep,
            "Tower" => Self::Tower,
            "Camp" => Self::Camp,
            _ => Self::Other,
        }
    }

    /// 每次结算的得分
    pub fn points(&self) -> i32 {
        match self {
            Self::Castle => 12,
            Self::Keep => 8,
            Self::Tower => 4,
            Self::Camp => 2,
            Self::Other => 0,
        }
    }
}

/// 参与比赛的一个世界
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WvWTeam {
    pub world_id: i32,
    pub name: String,
    pub color: TeamColor,
    pub score: i64,
}

/// WvW 目标点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WvWObjective {
    /// API 中的目标点ID,例如 "38-6"
    pub id: String,
    pub name: String,
    pub kind: ObjectiveType,
    pub map: WvWMap,
    pub owner: TeamColor,
    pub claimed_by: Option<String>,
    pub last_flipped: Option<DateTime<Utc>>,
    pub location: Option<Point>,
}

/// 一次比赛查询的结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WvWMatch {
    pub match_id: String,
    pub teams: Vec<WvWTeam>,
    pub objectives: Vec<WvWObjective>,
}
