// WvW 视图模型

use chrono::{DateTime, Duration, Utc};

use crate::models::{ObjectiveType, TeamColor, WvWMap, WvWObjective, WvWTeam};
use crate::observable::{SortKey, Sortable, Tracked};

/// 目标点被占领后的保护时间(分钟)
const RIGHTS_OF_INVADER_MINUTES: i64 = 5;

/// 参赛世界
#[derive(Debug, Clone, PartialEq)]
pub struct WvWTeamViewModel {
    team: WvWTeam,
}

impl WvWTeamViewModel {
    pub fn new(team: WvWTeam) -> Self {
        Self { team }
    }

    pub fn world_id(&self) -> i32 {
        self.team.world_id
    }

    pub fn name(&self) -> &str {
        &self.team.name
    }

    pub fn color(&self) -> TeamColor {
        self.team.color
    }

    pub fn score(&self) -> i64 {
        self.team.score
    }
}

impl Tracked for WvWTeamViewModel {
    type Key = i32;
    type Record = WvWTeam;

    fn key(&self) -> i32 {
        self.team.world_id
    }

    fn record_key(record: &WvWTeam) -> i32 {
        record.world_id
    }

    fn update_from(&mut self, record: WvWTeam) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.team.name != record.name {
            fields.push("name");
        }
        if self.team.color != record.color {
            fields.push("color");
        }
        if self.team.score != record.score {
            fields.push("score");
        }
        self.team = record;
        fields
    }
}

/// WvW 目标点
#[derive(Debug, Clone, PartialEq)]
pub struct WvWObjectiveViewModel {
    objective: WvWObjective,
    /// 与玩家的距离(地图单位)
    distance: Option<f64>,
    /// 最近一次易主前的拥有者
    previous_owner: Option<TeamColor>,
}

impl WvWObjectiveViewModel {
    pub fn new(objective: WvWObjective, distance: Option<f64>) -> Self {
        Self {
            objective,
            distance,
            previous_owner: None,
        }
    }

    pub fn objective(&self) -> &WvWObjective {
        &self.objective
    }

    pub fn id(&self) -> &str {
        &self.objective.id
    }

    pub fn name(&self) -> &str {
        &self.objective.name
    }

    pub fn kind(&self) -> ObjectiveType {
        self.objective.kind
    }

    pub fn map(&self) -> WvWMap {
        self.objective.map
    }

    pub fn owner(&self) -> TeamColor {
        self.objective.owner
    }

    pub fn previous_owner(&self) -> Option<TeamColor> {
        self.previous_owner
    }

    pub fn distance(&self) -> Option<f64> {
        self.distance
    }

    /// 保护时间剩余;无翻转时间或已过期时为 None
    pub fn rights_of_invader_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let flipped = self.objective.last_flipped?;
        let remaining = flipped + Duration::minutes(RIGHTS_OF_INVADER_MINUTES) - now;
        (remaining > Duration::zero()).then_some(remaining)
    }
}

impl Tracked for WvWObjectiveViewModel {
    type Key = String;
    type Record = (WvWObjective, Option<f64>);

    fn key(&self) -> String {
        self.objective.id.clone()
    }

    fn record_key(record: &(WvWObjective, Option<f64>)) -> String {
        record.0.id.clone()
    }

    fn update_from(&mut self, (objective, distance): (WvWObjective, Option<f64>)) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.objective.owner != objective.owner {
            self.previous_owner = Some(self.objective.owner);
            fields.extend(["owner", "previous_owner"]);
        }
        if self.objective.claimed_by != objective.claimed_by {
            fields.push("claimed_by");
        }
        if self.objective.last_flipped != objective.last_flipped {
            fields.push("last_flipped");
        }
        if self.objective.name != objective.name {
            fields.push("name");
        }
        if self.distance != distance {
            fields.push("distance");
        }
        self.objective = objective;
        self.distance = distance;
        fields
    }
}

impl Sortable for WvWObjectiveViewModel {
    fn sort_key(&self, property: &str) -> SortKey {
        match property {
            "name" => SortKey::Text(self.objective.name.clone()),
            "distance" => self.distance.map_or(SortKey::Missing, SortKey::Number),
            "points" => SortKey::Number(self.objective.kind.points() as f64),
            _ => SortKey::Missing,
        }
    }
}
