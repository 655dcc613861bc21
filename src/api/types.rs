// GW2 API 响应结构及到领域模型的转换

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{ItemPrice, ObjectiveType, TeamColor, WvWMap, WvWMatch, WvWObjective, WvWTeam};

/// /commerce/prices 的单条记录
#[derive(Debug, Deserialize)]
pub struct PriceDto {
    pub id: i32,
    pub buys: PriceLevel,
    pub sells: PriceLevel,
}

#[derive(Debug, Deserialize)]
pub struct PriceLevel {
    pub quantity: i64,
    pub unit_price: i64,
}

/// /items、/worlds、/wvw/objectives 共用的名称记录
#[derive(Debug, Deserialize)]
pub struct NamedDto<K> {
    pub id: K,
    pub name: String,
}

/// 红绿蓝三方的值
#[derive(Debug, Deserialize, Default)]
pub struct ColorMap<T> {
    pub red: T,
    pub blue: T,
    pub green: T,
}

/// /wvw/matches 的响应
#[derive(Debug, Deserialize)]
pub struct MatchDto {
    pub id: String,
    pub worlds: ColorMap<i32>,
    #[serde(default)]
    pub scores: ColorMap<i64>,
    #[serde(default)]
    pub maps: Vec<MatchMapDto>,
}

#[derive(Debug, Deserialize)]
pub struct MatchMapDto {
    pub id: i32,
    #[serde(rename = "type")]
    pub map_type: String,
    #[serde(default)]
    pub objectives: Vec<MatchObjectiveDto>,
}

#[derive(Debug, Deserialize)]
pub struct MatchObjectiveDto {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub owner: String,
    #[serde(default)]
    pub last_flipped: Option<DateTime<Utc>>,
    #[serde(default)]
    pub claimed_by: Option<String>,
}

/// 合并价格与物品名称,缺少名称时留空
pub fn to_item_prices(prices: Vec<PriceDto>, names: &HashMap<i32, String>) -> Vec<ItemPrice> {
    prices
        .into_iter()
        .map(|dto| ItemPrice {
            item_id: dto.id,
            name: names.get(&dto.id).cloned().unwrap_or_default(),
            buy_price: dto.buys.unit_price,
            buy_quantity: dto.buys.quantity,
            sell_price: dto.sells.unit_price,
            sell_quantity: dto.sells.quantity,
        })
        .collect()
}

impl MatchDto {
    /// 参赛三方的世界ID
    pub fn world_ids(&self) -> [i32; 3] {
        [self.worlds.red, self.worlds.green, self.worlds.blue]
    }

    /// 全部目标点ID
    pub fn objective_ids(&self) -> Vec<String> {
        self.maps
            .iter()
            .flat_map(|map| map.objectives.iter().map(|o| o.id.clone()))
            .collect()
    }

    /// 转换为领域模型;名称查不到时使用ID
    pub fn into_match(
        self,
        world_names: &HashMap<i32, String>,
        objective_names: &HashMap<String, String>,
    ) -> WvWMatch {
        let team = |world_id: i32, color: TeamColor, score: i64| WvWTeam {
            world_id,
            name: world_names
                .get(&world_id)
                .cloned()
                .unwrap_or_else(|| format!("World {}", world_id)),
            color,
            score,
        };
        let teams = vec![
            team(self.worlds.red, TeamColor::Red, self.scores.red),
            team(self.worlds.green, TeamColor::Green, self.scores.green),
            team(self.worlds.blue, TeamColor::Blue, self.scores.blue),
        ];

        let objectives = self
            .maps
            .into_iter()
            .flat_map(|map| {
                let wvw_map = match WvWMap::from_api_type(&map.map_type) {
                    WvWMap::Unknown => WvWMap::from_map_id(map.id),
                    known => known,
                };
                map.objectives.into_iter().map(move |o| (wvw_map, o))
            })
            .map(|(map, o)| WvWObjective {
                name: objective_names.get(&o.id).cloned().unwrap_or_else(|| o.id.clone()),
                id: o.id,
                kind: ObjectiveType::from_api(&o.kind),
                map,
                owner: TeamColor::from_api(&o.owner),
                claimed_by: o.claimed_by,
                last_flipped: o.last_flipped,
                location: None,
            })
            .collect();

        WvWMatch {
            match_id: self.id,
            teams,
            objectives,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCH_JSON: &str = r#"{
        "id": "1-4",
        "start_time": "2024-05-03T18:00:00Z",
        "worlds": { "red": 1008, "blue": 1003, "green": 1010 },
        "scores": { "red": 1200, "blue": 900, "green": 1500 },
        "maps": [
            {
                "id": 38,
                "type": "Center",
                "objectives": [
                    {
                        "id": "38-6",
                        "type": "Castle",
                        "owner": "Green",
                        "last_flipped": "2024-05-04T10:15:00Z",
                        "claimed_by": "A1B2C3",
                        "points_tick": 12
                    },
                    { "id": "38-3", "type": "Camp", "owner": "Neutral", "last_flipped": null }
                ]
            },
            {
                "id": 1099,
                "type": "RedHome",
                "objectives": [{ "id": "1099-99", "type": "Tower", "owner": "Red" }]
            }
        ]
    }"#;

    #[test]
    fn test_match_conversion() {
        let dto: MatchDto = serde_json::from_str(MATCH_JSON).unwrap();
        assert_eq!(dto.world_ids(), [1008, 1010, 1003]);
        assert_eq!(dto.objective_ids().len(), 3);

        let worlds = HashMap::from([(1008, "Jade Quarry".to_string())]);
        let names = HashMap::from([("38-6".to_string(), "Stonemist Castle".to_string())]);
        let matchup = dto.into_match(&worlds, &names);

        assert_eq!(matchup.match_id, "1-4");
        assert_eq!(matchup.teams[0].name, "Jade Quarry");
        assert_eq!(matchup.teams[1].name, "World 1010");
        assert_eq!(matchup.teams[1].score, 1500);

        let castle = &matchup.objectives[0];
        assert_eq!(castle.name, "Stonemist Castle");
        assert_eq!(castle.kind, ObjectiveType::Castle);
        assert_eq!(castle.map, WvWMap::EternalBattlegrounds);
        assert_eq!(castle.owner, TeamColor::Green);
        assert_eq!(castle.claimed_by.as_deref(), Some("A1B2C3"));
        assert!(castle.last_flipped.is_some());

        assert_eq!(matchup.objectives[1].name, "38-3");
        assert_eq!(matchup.objectives[1].last_flipped, None);
        assert_eq!(matchup.objectives[2].map, WvWMap::RedBorderlands);
    }

    #[test]
    fn test_price_conversion() {
        let json = r#"[
            { "id": 19721, "whitelisted": false,
              "buys": { "quantity": 150, "unit_price": 2311 },
              "sells": { "quantity": 90, "unit_price": 2499 } }
        ]"#;
        let prices: Vec<PriceDto> = serde_json::from_str(json).unwrap();
        let names = HashMap::from([(19721, "Glob of Ectoplasm".to_string())]);

        let prices = to_item_prices(prices, &names);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].name, "Glob of Ectoplasm");
        assert_eq!(prices[0].buy_price, 2311);
        assert_eq!(prices[0].sell_quantity, 90);
    }
}
