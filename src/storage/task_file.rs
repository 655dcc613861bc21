// 任务文件 - XML 格式的任务列表导入/导出
//
// 文件结构:
// <PlayerTasks>
//   <PlayerTask Id=".." Name=".." ...>
//     <Location X=".." Y=".." Z=".."/>
//   </PlayerTask>
// </PlayerTasks>

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CompanionError;
use crate::models::{Point, PlayerTask};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "PlayerTasks")]
struct TaskFile {
    #[serde(rename = "PlayerTask", default)]
    tasks: Vec<TaskElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskElement {
    #[serde(rename = "@Id")]
    id: Uuid,
    #[serde(rename = "@Name")]
    name: String,
    #[serde(rename = "@Description", default)]
    description: String,
    #[serde(rename = "@Category", default)]
    category: String,
    #[serde(rename = "@IsDaily", default)]
    is_daily: bool,
    #[serde(rename = "@IsCompletable", default = "default_true")]
    is_completable: bool,
    #[serde(rename = "@Reward", default)]
    reward: f64,
    #[serde(rename = "@MapId", default, skip_serializing_if = "Option::is_none")]
    map_id: Option<i32>,
    #[serde(rename = "@WaypointCode", default, skip_serializing_if = "Option::is_none")]
    waypoint_code: Option<String>,
    #[serde(rename = "Location", default, skip_serializing_if = "Option::is_none")]
    location: Option<LocationElement>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LocationElement {
    #[serde(rename = "@X")]
    x: f64,
    #[serde(rename = "@Y")]
    y: f64,
    #[serde(rename = "@Z")]
    z: f64,
}

fn default_true() -> bool {
    true
}

impl From<&PlayerTask> for TaskElement {
    fn from(task: &PlayerTask) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            description: task.description.clone(),
            category: task.category.clone(),
            is_daily: task.is_daily,
            is_completable: task.is_completable,
            reward: task.reward,
            map_id: task.map_id,
            waypoint_code: task.waypoint_code.clone(),
            location: task.location.map(|p| LocationElement {
                x: p.x,
                y: p.y,
                z: p.z,
            }),
        }
    }
}

impl From<TaskElement> for PlayerTask {
    fn from(element: TaskElement) -> Self {
        Self {
            id: element.id,
            name: element.name,
            description: element.description,
            category: element.category,
            is_daily: element.is_daily,
            is_completable: element.is_completable,
            reward: element.reward,
            map_id: element.map_id,
            location: element.location.map(|l| Point::new(l.x, l.y, l.z)),
            waypoint_code: element.waypoint_code,
        }
    }
}

/// 序列化任务列表
pub fn to_xml(tasks: &[PlayerTask]) -> Result<String> {
    let file = TaskFile {
        tasks: tasks.iter().map(TaskElement::from).collect(),
    };
    let body = quick_xml::se::to_string(&file).context("序列化任务列表失败")?;
    Ok(format!("{}\n{}", XML_DECLARATION, body))
}

/// 解析任务列表;重复的 Id 只保留第一次出现的任务
pub fn from_xml(xml: &str) -> Result<Vec<PlayerTask>> {
    let file: TaskFile = quick_xml::de::from_str(xml).context("解析任务文件失败")?;

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(file.tasks.len());
    for element in file.tasks {
        if element.name.trim().is_empty() {
            anyhow::bail!("任务 {} 缺少名称", element.id);
        }
        if !seen.insert(element.id) {
            warn!("任务文件中存在重复的任务 {}, 已忽略", element.id);
            continue;
        }
        tasks.push(PlayerTask::from(element));
    }
    Ok(tasks)
}

/// 读取任务文件,任何读取或解析错误都视为文件格式错误
pub async fn read_task_file(path: &Path) -> crate::error::Result<Vec<PlayerTask>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CompanionError::file_format(path, e))?;
    let tasks = from_xml(&content).map_err(|e| CompanionError::file_format(path, format!("{:#}", e)))?;
    info!("从 {:?} 读取了 {} 个任务", path, tasks.len());
    Ok(tasks)
}

/// 写出任务文件
pub async fn write_task_file(path: &Path, tasks: &[PlayerTask]) -> crate::error::Result<()> {
    let xml = to_xml(tasks).map_err(|e| CompanionError::Persistence(format!("{:#}", e)))?;
    tokio::fs::write(path, xml).await?;
    info!("已导出 {} 个任务到 {:?}", tasks.len(), path);
    Ok(())
}
