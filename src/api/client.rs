// GW2 API 客户端
// 负责与官方 API 交互,为控制器提供价格和 WvW 对战数据

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::types::{to_item_prices, MatchDto, NamedDto, PriceDto};
use crate::controllers::{lock, CommerceSource, WvWSource};
use crate::error::CompanionError;
use crate::models::{ItemPrice, WvWMatch};
use crate::settings::ApiSettings;
use crate::utils::detect_system_proxy;

/// 单次请求最多携带的ID数量
const MAX_IDS_PER_REQUEST: usize = 200;

/// GW2 API 客户端
pub struct Gw2ApiClient {
    client: Client,
    base_url: String,
    /// 名称很少变化,缓存后每次轮询只请求缺失的部分
    item_names: Mutex<HashMap<i32, String>>,
    world_names: Mutex<HashMap<i32, String>>,
    objective_names: Mutex<HashMap<String, String>>,
}

impl Gw2ApiClient {
    /// 按 API 设置创建客户端
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(settings.timeout_secs));

        if settings.use_system_proxy {
            if let Some(proxy) = detect_system_proxy() {
                info!("GW2 API 使用代理: {}", proxy);
                builder = builder.proxy(reqwest::Proxy::all(&proxy).context("代理地址无效")?);
            }
        }

        let client = builder.build().context("无法创建 HTTP 客户端")?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            item_names: Mutex::new(HashMap::new()),
            world_names: Mutex::new(HashMap::new()),
            objective_names: Mutex::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 获取物品价格,并补全物品名称
    pub async fn get_prices(&self, item_ids: &[i32]) -> Result<Vec<ItemPrice>> {
        let mut prices: Vec<PriceDto> = Vec::new();
        for chunk in item_ids.chunks(MAX_IDS_PER_REQUEST) {
            prices.extend(self.get_by_ids::<PriceDto, i32>("/commerce/prices", chunk).await?);
        }

        self.fill_names("/items", &self.item_names, item_ids).await;
        let names = lock(&self.item_names).clone();
        Ok(to_item_prices(prices, &names))
    }

    /// 获取指定世界所在的对战
    pub async fn get_match(&self, world_id: i32) -> Result<WvWMatch> {
        let url = format!("{}/wvw/matches", self.base_url);
        let dto: MatchDto = self.get_json(&url, &[("world", world_id.to_string())]).await?;

        self.fill_names("/worlds", &self.world_names, &dto.world_ids()[..]).await;
        self.fill_names("/wvw/objectives", &self.objective_names, &dto.objective_ids())
            .await;

        let worlds = lock(&self.world_names).clone();
        let objectives = lock(&self.objective_names).clone();
        Ok(dto.into_match(&worlds, &objectives))
    }

    /// 按ID批量获取;全部ID都无效时 API 返回 404,视为空结果
    async fn get_by_ids<T, K>(&self, path: &str, ids: &[K]) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        K: ToString,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("ids", joined)])
            .send()
            .await
            .with_context(|| format!("请求 {} 失败", path))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} 没有匹配的ID", path);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(anyhow!("{} 返回错误状态: {}", path, response.status()));
        }
        response
            .json()
            .await
            .with_context(|| format!("解析 {} 响应失败", path))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("请求 {} 失败", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("{} 返回错误状态: {}", url, response.status()));
        }
        response
            .json()
            .await
            .with_context(|| format!("解析 {} 响应失败", url))
    }

    /// 请求缓存中缺失的名称;失败时只记录日志,名称留空
    async fn fill_names<K>(&self, path: &str, cache: &Mutex<HashMap<K, String>>, ids: &[K])
    where
        K: Clone + Eq + Hash + ToString + DeserializeOwned,
    {
        let missing: Vec<K> = {
            let cache = lock(cache);
            ids.iter().filter(|id| !cache.contains_key(*id)).cloned().collect()
        };
        if missing.is_empty() {
            return;
        }

        for chunk in missing.chunks(MAX_IDS_PER_REQUEST) {
            match self.get_by_ids::<NamedDto<K>, K>(path, chunk).await {
                Ok(named) => {
                    let mut cache = lock(cache);
                    for dto in named {
                        cache.insert(dto.id, dto.name);
                    }
                }
                Err(e) => warn!("获取名称失败 {}: {:#}", path, e),
            }
        }
    }
}

#[async_trait]
impl CommerceSource for Gw2ApiClient {
    async fn fetch_prices(&self, item_ids: &[i32]) -> crate::error::Result<Vec<ItemPrice>> {
        self.get_prices(item_ids)
            .await
            .map_err(|e| CompanionError::transient("commerce/prices", format!("{:#}", e)))
    }
}

#[async_trait]
impl WvWSource for Gw2ApiClient {
    async fn fetch_match(&self, world_id: i32) -> crate::error::Result<WvWMatch> {
        self.get_match(world_id)
            .await
            .map_err(|e| CompanionError::transient("wvw/matches", format!("{:#}", e)))
    }
}
