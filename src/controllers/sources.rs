// 控制器的数据来源
//
// 控制器只依赖这些 trait,具体实现(GW2 API 客户端、位置读取)通过构造函数注入

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ItemPrice, PlayerPosition, WvWMatch};

/// 交易所价格来源
#[async_trait]
pub trait CommerceSource: Send + Sync {
    /// 获取指定物品的当前价格;未知物品不出现在结果中
    async fn fetch_prices(&self, item_ids: &[i32]) -> Result<Vec<ItemPrice>>;
}

/// WvW 对战来源
#[async_trait]
pub trait WvWSource: Send + Sync {
    /// 获取指定世界当前所在的对战
    async fn fetch_match(&self, world_id: i32) -> Result<WvWMatch>;
}

/// 玩家位置来源
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// 玩家当前位置;不在游戏中时为 None
    async fn current_position(&self) -> Result<Option<PlayerPosition>>;
}

/// 由外部写入的位置
///
/// 覆盖层从游戏的共享内存读取位置后调用 `set`,控制器在下一次轮询时读取
#[derive(Default)]
pub struct SharedPosition {
    position: RwLock<Option<PlayerPosition>>,
}

impl SharedPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, position: Option<PlayerPosition>) {
        *self
            .position
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = position;
    }

    pub fn get(&self) -> Option<PlayerPosition> {
        *self
            .position
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl PositionSource for SharedPosition {
    async fn current_position(&self) -> Result<Option<PlayerPosition>> {
        Ok(self.get())
    }
}
