// 事件总线 - 用于模块间解耦通信
//
// 实现发布/订阅模式,控制器和视图模型只负责发布,界面层自行订阅
// 使用 tokio::sync::broadcast 实现高效的事件分发

use tokio::sync::broadcast;

use crate::models::{PriceLimitKind, TeamColor};

/// 提示级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// 应用事件枚举 - 定义所有可能的系统事件
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // --- 属性变更 ---

    /// 某个实体的属性已变更
    PropertyChanged {
        entity: String,
        property: &'static str,
    },

    // --- 控制器事件 ---

    /// 控制器启动/停止
    ControllerStateChanged {
        controller: &'static str,
        running: bool,
    },

    /// 轮询失败(下一次轮询会重试)
    RefreshFailed {
        controller: &'static str,
        error: String,
    },

    /// 每日重置已执行
    DailyReset {
        controller: &'static str,
        cleared: usize,
    },

    // --- 通知事件 ---

    /// 价格触发了监视限制
    PriceNotification {
        item_id: i32,
        kind: PriceLimitKind,
    },

    /// WvW 目标点易主
    ObjectiveOwnerChanged {
        objective_id: String,
        previous: TeamColor,
        owner: TeamColor,
    },

    // --- 系统事件 ---

    /// 需要展示给用户的提示
    UserNotice {
        level: NoticeLevel,
        message: String,
    },

    /// 设置已保存
    SettingsSaved,
}

impl AppEvent {
    pub fn property(entity: impl Into<String>, property: &'static str) -> Self {
        Self::PropertyChanged {
            entity: entity.into(),
            property,
        }
    }
}

/// 事件总线 - 用于模块间解耦通信
///
/// 使用 broadcast channel 实现发布/订阅模式
/// 支持多个订阅者同时接收事件
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    /// 创建新的事件总线
    ///
    /// # 参数
    /// - `capacity`: 事件缓冲区大小,建议 100-1000
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 发布事件
    ///
    /// 如果没有订阅者,事件会被丢弃(这是正常的)
    pub fn publish(&self, event: AppEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                tracing::trace!("事件已发布，订阅者数量: {}", receiver_count);
            }
            Err(_) => {
                tracing::trace!("事件已发布但无订阅者");
            }
        }
    }

    /// 发布属性变更
    pub fn raise_property_changed(&self, entity: impl Into<String>, property: &'static str) {
        self.publish(AppEvent::property(entity, property));
    }

    /// 发布用户提示
    pub fn notify_user(&self, level: NoticeLevel, message: impl Into<String>) {
        self.publish(AppEvent::UserNotice {
            level,
            message: message.into(),
        });
    }

    /// 订阅事件
    ///
    /// 返回一个接收器,可以用 `.recv().await` 接收事件;丢弃接收器即取消订阅
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// 获取当前订阅者数量
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// 取出接收器中当前已缓冲的全部事件(界面线程每帧调用)
pub fn drain(receiver: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!("事件订阅者落后，丢弃了 {} 条事件", skipped);
            }
            Err(_) => break,
        }
    }
    events
}
