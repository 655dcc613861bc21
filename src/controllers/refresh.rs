// 刷新循环 - 所有控制器共用的定时轮询逻辑
//
// 状态机只有 Stopped / Running 两个状态;修改间隔不需要重启。
// 每次启动分配一个新的代号,轮询结果只有在代号仍然有效时才会被应用,
// 停止与应用在同一把锁下串行,停止之后返回的结果一律丢弃

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::lock;
use crate::error::Result;
use crate::event_bus::{AppEvent, EventBus};
use crate::utils::validate_refresh_interval;

/// 可被刷新循环驱动的对象
#[async_trait]
pub trait Refreshable: Send + Sync + 'static {
    /// 一次轮询的结果
    type Snapshot: Send + 'static;

    fn name(&self) -> &'static str;

    /// 获取最新状态(可能较慢,不持有任何锁)
    async fn fetch(&self) -> Result<Self::Snapshot>;

    /// 把结果对账进可观察集合
    fn apply(&self, snapshot: Self::Snapshot);
}

#[derive(Default)]
struct LoopState {
    generation: u64,
    running: bool,
    cancel: Option<watch::Sender<bool>>,
}

impl LoopState {
    fn is_current(&self, generation: u64) -> bool {
        self.running && self.generation == generation
    }
}

/// 定时刷新循环
pub struct RefreshLoop {
    name: &'static str,
    interval: watch::Sender<Duration>,
    state: Arc<Mutex<LoopState>>,
    active_loops: Arc<AtomicUsize>,
    event_bus: Arc<EventBus>,
}

impl RefreshLoop {
    /// 创建刷新循环,初始间隔超出范围时会被夹到合法区间
    pub fn new(name: &'static str, interval_ms: u64, event_bus: Arc<EventBus>) -> Self {
        let interval_ms = interval_ms.clamp(
            crate::settings::MIN_REFRESH_INTERVAL_MS,
            crate::settings::MAX_REFRESH_INTERVAL_MS,
        );
        let (interval, _) = watch::channel(Duration::from_millis(interval_ms));
        Self {
            name,
            interval,
            state: Arc::new(Mutex::new(LoopState::default())),
            active_loops: Arc::new(AtomicUsize::new(0)),
            event_bus,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 当前刷新间隔(毫秒)
    pub fn refresh_interval(&self) -> u64 {
        self.interval.borrow().as_millis() as u64
    }

    /// 修改刷新间隔;运行中的循环会立即按新间隔重新计时
    pub fn set_refresh_interval(&self, interval_ms: u64) -> Result<()> {
        validate_refresh_interval(interval_ms)?;
        let previous = self.interval.send_replace(Duration::from_millis(interval_ms));
        if previous.as_millis() as u64 != interval_ms {
            info!("{} 刷新间隔更新为 {}ms", self.name, interval_ms);
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// 当前仍在执行的后台循环数量
    pub fn active_loops(&self) -> usize {
        self.active_loops.load(Ordering::SeqCst)
    }

    /// 启动刷新;已在运行时什么也不做并返回 false
    pub fn start<R: Refreshable>(&self, target: Arc<R>) -> bool {
        let (generation, cancel_rx) = {
            let mut state = lock(&self.state);
            if state.running {
                debug!("{} 已在运行，忽略重复启动", self.name);
                return false;
            }
            state.generation += 1;
            state.running = true;
            let (cancel_tx, cancel_rx) = watch::channel(false);
            state.cancel = Some(cancel_tx);
            (state.generation, cancel_rx)
        };

        let worker = LoopWorker {
            name: self.name,
            generation,
            state: self.state.clone(),
            interval_rx: self.interval.subscribe(),
            cancel_rx,
            active_loops: self.active_loops.clone(),
            event_bus: self.event_bus.clone(),
        };
        self.active_loops.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(worker.run(target));

        info!("{} 自动刷新已启动，间隔 {}ms", self.name, self.refresh_interval());
        self.event_bus.publish(AppEvent::ControllerStateChanged {
            controller: self.name,
            running: true,
        });
        true
    }

    /// 停止刷新;不等待正在进行的请求,其结果会被丢弃
    pub fn stop(&self) -> bool {
        {
            let mut state = lock(&self.state);
            if !state.running {
                return false;
            }
            state.running = false;
            if let Some(cancel) = state.cancel.take() {
                let _ = cancel.send(true);
            }
        }

        info!("{} 自动刷新已停止", self.name);
        self.event_bus.publish(AppEvent::ControllerStateChanged {
            controller: self.name,
            running: false,
        });
        true
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 后台循环持有的状态
struct LoopWorker {
    name: &'static str,
    generation: u64,
    state: Arc<Mutex<LoopState>>,
    interval_rx: watch::Receiver<Duration>,
    cancel_rx: watch::Receiver<bool>,
    active_loops: Arc<AtomicUsize>,
    event_bus: Arc<EventBus>,
}

impl LoopWorker {
    async fn run<R: Refreshable>(mut self, target: Arc<R>) {
        debug!("{} 刷新循环 #{} 已启动", self.name, self.generation);

        loop {
            if *self.cancel_rx.borrow() {
                break;
            }

            let outcome = target.fetch().await;
            if !self.apply_if_current(&*target, outcome) {
                debug!("{} 循环 #{} 已被停止，丢弃本次结果", self.name, self.generation);
                break;
            }

            if !self.sleep_until_next_tick().await {
                break;
            }
        }

        self.active_loops.fetch_sub(1, Ordering::SeqCst);
        debug!("{} 刷新循环 #{} 已退出", self.name, self.generation);
    }

    /// 在状态锁内检查代号并应用结果,返回循环是否应继续
    fn apply_if_current<R: Refreshable>(&self, target: &R, outcome: Result<R::Snapshot>) -> bool {
        let state = lock(&self.state);
        if !state.is_current(self.generation) {
            return false;
        }

        match outcome {
            Ok(snapshot) => target.apply(snapshot),
            Err(e) => {
                warn!("{} 刷新失败，将在下次轮询重试: {}", self.name, e);
                self.event_bus.publish(AppEvent::RefreshFailed {
                    controller: self.name,
                    error: e.to_string(),
                });
            }
        }
        true
    }

    /// 等待下一次轮询;间隔变化时重新计时,收到停止信号时返回 false
    async fn sleep_until_next_tick(&mut self) -> bool {
        let mut delay = *self.interval_rx.borrow_and_update();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => return true,
                changed = self.interval_rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                    delay = *self.interval_rx.borrow_and_update();
                    debug!("{} 按新间隔 {:?} 重新计时", self.name, delay);
                }
                _ = self.cancel_rx.changed() => return false,
            }
        }
    }
}
