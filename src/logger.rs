// 自定义日志层 - 支持将日志实时推送给界面层

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tokio::sync::broadcast;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::utils::get_log_dir;

const LOG_CHANNEL_CAPACITY: usize = 512;

/// 日志消息
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

/// 日志推送器 - 通过广播通道转发日志
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogMessage>,
    enabled: AtomicBool,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        Self {
            sender,
            enabled: AtomicBool::new(true),
        }
    }

    /// 订阅日志;丢弃接收端即取消订阅
    pub fn subscribe(&self) -> broadcast::Receiver<LogMessage> {
        self.sender.subscribe()
    }

    /// 设置日志推送开关
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn emit_log(&self, log: LogMessage) {
        if !self.is_enabled() {
            return;
        }
        // 没有订阅者时发送失败,忽略
        let _ = self.sender.send(log);
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// 把每条日志事件转给 LogBroadcaster 的层
pub struct BroadcastLogLayer {
    broadcaster: Arc<LogBroadcaster>,
}

impl BroadcastLogLayer {
    pub fn new(broadcaster: Arc<LogBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl<S: Subscriber> Layer<S> for BroadcastLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.broadcaster.is_enabled() {
            return;
        }
        let metadata = event.metadata();

        struct MessageVisitor {
            message: String,
        }

        impl tracing::field::Visit for MessageVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        self.broadcaster.emit_log(LogMessage {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.message,
        });
    }
}

/// 初始化日志系统(控制台 + 按天轮转的文件 + 推送层)
pub fn init_with_broadcaster(broadcaster: Arc<LogBroadcaster>, max_level: Level) -> Result<()> {
    use tracing_subscriber::fmt::time::LocalTime;
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    let log_dir = get_log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("无法创建日志目录 {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "overlay.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // guard 需要存活到进程结束
    std::mem::forget(guard);

    let writer = std::io::stdout.and(non_blocking);

    let format = time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    )
    .context("日志时间格式无效")?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(writer)
        .with_timer(LocalTime::new(format))
        .with_ansi(cfg!(debug_assertions))
        .finish()
        .with(BroadcastLogLayer::new(broadcaster));

    tracing::subscriber::set_global_default(subscriber).context("日志系统已初始化")?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(())
}
