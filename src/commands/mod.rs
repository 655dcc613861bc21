//! 命令模块
//!
//! 提供界面层调用的命令接口，按功能分组：
//! - config: 设置读取和更新命令
//! - control: 控制器启停和状态命令
//! - tasks: 任务追踪器命令（按名称注册到 CommandSet）

pub mod config;
pub mod control;
pub mod tasks;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{CompanionError, Result};

// 重新导出所有命令
pub use config::*;
pub use control::*;
pub use tasks::*;

/// 命令执行返回的 future
pub type CommandFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type Handler = Arc<dyn Fn() -> CommandFuture + Send + Sync>;

/// 按名称注册的命令集合
///
/// 界面层只需要知道命令名称,不依赖具体的视图模型类型
#[derive(Clone, Default)]
pub struct CommandSet {
    handlers: BTreeMap<&'static str, Handler>,
}

impl CommandSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令;同名命令会被替换
    pub fn register<F, Fut>(&mut self, name: &'static str, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move || Box::pin(handler()) as CommandFuture);
        if self.handlers.insert(name, handler).is_some() {
            warn!("命令 {} 被重复注册", name);
        }
    }

    /// 已注册的命令名称(按字母顺序)
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// 执行命令
    pub async fn execute(&self, name: &str) -> Result<()> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| CompanionError::Validation(format!("未知命令: {}", name)))?;
        info!("执行命令: {}", name);
        handler().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_register_and_execute() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut commands = CommandSet::new();

        let c = counter.clone();
        commands.register("refresh", move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        commands.register("fail", || async { Err(CompanionError::Validation("bad".into())) });

        assert_eq!(commands.names(), vec!["fail", "refresh"]);
        assert!(commands.contains("refresh"));

        commands.execute("refresh").await.unwrap();
        commands.execute("refresh").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        assert!(commands.execute("fail").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let commands = CommandSet::new();
        let err = commands.execute("missing").await.unwrap_err();
        assert!(matches!(err, CompanionError::Validation(_)));
    }
}
