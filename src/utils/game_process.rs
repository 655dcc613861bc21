//! 游戏进程检测
//!
//! 游戏未运行时,依赖玩家位置的轮询直接跳过

use std::sync::Mutex;

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// 游戏客户端进程名关键字
const PROCESS_TOKENS: [&str; 3] = ["gw2-64", "gw2.exe", "gw2.app"];

/// 判断进程名是否属于游戏客户端
pub fn is_game_process_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    PROCESS_TOKENS.iter().any(|token| name.contains(token)) || name == "gw2"
}

/// 游戏是否正在运行
pub trait GameProcessMonitor: Send + Sync {
    fn is_game_running(&self) -> bool;
}

/// 基于 sysinfo 的进程检测
pub struct SysinfoGameMonitor {
    system: Mutex<System>,
}

impl SysinfoGameMonitor {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SysinfoGameMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl GameProcessMonitor for SysinfoGameMonitor {
    fn is_game_running(&self) -> bool {
        let mut system = self.system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        system.refresh_processes(ProcessesToUpdate::All);
        let running = system
            .processes()
            .values()
            .any(|process| is_game_process_name(&process.name().to_string_lossy()));
        debug!("游戏进程检测: {}", running);
        running
    }
}

/// 始终认为游戏在运行(无法检测进程时使用)
pub struct AssumeRunning;

impl GameProcessMonitor for AssumeRunning {
    fn is_game_running(&self) -> bool {
        true
    }
}
