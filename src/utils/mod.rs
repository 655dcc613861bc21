//! 工具函数模块
//!
//! 提供各类通用工具函数，包括：
//! - 输入验证
//! - 路点聊天码解析
//! - 文件系统路径
//! - 系统代理检测
//! - 游戏进程检测

pub mod file_system;
pub mod game_process;
pub mod proxy;
pub mod validation;
pub mod waypoint;

// 重新导出常用函数
pub use file_system::*;
pub use game_process::*;
pub use proxy::*;
pub use validation::*;
pub use waypoint::*;
