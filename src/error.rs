// 错误类型定义
//
// 后台轮询的失败只记录日志,不会抛给界面;
// 只有用户主动发起的操作(导入/导出/添加)才把错误同步返回给调用方

use std::path::PathBuf;
use thiserror::Error;

/// 伴侣应用统一错误类型
#[derive(Debug, Error)]
pub enum CompanionError {
    /// 轮询时的网络/API 失败,下一次轮询会重试
    #[error("{source_name} 刷新失败: {message}")]
    TransientFetch {
        source_name: String,
        message: String,
    },

    /// 导入文件格式错误,集合保持不变
    #[error("文件格式错误 {path:?}: {message}")]
    FileFormat { path: PathBuf, message: String },

    /// 用户输入校验失败,保留原值
    #[error("参数无效: {0}")]
    Validation(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 设置序列化/反序列化失败
    #[error("设置持久化失败: {0}")]
    Persistence(String),
}

impl CompanionError {
    pub fn transient(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::TransientFetch {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }

    pub fn file_format(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::FileFormat {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// 是否为轮询中的临时错误
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }
}

pub type Result<T> = std::result::Result<T, CompanionError>;
