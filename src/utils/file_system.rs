//! 文件系统路径工具
//!
//! 提供跨平台的日志目录、数据目录访问

use std::path::PathBuf;

const APP_DIR_NAME: &str = "gw2-overlay";

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
}

/// 获取日志目录路径（跨平台）
///
/// - macOS: ~/Library/Logs/gw2-overlay
/// - Windows: %APPDATA%/gw2-overlay/logs
/// - Linux: ~/.local/share/gw2-overlay/logs
pub fn get_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        home_dir().join("Library/Logs").join(APP_DIR_NAME)
    } else {
        get_data_dir().join("logs")
    }
}

/// 获取数据目录路径(设置文件所在目录)
pub fn get_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        home_dir().join("Library/Application Support").join(APP_DIR_NAME)
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join(APP_DIR_NAME)
    } else {
        home_dir().join(".local/share").join(APP_DIR_NAME)
    }
}

/// 用户设置文件路径
pub fn get_settings_path() -> PathBuf {
    get_data_dir().join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_app_scoped() {
        assert!(get_data_dir().to_string_lossy().contains(APP_DIR_NAME));
        assert!(get_log_dir().to_string_lossy().contains(APP_DIR_NAME));
        assert_eq!(get_settings_path().file_name().unwrap(), "settings.json");
    }
}
