//! 系统代理检测
//!
//! 读取系统代理设置,供 API 客户端构建 reqwest 代理使用,支持 macOS 和 Windows

use tracing::info;
#[cfg(target_os = "windows")]
use tracing::warn;

/// 检测系统 HTTPS 代理地址
///
/// 优先使用 `HTTPS_PROXY` / `https_proxy` 环境变量,其次读取系统设置
pub fn detect_system_proxy() -> Option<String> {
    for var in ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"] {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }

    let detected = platform_proxy();
    if let Some(proxy) = &detected {
        info!("检测到系统代理: {}", proxy);
    }
    detected
}

#[cfg(target_os = "macos")]
fn platform_proxy() -> Option<String> {
    use std::process::Command;

    let output = Command::new("scutil").arg("--proxy").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let proxy_info = String::from_utf8(output.stdout).ok()?;
    parse_scutil_proxy(&proxy_info)
}

#[cfg(target_os = "windows")]
fn platform_proxy() -> Option<String> {
    use winreg::enums::*;
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let Ok(internet_settings) =
        hkcu.open_subkey("Software\\Microsoft\\Windows\\CurrentVersion\\Internet Settings")
    else {
        warn!("无法读取 Windows 代理设置");
        return None;
    };

    let enabled = internet_settings.get_value::<u32, _>("ProxyEnable").ok()?;
    if enabled != 1 {
        info!("Windows 系统代理未启用");
        return None;
    }
    let proxy_server = internet_settings.get_value::<String, _>("ProxyServer").ok()?;
    parse_windows_proxy_server(&proxy_server)
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_proxy() -> Option<String> {
    None
}

/// 解析 `scutil --proxy` 的输出,优先 HTTPS 代理
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn parse_scutil_proxy(proxy_info: &str) -> Option<String> {
    let value = |key: &str| {
        proxy_info
            .lines()
            .find(|l| l.trim().starts_with(key))
            .and_then(|l| l.split(':').nth(1))
            .map(|s| s.trim().to_string())
    };

    for (enable, host, port) in [
        ("HTTPSEnable", "HTTPSProxy", "HTTPSPort"),
        ("HTTPEnable", "HTTPProxy", "HTTPPort"),
    ] {
        if value(enable).and_then(|v| v.parse::<i32>().ok()) == Some(1) {
            if let (Some(host), Some(port)) = (value(host), value(port)) {
                return Some(format!("http://{}:{}", host, port));
            }
        }
    }
    None
}

/// 解析 Windows 注册表中的 ProxyServer 值
///
/// 格式可能是：
/// 1. "host:port" (所有协议使用同一代理)
/// 2. "http=host:port;https=host:port" (不同协议使用不同代理)
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn parse_windows_proxy_server(proxy_server: &str) -> Option<String> {
    let normalize = |addr: &str| {
        let addr = addr.trim();
        if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.to_string()
        } else {
            format!("http://{}", addr)
        }
    };

    if !proxy_server.contains('=') {
        let trimmed = proxy_server.trim();
        return (!trimmed.is_empty()).then(|| normalize(trimmed));
    }

    let mut http = None;
    for part in proxy_server.split(';') {
        if let Some((protocol, addr)) = part.split_once('=') {
            match protocol.trim().to_lowercase().as_str() {
                "https" => return Some(normalize(addr)),
                "http" => http = Some(normalize(addr)),
                _ => {}
            }
        }
    }
    http
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_windows_proxy_formats() {
        assert_eq!(
            parse_windows_proxy_server("127.0.0.1:8080"),
            Some("http://127.0.0.1:8080".to_string())
        );
        assert_eq!(
            parse_windows_proxy_server("http=proxy:80;https=secure:443"),
            Some("http://secure:443".to_string())
        );
        assert_eq!(
            parse_windows_proxy_server("ftp=x:21;http=proxy:80"),
            Some("http://proxy:80".to_string())
        );
        assert_eq!(parse_windows_proxy_server("  "), None);
    }

    #[test]
    fn test_parse_scutil_output() {
        let output = "<dictionary> {\n  HTTPEnable : 1\n  HTTPPort : 7890\n  HTTPProxy : 127.0.0.1\n  HTTPSEnable : 0\n}";
        assert_eq!(parse_scutil_proxy(output), Some("http://127.0.0.1:7890".to_string()));
        assert_eq!(parse_scutil_proxy("HTTPEnable : 0"), None);
    }
}
