//! 路点聊天码解析
//!
//! 游戏内聊天链接格式为 `[&<base64>]`,地图点链接的首字节为 0x04,
//! 随后 4 字节小端序为路点/兴趣点ID

use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;

use crate::error::{CompanionError, Result};

const MAP_LINK_HEADER: u8 = 0x04;

fn chat_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[&([A-Za-z0-9+/]+={0,2})\]$").expect("静态正则表达式无效"))
}

/// 解析路点聊天码,返回路点ID
pub fn parse_waypoint_code(code: &str) -> Result<u32> {
    let invalid = |reason: &str| CompanionError::Validation(format!("无效的路点码 {}: {}", code, reason));

    let captures = chat_code_regex()
        .captures(code.trim())
        .ok_or_else(|| invalid("格式应为 [&...]"))?;
    let bytes = STANDARD
        .decode(&captures[1])
        .map_err(|e| invalid(&e.to_string()))?;

    match bytes.as_slice() {
        [MAP_LINK_HEADER, a, b, c, d, ..] => Ok(u32::from_le_bytes([*a, *b, *c, *d])),
        [MAP_LINK_HEADER, ..] => Err(invalid("数据长度不足")),
        _ => Err(invalid("不是地图点链接")),
    }
}

/// 由路点ID生成聊天码
pub fn format_waypoint_code(waypoint_id: u32) -> String {
    let mut bytes = vec![MAP_LINK_HEADER];
    bytes.extend_from_slice(&waypoint_id.to_le_bytes());
    format!("[&{}]", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_waypoint() {
        assert_eq!(parse_waypoint_code("[&BDgAAAA=]").unwrap(), 56);
        assert_eq!(parse_waypoint_code(" [&BNIEAAA=] ").unwrap(), 1234);
    }

    #[test]
    fn test_format_matches_game_encoding() {
        assert_eq!(format_waypoint_code(56), "[&BDgAAAA=]");
        assert_eq!(parse_waypoint_code(&format_waypoint_code(4242)).unwrap(), 4242);
    }

    #[test]
    fn test_rejects_malformed_codes() {
        assert!(parse_waypoint_code("BDgAAAA=").is_err());
        assert!(parse_waypoint_code("[&!!!]").is_err());
        // 物品链接(首字节 0x02)不是路点
        assert!(parse_waypoint_code("[&AgH1WQAA]").is_err());
        assert!(parse_waypoint_code("[&BA==]").is_err());
    }
}
