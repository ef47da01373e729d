//! 对局配置：盘子数量的清洗规则与引擎策略开关。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 经过清洗的盘子数量，始终位于 `[MIN, MAX]`。
///
/// 外部输入（下拉框的字符串、JS 数字、反序列化的快照）不会被拒绝：
/// 能读出整数就夹到范围内，读不出来则回退到 `DEFAULT`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "i64", into = "u8")]
pub struct DiskCount(u8);

impl DiskCount {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const DEFAULT: u8 = 4;

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    /// JS 数字：向零截断，NaN 与无穷大回退到默认值。
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        Self::clamped(value.trunc() as i64)
    }

    /// 与 `parseInt(value, 10)` 一样宽松：跳过前导空白，接受可选符号，
    /// 只读取开头连续的数字。
    pub fn parse_lenient(raw: &str) -> Self {
        read_leading_integer(raw)
            .map(Self::clamped)
            .unwrap_or_default()
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Default for DiskCount {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl fmt::Display for DiskCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DiskCount {
    fn from(value: i64) -> Self {
        Self::clamped(value)
    }
}

impl From<u8> for DiskCount {
    fn from(value: u8) -> Self {
        Self::clamped(value as i64)
    }
}

impl From<usize> for DiskCount {
    fn from(value: usize) -> Self {
        Self::clamped(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<DiskCount> for u8 {
    fn from(count: DiskCount) -> Self {
        count.0
    }
}

fn read_leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for byte in digits.bytes() {
        if !byte.is_ascii_digit() {
            break;
        }
        seen_digit = true;
        value = value
            .saturating_mul(10)
            .saturating_add((byte - b'0') as i64);
    }

    if !seen_digit {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// 引擎策略。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// 胜利后拒绝继续移动（撤销仍然允许）。
    #[serde(default = "default_lock_after_win")]
    pub lock_after_win: bool,
}

fn default_lock_after_win() -> bool {
    true
}

impl EngineConfig {
    pub fn with_lock_after_win(mut self, lock: bool) -> Self {
        self.lock_after_win = lock;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_after_win: default_lock_after_win(),
        }
    }
}
