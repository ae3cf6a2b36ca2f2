// 计时服务
// 计时状态持久化在 `timerState` 键下，重新打开时只有页面地址一致才继续计时

use super::store::Store;
use crate::error::SyncError;
use crate::models::TimerState;
use crate::utils::normalize_page_url;
use log::debug;

pub const TIMER_STATE_KEY: &str = "timerState";

/// 毫秒 → `HH:MM:SS`
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60
    )
}

/// 解析手动输入的用时
///
/// 支持 `H:MM:SS`、`MM:SS`（分钟不超过 59）和纯秒数。
pub fn parse_manual_time(input: &str) -> Result<u64, SyncError> {
    let invalid = || SyncError::validation(format!("Invalid time '{}', expected HH:MM:SS, MM:SS or seconds", input));
    let parts: Vec<&str> = input.trim().split(':').map(str::trim).collect();

    let numbers = parts
        .iter()
        .map(|part| {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
                None
            } else {
                part.parse::<u64>().ok()
            }
        })
        .collect::<Option<Vec<u64>>>()
        .ok_or_else(invalid)?;

    let seconds = match numbers.as_slice() {
        [secs] => Some(*secs),
        [mins, secs] if *mins < 60 && *secs < 60 => Some(mins * 60 + secs),
        [hours, mins, secs] if *mins < 60 && *secs < 60 => hours
            .checked_mul(3600)
            .and_then(|s| s.checked_add(mins * 60 + secs)),
        _ => return Err(invalid()),
    };

    // 超出范围同样视为无效输入
    seconds
        .and_then(|s| s.checked_mul(1000))
        .ok_or_else(|| SyncError::validation(format!("Time '{}' is too large", input.trim())))
}

impl TimerState {
    /// 当前累计用时（运行中时加上本轮时长）
    pub fn elapsed_at(&self, now_ms: i64) -> u64 {
        match (self.is_running, self.start_time) {
            (true, Some(start)) if now_ms > start => self.elapsed_time + (now_ms - start) as u64,
            _ => self.elapsed_time,
        }
    }

    pub fn start(&mut self, now_ms: i64, url: &str) {
        if !self.is_running {
            self.is_running = true;
            self.start_time = Some(now_ms);
        }
        self.tab_url = Some(url.to_string());
    }

    pub fn pause(&mut self, now_ms: i64) {
        self.elapsed_time = self.elapsed_at(now_ms);
        self.is_running = false;
        self.start_time = None;
    }

    pub fn reset(&mut self) {
        *self = TimerState {
            tab_url: self.tab_url.take(),
            ..TimerState::default()
        };
    }

    /// 手动设定用时，保持暂停状态
    pub fn set_elapsed(&mut self, ms: u64) {
        self.elapsed_time = ms;
        self.is_running = false;
        self.start_time = None;
    }

    pub fn matches_url(&self, url: &str) -> bool {
        self.tab_url
            .as_deref()
            .map(|saved| normalize_page_url(saved) == normalize_page_url(url))
            .unwrap_or(false)
    }
}

/// 计时存取
#[derive(Clone)]
pub struct TimerService {
    store: Store,
}

impl TimerService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<TimerState, SyncError> {
        Ok(self.store.get(TIMER_STATE_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, state: &TimerState) -> Result<(), SyncError> {
        self.store.put(TIMER_STATE_KEY, state)
    }

    /// 弹窗重新打开时恢复计时；页面已切换则从零开始
    pub fn restore(&self, active_url: &str) -> Result<TimerState, SyncError> {
        let saved = self.load()?;
        if saved.matches_url(active_url) {
            debug!("Resuming timer for {}", active_url);
            return Ok(saved);
        }

        let fresh = TimerState {
            tab_url: Some(active_url.to_string()),
            ..TimerState::default()
        };
        self.save(&fresh)?;
        Ok(fresh)
    }

    pub fn update(&self, apply: impl FnOnce(&mut TimerState)) -> Result<TimerState, SyncError> {
        let mut state = self.load()?;
        apply(&mut state);
        self.save(&state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manual_time() {
        assert!(parse_manual_time("90:00").is_err());
        assert_eq!(parse_manual_time("1:30:00").unwrap(), 5_400_000);
        assert_eq!(parse_manual_time("45").unwrap(), 45_000);
        assert_eq!(parse_manual_time("12:05").unwrap(), 725_000);
        assert_eq!(parse_manual_time(" 0:59:59 ").unwrap(), 3_599_000);
    }

    #[test]
    fn test_parse_manual_time_rejects_garbage() {
        for input in ["", "abc", "1:60:00", "1::00", "-5", "1:2:3:4", "10:75"] {
            assert!(
                matches!(parse_manual_time(input), Err(SyncError::Validation(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_manual_time_rejects_overflow() {
        for input in ["9999999999999999:00:00", "18446744073709551", "18446744073709551615"] {
            assert!(
                matches!(parse_manual_time(input), Err(SyncError::Validation(_))),
                "{} should be rejected",
                input
            );
        }
        assert_eq!(parse_manual_time("18446744073709").unwrap(), 18_446_744_073_709_000);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(5_400_000), "01:30:00");
        assert_eq!(format_duration(3_599_999), "00:59:59");
    }

    #[test]
    fn test_start_pause_accumulates() {
        let mut state = TimerState::default();
        state.start(1_000, "https://leetcode.com/problems/two-sum/");
        assert_eq!(state.elapsed_at(4_000), 3_000);
        state.pause(4_000);
        state.start(10_000, "https://leetcode.com/problems/two-sum/");
        state.pause(12_000);
        assert_eq!(state.elapsed_time, 5_000);
        assert!(!state.is_running);

        state.reset();
        assert_eq!(state.elapsed_time, 0);
        assert!(state.tab_url.is_some());
    }

    #[test]
    fn test_restore_only_on_same_url() {
        let service = TimerService::new(Store::open_in_memory().unwrap());
        service
            .update(|s| s.start(1_000, "https://leetcode.com/problems/two-sum/"))
            .unwrap();

        let resumed = service.restore("https://leetcode.com/problems/two-sum?tab=description").unwrap();
        assert!(resumed.is_running);

        let fresh = service.restore("https://leetcode.com/problems/3sum/").unwrap();
        assert!(!fresh.is_running);
        assert_eq!(fresh.elapsed_time, 0);
        assert_eq!(service.load().unwrap(), fresh);
    }
}
