//! 计时命令

use super::session::Session;
use crate::models::TimerState;
use crate::services::{format_duration, parse_manual_time};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// 给 UI 渲染用的计时状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub elapsed_ms: u64,
    pub display: String,
    pub is_running: bool,
}

impl TimerView {
    fn at(state: &TimerState, now_ms: i64) -> Self {
        let elapsed_ms = state.elapsed_at(now_ms);
        Self {
            elapsed_ms,
            display: format_duration(elapsed_ms),
            is_running: state.is_running,
        }
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// 弹窗打开时调用
pub fn restore_timer(session: &Session, active_url: &str) -> Result<TimerView, String> {
    let state = session.timer().restore(active_url).map_err(|e| e.user_message())?;
    Ok(TimerView::at(&state, now_ms()))
}

pub fn start_timer(session: &Session, active_url: &str) -> Result<TimerView, String> {
    let now = now_ms();
    let state = session
        .timer()
        .update(|state| state.start(now, active_url))
        .map_err(|e| e.user_message())?;
    Ok(TimerView::at(&state, now))
}

pub fn pause_timer(session: &Session) -> Result<TimerView, String> {
    let now = now_ms();
    let state = session
        .timer()
        .update(|state| state.pause(now))
        .map_err(|e| e.user_message())?;
    Ok(TimerView::at(&state, now))
}

pub fn reset_timer(session: &Session) -> Result<TimerView, String> {
    let state = session
        .timer()
        .update(TimerState::reset)
        .map_err(|e| e.user_message())?;
    Ok(TimerView::at(&state, now_ms()))
}

/// 手动输入用时（`H:MM:SS`、`MM:SS` 或秒数）
pub fn set_manual_time(session: &Session, input: &str) -> Result<TimerView, String> {
    let ms = parse_manual_time(input).map_err(|e| e.user_message())?;
    let state = session
        .timer()
        .update(|state| state.set_elapsed(ms))
        .map_err(|e| e.user_message())?;
    Ok(TimerView::at(&state, now_ms()))
}
