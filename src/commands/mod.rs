// 命令模块
// UI 调用的入口，错误统一转成给用户看的文本

pub mod problem;
pub mod session;
pub mod settings;
pub mod timer;

pub use problem::{check_duplicate, extract_problem, save_problem, update_flags, SaveOutcome};
pub use session::{RemoteTarget, Session};
pub use settings::{configure, get_settings, SettingsView};
pub use timer::{pause_timer, reset_timer, restore_timer, set_manual_time, start_timer, TimerView};
