//! 设置命令

use super::session::Session;
use crate::services::{NotionSettings, SaveHost};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub configured: bool,
    /// 只显示末尾四位
    pub token_hint: Option<String>,
    pub database_id: Option<String>,
    pub save_host: SaveHost,
}

impl From<NotionSettings> for SettingsView {
    fn from(settings: NotionSettings) -> Self {
        Self {
            configured: settings.credentials().is_ok(),
            token_hint: settings.token.as_deref().map(mask_token),
            database_id: settings.database_id,
            save_host: settings.save_host,
        }
    }
}

fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{}", tail)
}

/// 校验并保存凭据
pub fn configure(session: &Session, token: &str, database_id: &str, save_host: &str) -> Result<SettingsView, String> {
    let save_host = SaveHost::parse(save_host).map_err(|e| e.user_message())?;
    let settings =
        NotionSettings::save(session.store(), token, database_id, save_host).map_err(|e| e.user_message())?;
    info!("Notion settings saved (save host: {:?})", settings.save_host);
    Ok(settings.into())
}

pub fn get_settings(session: &Session) -> Result<SettingsView, String> {
    session
        .settings()
        .map(SettingsView::from)
        .map_err(|e| e.user_message())
}
