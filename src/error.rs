//! 错误类型
//!
//! 去重检测是尽力而为的，不会返回这些错误；保存路径则会把它们原样传给调用方。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Problem page not recognized: {0}")]
    Extraction(String),

    #[error("Failed to fetch database schema ({status}): {message}")]
    SchemaFetch { status: u16, message: String },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Network error: {message}")]
    Network { status: Option<u16>, message: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Local store is unavailable")]
    StoreUnavailable,
}

impl SyncError {
    pub fn extraction(message: impl Into<String>) -> Self {
        SyncError::Extraction(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        SyncError::Schema(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    pub fn network(status: Option<u16>, message: impl Into<String>) -> Self {
        SyncError::Network {
            status,
            message: message.into(),
        }
    }

    /// 展示给用户的提示文本
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Extraction(reason) => {
                format!("Could not read this problem page ({}). Please reload the page and try again.", reason)
            }
            SyncError::SchemaFetch { status, message } => {
                format!("Could not load your Notion database ({}): {}", status, message)
            }
            SyncError::Schema(reason) => {
                format!("Your Notion database is missing a required column: {}", reason)
            }
            SyncError::Network { message, .. } => message.clone(),
            SyncError::Validation(reason) => reason.clone(),
            SyncError::Storage(_) | SyncError::Serialization(_) | SyncError::Io(_) | SyncError::StoreUnavailable => {
                format!("Local storage failed: {}", self)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_message_is_passed_through() {
        let err = SyncError::network(Some(400), "body failed validation");
        assert_eq!(err.user_message(), "body failed validation");
    }

    #[test]
    fn test_schema_message_names_the_column() {
        let err = SyncError::schema("no title property");
        assert!(err.user_message().contains("no title property"));
    }
}
