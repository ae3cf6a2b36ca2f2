// 本地持久化键值存储
// 基于 SQLite，值以 JSON 文本保存；缓存、计时和设置共用一张表

use crate::error::SyncError;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// 键值存储服务
#[derive(Clone)]
pub struct Store {
    pool: Arc<Mutex<Connection>>,
}

impl Store {
    /// 打开（必要时创建）数据库文件
    pub fn open(db_path: &Path) -> Result<Self, SyncError> {
        // 确保数据目录存在
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        let store = Self {
            pool: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        Ok(store)
    }

    /// 内存数据库，测试用
    pub fn open_in_memory() -> Result<Self, SyncError> {
        let store = Self {
            pool: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), SyncError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SyncError> {
        self.pool.lock().map_err(|_| SyncError::StoreUnavailable)
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<String>, SyncError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            rusqlite::params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SyncError> {
        match self.get_raw(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SyncError> {
        let text = serde_json::to_string(value)?;
        self.put_raw(key, &text)
    }

    /// 删除键；键不存在时不报错
    pub fn remove(&self, key: &str) -> Result<bool, SyncError> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM kv_store WHERE key = ?", rusqlite::params![key])?;
        Ok(affected > 0)
    }

    pub fn contains(&self, key: &str) -> Result<bool, SyncError> {
        Ok(self.get_raw(key)?.is_some())
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SyncError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT key FROM kv_store WHERE key LIKE ? ESCAPE '\\' ORDER BY key")?;
        let pattern = format!("{}%", prefix.replace('%', "\\%").replace('_', "\\_"));
        let rows = stmt.query_map(rusqlite::params![pattern], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimerState;

    #[test]
    fn test_put_get_remove() {
        let store = Store::open_in_memory().unwrap();
        let state = TimerState {
            elapsed_time: 1500,
            is_running: true,
            start_time: Some(42),
            tab_url: None,
        };

        store.put("timerState", &state).unwrap();
        assert_eq!(store.get::<TimerState>("timerState").unwrap(), Some(state));

        assert!(store.remove("timerState").unwrap());
        assert!(!store.remove("timerState").unwrap());
        assert_eq!(store.get::<TimerState>("timerState").unwrap(), None);
    }

    #[test]
    fn test_overwrite_keeps_single_row() {
        let store = Store::open_in_memory().unwrap();
        store.put_raw("k", "\"a\"").unwrap();
        store.put_raw("k", "\"b\"").unwrap();
        assert_eq!(store.get::<String>("k").unwrap().as_deref(), Some("b"));
        assert_eq!(store.keys_with_prefix("k").unwrap(), vec!["k".to_string()]);
    }

    #[test]
    fn test_prefix_listing() {
        let store = Store::open_in_memory().unwrap();
        store.put("problem_1", &1).unwrap();
        store.put("problem_22", &22).unwrap();
        store.put("problems", &0).unwrap();
        store.put("timerState", &0).unwrap();
        assert_eq!(
            store.keys_with_prefix("problem_").unwrap(),
            vec!["problem_1".to_string(), "problem_22".to_string()]
        );
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("leetnote.db");
        {
            let store = Store::open(&path).unwrap();
            store.put("notionDatabaseId", &"abc").unwrap();
        }
        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.get::<String>("notionDatabaseId").unwrap().as_deref(), Some("abc"));
    }
}
