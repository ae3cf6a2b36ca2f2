use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "leetnote";
const DB_FILE_NAME: &str = "leetnote.db";
const LOG_FILE_NAME: &str = "leetnote.log";

pub fn get_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| {
            let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(".local/share");
            path.push(APP_DIR_NAME);
            path
        })
}

pub fn get_database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE_NAME)
}

pub fn get_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE_NAME)
}

/// 去掉查询串、锚点和末尾斜杠，用于比较两个页面地址是否指向同一题
pub fn normalize_page_url(url: &str) -> String {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_lives_in_data_dir() {
        let dir = PathBuf::from("/tmp/leetnote-test");
        assert_eq!(get_database_path(&dir), dir.join("leetnote.db"));
    }

    #[test]
    fn test_normalize_page_url() {
        assert_eq!(
            normalize_page_url("https://leetcode.com/problems/two-sum/?envType=list#x"),
            "https://leetcode.com/problems/two-sum"
        );
        assert_eq!(
            normalize_page_url("https://leetcode.com/problems/two-sum"),
            "https://leetcode.com/problems/two-sum"
        );
    }
}
