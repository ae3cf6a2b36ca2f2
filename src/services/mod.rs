// 服务模块
// 提取、缓存、远程结构解析、去重与写入

pub mod cache;
pub mod code;
pub mod extractor;
pub mod keepalive;
pub mod notion;
pub mod reconciler;
pub mod schema;
pub mod settings;
pub mod store;
pub mod timer;
pub mod writer;

pub use cache::VolatileCache;
pub use code::{reconstruct_code, VisualLine};
pub use extractor::{PageCache, PageFieldExtractor, PageSnapshot};
pub use keepalive::spawn_keep_alive;
pub use notion::{NotionApi, NotionClient};
pub use reconciler::{BackgroundVerification, DuplicateCheck, DuplicateReconciler, DuplicateStatus};
pub use schema::{fetch_schema, resolve_property, ResolvedProperty};
pub use settings::{NotionSettings, SaveHost};
pub use store::Store;
pub use timer::{format_duration, parse_manual_time, TimerService};
pub use writer::RecordWriter;
