// 保活定时器
// 大约每分钟做一次空读，防止宿主进程空闲退出；不含业务逻辑

use super::store::Store;
use log::trace;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);
const KEEP_ALIVE_KEY: &str = "keepAlive";

pub fn spawn_keep_alive(store: Store) -> JoinHandle<()> {
    spawn_keep_alive_every(store, KEEP_ALIVE_INTERVAL)
}

pub fn spawn_keep_alive_every(store: Store, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let _ = store.get_raw(KEEP_ALIVE_KEY);
            trace!("keep-alive tick");
        }
    })
}
