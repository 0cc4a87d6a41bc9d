use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_subscriber::{fmt, FmtSubscriber};

/// TracingFactory 是否全局初始化完成
static INIT: OnceCell<Level> = OnceCell::new();

#[derive(Debug, Clone, Default)]
pub struct TracingFactory {

}

impl TracingFactory {
    /// 全局只会初始化一次，之后的调用返回首次设置的级别
    pub fn init_log(debug: bool) -> Level {
        *INIT.get_or_init(|| {
            let level = if debug { Level::DEBUG } else { Level::INFO };

            // Configure a custom event formatter
            let format = fmt::format()
                .with_thread_ids(true) // include the thread ID of the current thread
                .with_thread_names(true)
                .compact(); // use the `Compact` formatting style.

            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .event_format(format)
                .finish();

            if tracing::subscriber::set_global_default(subscriber).is_err() {
                eprintln!("Unable to set global default subscriber, one is already installed");
            }

            level
        })
    }

    pub fn is_init() -> bool {
        INIT.get().is_some()
    }
}
