pub mod tracing_factory;


use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// 测试使用的日志初始化，多个测试重复调用时忽略已设置的 subscriber
pub fn init_test_log() {
    let _ = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .try_init();
}
