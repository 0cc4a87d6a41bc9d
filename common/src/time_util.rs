use chrono::Local;

/// 获取当前时间的毫秒数
pub fn now_millis() -> i64 {
    Local::now().timestamp_millis()
}

/// 获取当前时间的格式化输出
pub fn now_str() -> String {
    let chrono_time = Local::now();

    chrono_time.format("%Y-%m-%d %H:%M:%S").to_string()
}
