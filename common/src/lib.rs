pub mod config;
pub mod log;
pub mod err;
pub mod lifecycle;

pub mod schema;

pub mod file_util;
pub mod time_util;
