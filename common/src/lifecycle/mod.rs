use crate::err::CResult;

/// 可启停的组件
pub trait Lifecycle: Send + Sync {
    /// 启动。已经启动时直接返回
    fn open(&self) -> CResult<()>;

    /// 关闭, 等待内部线程退出
    fn close(&self) -> CResult<()>;

    fn is_started(&self) -> bool;
}
