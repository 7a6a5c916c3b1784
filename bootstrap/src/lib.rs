//! notify-bootstrap - 统一服务启动骨架
//!
//! 配置加载、日志、基础设施、健康检查端口和 gRPC 服务器生命周期

mod health;
mod infrastructure;
mod interceptor;
mod metrics;
mod reflection;
mod retry;
mod runtime;
mod starter;

pub use health::*;
pub use infrastructure::*;
pub use interceptor::*;
pub use self::metrics::*;
pub use reflection::*;
pub use retry::*;
pub use runtime::*;
pub use starter::*;
