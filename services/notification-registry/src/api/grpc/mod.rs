//! gRPC 服务模块

mod conversions;
mod notifications_service;

pub use notifications_service::NotificationsServiceImpl;
