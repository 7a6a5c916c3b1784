//! Notification Registry - 推送订阅注册表
//!
//! 记录每个 installation 的推送 token 和它订阅的 topic，供推送扇出系统查询

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
