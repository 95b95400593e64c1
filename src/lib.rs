//! Assignment Tracker - 作业提交与评分服务
//!
//! 基于 Actix Web 构建：学生按任务规则提交附件或文本，教师评分、退回，
//! 任务所有者在收到提交时获得站内通知。
//!
//! # 架构
//! - `blob_store`: 附件存储（本地目录/内存）
//! - `cache`: 缓存层（Moka）
//! - `config`: 配置管理
//! - `entity`: SeaORM 数据库实体
//! - `errors`: 统一错误处理
//! - `middlewares`: 认证授权与限流中间件
//! - `models`: 数据模型定义
//! - `notifier`: 提交通知
//! - `policy`: 访问控制规则
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层
//! - `storage`: 数据存储层（SeaORM）
//! - `utils`: 工具函数

pub mod blob_store;
pub mod cache;
pub mod config;
pub mod entity;
pub mod errors;
pub mod middlewares;
pub mod models;
pub mod notifier;
pub mod policy;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
