//! Deployer - Docker 服务部署工具
//!
//! 构建镜像、推送到 registry、通过 SSH 在远程主机上重新部署容器

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;
