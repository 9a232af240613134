//! 服务层

pub mod deploy;
