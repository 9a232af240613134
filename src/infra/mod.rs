//! 基础设施层：对外部工具的真实实现

pub mod docker;
pub mod ssh;
