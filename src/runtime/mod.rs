//! 进程启动：存储、协作方与 HTTP 服务器的装配

pub mod server;

pub use server::{prepare_state, run_server};
