//! Safe wrappers over the llama.cpp C API.
//!
//! Every raw handle lives in exactly one RAII type here. Higher layers only
//! see `baseinf_abi` traits and never touch `llama_cpp_sys_2` directly.

pub mod backend;
pub mod batch;
pub mod context;
pub mod ffi;
mod log;
pub mod model;
pub mod params;
pub mod sampling;
pub mod session;
pub mod token;

pub use backend::LlamaBackend;
pub use model::LlamaModel;
pub use params::LlamaParams;
pub use session::LlamaSession;
