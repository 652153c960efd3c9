use crate::ffi;
use crate::log;

/// Process guard for llama.cpp.
///
/// Create one near process start, before any model is loaded, and keep it
/// alive until every model is gone. Dropping it frees the backend.
pub struct LlamaBackend {
    _private: (),
}

impl LlamaBackend {
    /// Route engine logs into `tracing`, initialize llama.cpp and load the
    /// ggml compute backends. Repeated calls are harmless.
    pub fn init() -> Self {
        log::route_to_tracing();
        if !ffi::init_backend() {
            tracing::debug!("[backend] already initialized");
        }
        Self { _private: () }
    }
}

impl Drop for LlamaBackend {
    fn drop(&mut self) {
        ffi::deinit_backend();
    }
}
