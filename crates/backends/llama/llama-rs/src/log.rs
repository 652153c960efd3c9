// llama-rs/src/log.rs
//
// Forwards llama.cpp and ggml log lines into `tracing` (target "llama_cpp").

use std::ffi::{c_char, c_void, CStr};

use llama_cpp_sys_2::{
    ggml_log_level, llama_log_set, GGML_LOG_LEVEL_ERROR, GGML_LOG_LEVEL_INFO,
    GGML_LOG_LEVEL_WARN,
};

pub(crate) fn route_to_tracing() {
    unsafe { llama_log_set(Some(forward), std::ptr::null_mut()) };
}

unsafe extern "C" fn forward(level: ggml_log_level, text: *const c_char, _user: *mut c_void) {
    if text.is_null() {
        return;
    }
    let raw = CStr::from_ptr(text).to_string_lossy();
    let line = raw.trim_end();
    if line.is_empty() {
        return;
    }
    match level {
        GGML_LOG_LEVEL_ERROR => tracing::error!(target: "llama_cpp", "{line}"),
        GGML_LOG_LEVEL_WARN => tracing::warn!(target: "llama_cpp", "{line}"),
        GGML_LOG_LEVEL_INFO => tracing::info!(target: "llama_cpp", "{line}"),
        // DEBUG and CONT (continuation of the previous line)
        _ => tracing::debug!(target: "llama_cpp", "{line}"),
    }
}
