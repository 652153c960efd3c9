// llama-rs/src/ffi.rs
//
// Process-wide llama.cpp calls and upstream parameter defaults.
// Start from upstream default_*_params() so new header fields keep working.

use std::sync::OnceLock;

use llama_cpp_sys_2::{
    ggml_backend_load_all, llama_backend_free, llama_backend_init, llama_model_default_params,
    llama_model_params, llama_sampler_chain_default_params, llama_sampler_chain_params,
};
use tracing::{debug, trace};

/// one-time flags to prevent double init/deinit
static INIT_CALLED: OnceLock<()> = OnceLock::new();
static DEINIT_CALLED: OnceLock<()> = OnceLock::new();

/// Initialize llama.cpp and register every available ggml backend.
/// Returns false when the process already did this.
pub fn init_backend() -> bool {
    if INIT_CALLED.set(()).is_ok() {
        debug!("[ffi] llama_backend_init()");
        unsafe {
            llama_backend_init();
            ggml_backend_load_all();
        }
        true
    } else {
        trace!("[ffi] init_backend() called again, ignored");
        false
    }
}

pub fn deinit_backend() {
    if DEINIT_CALLED.set(()).is_ok() {
        debug!("[ffi] llama_backend_free()");
        unsafe { llama_backend_free() };
    } else {
        trace!("[ffi] deinit_backend() called again, ignored");
    }
}

/// Model params: upstream defaults plus the requested GPU offload.
pub fn default_model_params(n_gpu_layers: i32) -> llama_model_params {
    let mut p = unsafe { llama_model_default_params() };
    p.n_gpu_layers = n_gpu_layers;
    p.use_mmap = true;
    p
}

/// Sampler chain params with performance counters on.
pub fn default_chain_params() -> llama_sampler_chain_params {
    let mut p = unsafe { llama_sampler_chain_default_params() };
    p.no_perf = false;
    p
}
