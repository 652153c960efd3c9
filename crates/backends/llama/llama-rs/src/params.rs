// llama-rs/src/params.rs
//
// Context parameters for one session, converted into llama_context_params.
// Thread counts default to physical cores and can be overridden from the
// environment.

use baseinf_abi::backend::SessionParams;
use llama_cpp_sys_2::{llama_context_default_params, llama_context_params};
use tracing::warn;

/// Decode threads (one token at a time).
pub const ENV_N_THREADS: &str = "BASEINF_N_THREADS";
/// Prompt-processing threads (whole batch).
pub const ENV_N_THREADS_BATCH: &str = "BASEINF_N_THREADS_BATCH";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlamaParams {
    pub n_ctx: u32,
    pub n_batch: u32,
    /// Physical batch. The encoder cannot split a batch, so this matches `n_batch`.
    pub n_ubatch: u32,
    pub n_threads: i32,
    pub n_threads_batch: i32,
    pub no_perf: bool,
}

impl LlamaParams {
    /// Params for `session`, with thread overrides read from the process environment.
    pub fn for_session(session: &SessionParams) -> Self {
        Self::from_lookup(session, |key| std::env::var(key).ok())
    }

    /// Same as [`LlamaParams::for_session`] with an injectable variable lookup.
    pub fn from_lookup<F>(session: &SessionParams, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut p = Self {
            n_ctx: session.n_ctx,
            n_batch: session.n_batch,
            n_ubatch: session.n_batch,
            n_threads: thread_override(&lookup, ENV_N_THREADS).unwrap_or(0),
            n_threads_batch: thread_override(&lookup, ENV_N_THREADS_BATCH).unwrap_or(0),
            no_perf: false,
        };
        p.normalize_threads();
        p
    }

    /// Build FFI params from upstream defaults, then override what we care about.
    pub fn to_ffi(&self) -> llama_context_params {
        let mut p = unsafe { llama_context_default_params() };

        p.n_ctx = self.n_ctx;
        p.n_batch = self.n_batch;
        p.n_ubatch = self.n_ubatch;
        p.n_seq_max = 1;

        p.n_threads = self.n_threads;
        p.n_threads_batch = self.n_threads_batch;

        p.embeddings = false;
        p.no_perf = self.no_perf;
        p
    }

    /// Fill thread counts if unset using physical cores (fallback to logical).
    fn normalize_threads(&mut self) {
        let cores = default_threads();
        if self.n_threads <= 0 {
            self.n_threads = cores;
        }
        if self.n_threads_batch <= 0 {
            self.n_threads_batch = self.n_threads;
        }
    }
}

fn default_threads() -> i32 {
    let physical = num_cpus::get_physical();
    let cores = if physical > 0 { physical } else { num_cpus::get() };
    i32::try_from(cores).unwrap_or(i32::MAX).max(1)
}

fn thread_override<F>(lookup: &F, key: &str) -> Option<i32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<i32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            warn!("[params] ignoring {key}={raw:?}: expected a positive integer");
            None
        }
    }
}
