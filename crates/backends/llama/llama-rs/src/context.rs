// Borrowed context tied to a model's lifetime. All mutation lives here; the
// `LlamaModel` itself is immutable once loaded.

use std::marker::PhantomData;
use std::ptr::NonNull;

use baseinf_abi::error::{EngineError, Result};
use llama_cpp_sys_2::{
    llama_context, llama_decode, llama_encode, llama_free, llama_init_from_model, llama_n_ctx,
    llama_perf_context, llama_perf_context_data,
};
use tracing::debug;

use crate::batch::LlamaBatch;
use crate::model::LlamaModel;
use crate::params::LlamaParams;

pub struct LlamaContext<'m> {
    ctx: NonNull<llama_context>,
    _model: PhantomData<&'m LlamaModel>,
}

impl<'m> LlamaContext<'m> {
    pub fn new(model: &'m LlamaModel, params: &LlamaParams) -> Result<Self> {
        debug!(
            "[ffi] llama_init_from_model(n_ctx={}, n_batch={}, n_threads={}/{})",
            params.n_ctx, params.n_batch, params.n_threads, params.n_threads_batch
        );
        let ptr = unsafe { llama_init_from_model(model.as_ptr(), params.to_ffi()) };
        let ctx = NonNull::new(ptr).ok_or_else(|| {
            EngineError::ContextCreate(format!(
                "llama_init_from_model returned null (n_ctx={}, n_batch={})",
                params.n_ctx, params.n_batch
            ))
        })?;
        Ok(Self {
            ctx,
            _model: PhantomData,
        })
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut llama_context {
        self.ctx.as_ptr()
    }

    /// Context window actually granted by llama.cpp.
    pub fn n_ctx(&self) -> u32 {
        unsafe { llama_n_ctx(self.ctx.as_ptr()) }
    }

    /// Run the decoder over `batch`. Nonzero llama.cpp codes come back as `Err`.
    pub fn decode(&mut self, batch: &LlamaBatch) -> std::result::Result<(), i32> {
        match unsafe { llama_decode(self.ctx.as_ptr(), batch.raw()) } {
            0 => Ok(()),
            rc => Err(rc),
        }
    }

    /// Run the encoder over `batch` (encoder-decoder models).
    pub fn encode(&mut self, batch: &LlamaBatch) -> std::result::Result<(), i32> {
        match unsafe { llama_encode(self.ctx.as_ptr(), batch.raw()) } {
            0 => Ok(()),
            rc => Err(rc),
        }
    }

    pub fn perf(&self) -> llama_perf_context_data {
        unsafe { llama_perf_context(self.ctx.as_ptr()) }
    }
}

impl Drop for LlamaContext<'_> {
    fn drop(&mut self) {
        debug!("[ffi] llama_free(context)");
        unsafe { llama_free(self.ctx.as_ptr()) };
    }
}
