// llama-rs/src/batch.rs
//
// Thin RAII wrapper over `llama_batch`.
// - Alloc via `llama_batch_init` (token mode, one sequence)
// - llama.cpp owns every array, including the per-token seq_id slots
// - Reuse with `clear()`; drop frees the storage

use baseinf_abi::token::Token;
use llama_cpp_sys_2::{llama_batch, llama_batch_free, llama_batch_init};

use crate::token::to_raw;

/// The batch has no room for another token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchFull {
    pub capacity: usize,
}

pub struct LlamaBatch {
    raw: llama_batch,
    capacity: usize,
}

impl LlamaBatch {
    /// Token batch holding up to `capacity` tokens of sequence 0.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let n = i32::try_from(capacity).unwrap_or(i32::MAX);
        let raw = unsafe { llama_batch_init(n, 0, 1) };
        Self {
            raw,
            capacity: n as usize,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.raw.n_tokens as usize
    }

    pub fn is_empty(&self) -> bool {
        self.raw.n_tokens == 0
    }

    /// Append one token at absolute position `pos`.
    pub fn add(&mut self, token: Token, pos: usize, logits: bool) -> Result<(), BatchFull> {
        let index = self.len();
        if index >= self.capacity {
            return Err(BatchFull {
                capacity: self.capacity,
            });
        }

        unsafe {
            *self.raw.token.add(index) = to_raw(token);
            *self.raw.pos.add(index) = pos as i32;
            *self.raw.n_seq_id.add(index) = 1;
            *(*self.raw.seq_id.add(index)) = 0;
            *self.raw.logits.add(index) = logits as i8;
        }
        self.raw.n_tokens += 1;
        Ok(())
    }

    /// Replace the contents with `tokens` at positions `n_past..`; only the
    /// last token asks for logits. Leaves the batch empty if `tokens` do not fit.
    pub fn set_tokens(&mut self, tokens: &[Token], n_past: usize) -> Result<(), BatchFull> {
        self.clear();
        if tokens.len() > self.capacity {
            return Err(BatchFull {
                capacity: self.capacity,
            });
        }
        let last = tokens.len().saturating_sub(1);
        for (i, &token) in tokens.iter().enumerate() {
            self.add(token, n_past + i, i == last)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.raw.n_tokens = 0;
    }

    #[inline]
    pub(crate) fn raw(&self) -> llama_batch {
        self.raw
    }
}

impl Drop for LlamaBatch {
    fn drop(&mut self) {
        unsafe { llama_batch_free(self.raw) };
    }
}
