//! base-inf engine: the greedy generation driver and the run pipeline around it.

use baseinf_abi::backend::{InferenceSession, TextModel};

// Child modules (private to this crate). They can access private fields here.
mod decode;
mod pipeline;
mod prefill;
pub(crate) mod utils;

#[cfg(test)]
pub(crate) mod mock;

pub use pipeline::{run, run_with_model};

/// Drives one generation: prompt in, one token per step out.
///
/// Borrows the model (vocabulary queries) and the session (encode, decode,
/// sample). All loop state lives on the stack of [`GenerationDriver::run`];
/// the driver itself keeps nothing between runs.
pub struct GenerationDriver<'a, M: TextModel, S: InferenceSession> {
    model: &'a M,
    session: &'a mut S,
}

impl<'a, M: TextModel, S: InferenceSession> GenerationDriver<'a, M, S> {
    pub fn new(model: &'a M, session: &'a mut S) -> Self {
        Self { model, session }
    }
}
