use std::io::Write;
use std::time::Instant;

use baseinf_abi::backend::{InferenceSession, TextModel};
use baseinf_abi::error::Result;
use baseinf_abi::token::Token;
use tracing::{debug, trace};

use super::GenerationDriver;
use crate::output::PieceWriter;
use crate::stats::{GenerationReport, StopReason};

impl<M: TextModel, S: InferenceSession> GenerationDriver<'_, M, S> {
    /// Generate up to `n_predict` tokens after `prompt`, streaming each
    /// piece to `out` as soon as it is sampled.
    ///
    /// Exactly one batch is pending at any time: the whole prompt first,
    /// then the single token sampled in the previous step. Any engine error
    /// ends the run immediately; nothing is retried.
    pub fn run<W: Write>(
        &mut self,
        prompt: &[Token],
        n_predict: usize,
        out: &mut PieceWriter<W>,
    ) -> Result<GenerationReport> {
        let n_prompt = prompt.len();
        let limit = n_prompt + n_predict;

        let mut pending = self.first_batch(prompt)?;
        let mut n_past: usize = 0;
        let mut n_decode: usize = 0;
        let mut stop = StopReason::BudgetExhausted;

        let started = Instant::now();

        // n_decode < n_predict only binds for encoder-decoder models, whose
        // decoder positions do not count the encoded prompt.
        while n_past + pending.len() < limit && n_decode < n_predict {
            trace!("[decode] n_past={n_past} batch={}", pending.len());
            self.session.decode(&pending, n_past)?;
            n_past += pending.len();

            let token = self.session.sample()?;
            if self.model.is_end_of_generation(token) {
                debug!("[decode] end-of-generation token {token} after {n_decode} tokens");
                pending.clear();
                stop = StopReason::EndOfGeneration;
                break;
            }

            let piece = self.model.token_to_piece(token)?;
            out.write_piece(&piece)?;
            trace!("[decode] sampled {token} ({} bytes)", piece.len());

            pending.clear();
            pending.push(token);
            n_decode += 1;
        }

        let elapsed = started.elapsed();
        debug!("[decode] done: {n_decode} tokens, n_past={n_past}, stop={stop:?}");

        Ok(GenerationReport {
            n_prompt,
            n_predict,
            n_decode,
            n_past,
            n_pending: pending.len(),
            stop,
            elapsed,
        })
    }
}
