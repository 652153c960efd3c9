use std::io::{self, Write};
use std::time::Duration;

use baseinf_abi::backend::PerfCounters;

/// Why the decode loop ended. Neither case is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The sampler produced an end-of-generation token (not emitted).
    EndOfGeneration,
    /// Positions consumed + pending batch reached prompt + predict.
    BudgetExhausted,
}

/// What one pass of the generation loop did.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub n_prompt: usize,
    pub n_predict: usize,
    /// Tokens sampled and streamed.
    pub n_decode: usize,
    /// Positions the engine has consumed (the position counter).
    pub n_past: usize,
    /// Tokens sampled but never submitted (the last token on a budget stop).
    pub n_pending: usize,
    pub stop: StopReason,
    /// Wall-clock time of the decode loop.
    pub elapsed: Duration,
}

impl GenerationReport {
    pub fn tokens_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.n_decode as f64 / secs
        } else {
            0.0
        }
    }

    pub fn write_summary<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "=== Statistics ===")?;
        writeln!(out, "Tokens generated: {}", self.n_decode)?;
        writeln!(out, "Time: {:.2} s", self.elapsed.as_secs_f64())?;
        writeln!(out, "Speed: {:.2} tokens/s", self.tokens_per_second())?;
        writeln!(out)
    }
}

fn per_token(ms: f64, n: i32) -> (f64, f64) {
    if n <= 0 || ms <= 0.0 {
        return (0.0, 0.0);
    }
    let ms_per = ms / n as f64;
    (ms_per, 1e3 / ms_per)
}

/// Engine counters in the same shape llama.cpp prints them.
pub fn write_perf<W: Write>(perf: &PerfCounters, out: &mut W) -> io::Result<()> {
    let (s_ms, s_tps) = per_token(perf.sample_ms, perf.n_sample);
    let (p_ms, p_tps) = per_token(perf.prompt_eval_ms, perf.n_prompt_eval);
    let (e_ms, e_tps) = per_token(perf.eval_ms, perf.n_eval);

    writeln!(out, "=== Engine Counters ===")?;
    writeln!(
        out,
        "sampling time    = {:10.2} ms / {:5} runs   ({:8.2} ms per token, {:8.2} tokens per second)",
        perf.sample_ms, perf.n_sample, s_ms, s_tps
    )?;
    writeln!(out, "load time        = {:10.2} ms", perf.load_ms)?;
    writeln!(
        out,
        "prompt eval time = {:10.2} ms / {:5} tokens ({:8.2} ms per token, {:8.2} tokens per second)",
        perf.prompt_eval_ms, perf.n_prompt_eval, p_ms, p_tps
    )?;
    writeln!(
        out,
        "eval time        = {:10.2} ms / {:5} runs   ({:8.2} ms per token, {:8.2} tokens per second)",
        perf.eval_ms, perf.n_eval, e_ms, e_tps
    )
}
