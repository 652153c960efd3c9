use std::io::Write;

use baseinf_abi::backend::{InferenceSession, SessionParams, TextModel};
use baseinf_abi::error::{EngineError, Result};
use tracing::{debug, info};

use super::GenerationDriver;
use crate::config::RunConfig;
use crate::output::PieceWriter;
use crate::stats::{GenerationReport, StopReason, write_perf};

/// Load the model named by `config`, generate, print statistics.
///
/// Everything the user sees goes to `out`. Resources are released in
/// reverse order of acquisition on every path: the session (sampler, then
/// context) inside [`run_with_model`], the model when this function returns.
pub fn run<M: TextModel, W: Write>(config: &RunConfig, out: &mut W) -> Result<GenerationReport> {
    writeln!(out)?;
    writeln!(out, "=== LLM Inference Starting ===")?;
    writeln!(out, "Model: {}", config.model_path.display())?;
    writeln!(out, "Prompt: \"{}\"", config.prompt)?;
    writeln!(out, "Tokens to generate: {}", config.n_predict)?;
    writeln!(out, "GPU layers: {}", config.n_gpu_layers)?;
    writeln!(out)?;

    writeln!(out, "Loading model...")?;
    out.flush()?;
    let model = M::load(&config.model_path, &config.model_params())?;
    info!("model loaded from {}", config.model_path.display());
    writeln!(out, "Model loaded successfully!")?;
    writeln!(out)?;

    let report = run_with_model(&model, config, out)?;
    drop(model);

    writeln!(out)?;
    writeln!(out, "=== Inference Complete ===")?;
    out.flush()?;
    Ok(report)
}

/// Everything after model load: tokenize, open a session, echo the prompt,
/// drive generation, report.
pub fn run_with_model<M: TextModel, W: Write>(
    model: &M,
    config: &RunConfig,
    out: &mut W,
) -> Result<GenerationReport> {
    writeln!(out, "Tokenizing prompt...")?;
    let prompt_tokens = model.tokenize(&config.prompt)?;
    if prompt_tokens.is_empty() {
        return Err(EngineError::Tokenize("prompt produced no tokens".into()));
    }
    writeln!(out, "Tokenized into {} tokens", prompt_tokens.len())?;
    writeln!(out)?;

    let params = SessionParams::for_budget(prompt_tokens.len(), config.n_predict);
    debug!("session params: n_ctx={} n_batch={}", params.n_ctx, params.n_batch);

    writeln!(out, "Creating context...")?;
    out.flush()?;
    let mut session = model.new_session(&params)?;
    writeln!(out, "Context created successfully!")?;
    writeln!(out)?;

    writeln!(out, "=== Output ===")?;
    let report = {
        let mut writer = PieceWriter::new(&mut *out);
        for &token in &prompt_tokens {
            writer.write_piece(&model.token_to_piece(token)?)?;
        }

        let report = GenerationDriver::new(model, &mut session).run(
            &prompt_tokens,
            config.n_predict,
            &mut writer,
        )?;
        writer.finish()?;
        report
    };

    if report.stop == StopReason::EndOfGeneration {
        writeln!(out)?;
        writeln!(out, "[End of generation]")?;
    }
    writeln!(out)?;
    writeln!(out)?;

    report.write_summary(out)?;
    if let Some(perf) = session.perf() {
        write_perf(&perf, out)?;
    }
    out.flush()?;

    info!(
        "generated {} tokens in {:.2}s ({:?})",
        report.n_decode,
        report.elapsed.as_secs_f64(),
        report.stop
    );
    Ok(report)
}
