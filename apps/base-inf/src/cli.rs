use std::ffi::OsString;
use std::path::PathBuf;

use baseinf_abi::backend::DEFAULT_N_GPU_LAYERS;
use baseinf_core::{DEFAULT_N_PREDICT, DEFAULT_PROMPT, RunConfig};
use clap::Parser;

/// Flags that consume the next argument as their value.
const VALUE_FLAGS: &[&str] = &["-m", "--model", "-n", "--n-predict", "-ngl", "--ngl", "--n-gpu-layers"];
/// Flags that stand alone.
const SWITCH_FLAGS: &[&str] = &["-v", "--verbose", "-h", "--help", "-V", "--version"];

fn is_known_flag(arg: &str) -> bool {
    if VALUE_FLAGS.contains(&arg) || SWITCH_FLAGS.contains(&arg) {
        return true;
    }
    // --model=PATH and friends
    arg.split_once('=')
        .is_some_and(|(flag, _)| flag.starts_with("--") && VALUE_FLAGS.contains(&flag))
}

#[derive(Parser, Debug)]
#[command(
    name = "base-inf",
    version,
    about = "Greedy text generation with a llama.cpp model",
    override_usage = "base-inf -m <model.gguf> [-n <n_predict>] [-ngl <n_gpu_layers>] [prompt...]"
)]
pub struct Args {
    /// Path to the GGUF model file
    #[arg(short = 'm', long = "model", value_name = "PATH")]
    pub model: PathBuf,

    /// Number of tokens to generate after the prompt
    #[arg(short = 'n', long = "n-predict", value_name = "N", default_value_t = DEFAULT_N_PREDICT)]
    pub n_predict: usize,

    /// Number of layers to offload to the GPU (also accepted as -ngl)
    #[arg(
        long = "ngl",
        visible_alias = "n-gpu-layers",
        value_name = "N",
        default_value_t = DEFAULT_N_GPU_LAYERS,
        allow_negative_numbers = true
    )]
    pub n_gpu_layers: i32,

    /// Log engine diagnostics to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Prompt words; everything from the first word on belongs to the prompt
    #[arg(value_name = "PROMPT", num_args = 1.., trailing_var_arg = true)]
    pub prompt: Vec<String>,
}

impl Args {
    pub fn try_parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self::try_parse_from(normalize_args(args.into_iter().map(Into::into)))
    }

    pub fn prompt_text(&self) -> String {
        if self.prompt.is_empty() {
            DEFAULT_PROMPT.to_string()
        } else {
            self.prompt.join(" ")
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(&self.model)
            .with_prompt(self.prompt_text())
            .with_n_predict(self.n_predict)
            .with_n_gpu_layers(self.n_gpu_layers)
    }
}

/// Rewrite the single-dash `-ngl` spelling to `--ngl`.
///
/// Only the flag region is touched: once the prompt has started (first
/// argument that is neither a flag nor a flag's value, or after `--`),
/// everything is passed through verbatim. A prompt whose first word looks
/// like an unknown flag (`-x`, `-5 degrees`) gets a `--` in front of it so
/// clap takes it as a positional.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let mut out: Vec<OsString> = iter.next().into_iter().collect();
    let mut expect_value = false;

    for arg in iter.by_ref() {
        if expect_value {
            expect_value = false;
            out.push(arg);
            continue;
        }
        let Some(s) = arg.to_str() else {
            out.push(arg);
            break;
        };
        if s == "--" {
            out.push(arg);
            break;
        }
        if !s.starts_with('-') || s == "-" {
            out.push(arg);
            break;
        }

        let rewritten = match s.strip_prefix("-ngl") {
            Some("") => OsString::from("--ngl"),
            Some(rest) if rest.starts_with('=') => OsString::from(format!("--ngl{rest}")),
            _ => arg.clone(),
        };
        if !rewritten.to_str().is_some_and(is_known_flag) {
            out.push(OsString::from("--"));
            out.push(arg);
            break;
        }
        expect_value = rewritten
            .to_str()
            .is_some_and(|flag| VALUE_FLAGS.contains(&flag));
        out.push(rewritten);
    }

    out.extend(iter);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        let mut full = vec!["base-inf"];
        full.extend_from_slice(args);
        Args::try_parse_args(full)
    }

    #[test]
    fn only_model_uses_defaults() {
        let args = parse(&["-m", "model.gguf"]).unwrap();
        let cfg = args.run_config();
        assert_eq!(cfg.model_path, PathBuf::from("model.gguf"));
        assert_eq!(cfg.prompt, "Hello, my name is");
        assert_eq!(cfg.n_predict, 128);
        assert_eq!(cfg.n_gpu_layers, 99);
        assert!(!args.verbose);
    }

    #[test]
    fn multi_word_prompt_is_joined() {
        let args = parse(&["-m", "m.gguf", "-n", "32", "Once", "upon", "a", "time"]).unwrap();
        assert_eq!(args.prompt_text(), "Once upon a time");
        assert_eq!(args.n_predict, 32);
    }

    #[test]
    fn single_dash_ngl_is_accepted() {
        let args = parse(&["-m", "m.gguf", "-ngl", "12", "hi"]).unwrap();
        assert_eq!(args.n_gpu_layers, 12);
        assert_eq!(args.prompt_text(), "hi");

        let args = parse(&["-ngl=0", "-m", "m.gguf"]).unwrap();
        assert_eq!(args.n_gpu_layers, 0);
    }

    #[test]
    fn long_gpu_layer_spellings() {
        assert_eq!(parse(&["-m", "m", "--ngl", "7"]).unwrap().n_gpu_layers, 7);
        assert_eq!(parse(&["-m", "m", "--n-gpu-layers", "3"]).unwrap().n_gpu_layers, 3);
        assert_eq!(parse(&["-m", "m", "-ngl", "-1"]).unwrap().n_gpu_layers, -1);
    }

    #[test]
    fn prompt_keeps_flag_looking_words() {
        let args = parse(&["-m", "m.gguf", "say", "-n", "-ngl", "5"]).unwrap();
        assert_eq!(args.prompt_text(), "say -n -ngl 5");
        assert_eq!(args.n_predict, 128);
        assert_eq!(args.n_gpu_layers, 99);
    }

    #[test]
    fn prompt_may_start_with_a_dash() {
        let args = parse(&["-m", "m.gguf", "-x", "hi"]).unwrap();
        assert_eq!(args.prompt_text(), "-x hi");

        let args = parse(&["-m", "m.gguf", "-n", "4", "-5 degrees", "outside"]).unwrap();
        assert_eq!(args.prompt_text(), "-5 degrees outside");
        assert_eq!(args.n_predict, 4);

        let args = parse(&["-m", "m.gguf", "- list items"]).unwrap();
        assert_eq!(args.prompt_text(), "- list items");
    }

    #[test]
    fn known_flags_still_parse_before_the_prompt() {
        let args = parse(&["--model=m.gguf", "-v", "--n-predict=3", "hi"]).unwrap();
        assert_eq!(args.model, PathBuf::from("m.gguf"));
        assert!(args.verbose);
        assert_eq!(args.n_predict, 3);
        assert_eq!(args.prompt_text(), "hi");
    }

    #[test]
    fn unknown_dash_word_gets_a_separator() {
        let raw = ["base-inf", "-m", "x", "-x", "-ngl"].into_iter().map(OsString::from);
        let norm = normalize_args(raw);
        let norm: Vec<&str> = norm.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(norm, ["base-inf", "-m", "x", "--", "-x", "-ngl"]);
    }

    #[test]
    fn normalization_stops_at_prompt() {
        let raw = ["base-inf", "-ngl", "4", "-m", "x", "about", "-ngl"]
            .into_iter()
            .map(OsString::from);
        let norm = normalize_args(raw);
        let norm: Vec<&str> = norm.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(norm, ["base-inf", "--ngl", "4", "-m", "x", "about", "-ngl"]);
    }

    #[test]
    fn flag_value_that_looks_like_ngl_is_untouched() {
        let raw = ["base-inf", "-m", "-ngl"].into_iter().map(OsString::from);
        let norm = normalize_args(raw);
        assert_eq!(norm[2], OsString::from("-ngl"));
    }

    #[test]
    fn missing_model_is_an_error() {
        let err = parse(&["-n", "10", "hi"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn non_integer_counts_are_rejected() {
        let err = parse(&["-m", "m.gguf", "-n", "abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = parse(&["-m", "m.gguf", "-ngl", "lots"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn verbose_flag() {
        assert!(parse(&["-v", "-m", "m.gguf"]).unwrap().verbose);
    }
}
