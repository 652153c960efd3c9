use std::path::PathBuf;

use baseinf_abi::backend::{DEFAULT_N_GPU_LAYERS, ModelParams};

pub const DEFAULT_PROMPT: &str = "Hello, my name is";
pub const DEFAULT_N_PREDICT: usize = 128;

/// Everything one generation run needs, already validated by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub model_path: PathBuf,
    pub prompt: String,
    /// Tokens to generate beyond the prompt.
    pub n_predict: usize,
    pub n_gpu_layers: i32,
}

impl RunConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            prompt: DEFAULT_PROMPT.to_string(),
            n_predict: DEFAULT_N_PREDICT,
            n_gpu_layers: DEFAULT_N_GPU_LAYERS,
        }
    }

    pub fn with_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_n_predict(mut self, n_predict: usize) -> Self {
        self.n_predict = n_predict;
        self
    }

    pub fn with_n_gpu_layers(mut self, n_gpu_layers: i32) -> Self {
        self.n_gpu_layers = n_gpu_layers;
        self
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            n_gpu_layers: self.n_gpu_layers,
        }
    }
}
