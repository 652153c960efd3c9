// llama-rs/src/model.rs

use std::ffi::{c_char, CString};
use std::path::Path;
use std::ptr::NonNull;

use baseinf_abi::backend::{ModelParams, SessionParams, TextModel};
use baseinf_abi::error::{EngineError, Result};
use baseinf_abi::token::Token;
use llama_cpp_sys_2::{
    llama_model, llama_model_decoder_start_token, llama_model_free, llama_model_get_vocab,
    llama_model_has_encoder, llama_model_load_from_file, llama_token, llama_token_to_piece,
    llama_tokenize, llama_vocab, llama_vocab_bos, llama_vocab_is_eog,
};
use tracing::{debug, info};

use crate::ffi::default_model_params;
use crate::session::LlamaSession;
use crate::token::{from_raw, to_raw};

/// Most pieces are a few bytes; longer ones trigger one resize.
const PIECE_BUF_LEN: usize = 32;

/// Safe wrapper around `llama_model*` and its vocabulary.
pub struct LlamaModel {
    model: NonNull<llama_model>,
    vocab: NonNull<llama_vocab>,
}

impl LlamaModel {
    /// Load GGUF weights. The backend must already be initialized
    /// (see [`crate::LlamaBackend`]).
    pub fn load_from_file(path: &Path, n_gpu_layers: i32) -> Result<Self> {
        let load_err = || EngineError::ModelLoad {
            path: path.to_path_buf(),
        };
        let c_path = path
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or_else(load_err)?;

        debug!("[ffi] llama_model_load_from_file({}, ngl={n_gpu_layers})", path.display());
        let params = default_model_params(n_gpu_layers);
        let ptr = unsafe { llama_model_load_from_file(c_path.as_ptr(), params) };
        let model = NonNull::new(ptr).ok_or_else(load_err)?;

        let vocab = unsafe { llama_model_get_vocab(model.as_ptr()) };
        let Some(vocab) = NonNull::new(vocab as *mut llama_vocab) else {
            unsafe { llama_model_free(model.as_ptr()) };
            return Err(load_err());
        };

        info!("[model] loaded {}", path.display());
        Ok(Self { model, vocab })
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut llama_model {
        self.model.as_ptr()
    }

    #[inline]
    fn vocab(&self) -> *const llama_vocab {
        self.vocab.as_ptr()
    }

    /// One tokenize call into a buffer sized for the worst case; if llama.cpp
    /// still reports a larger requirement, resize to it and retry once.
    fn tokenize_raw(&self, text: &str) -> Result<Vec<llama_token>> {
        let text_len = i32::try_from(text.len())
            .map_err(|_| EngineError::Tokenize(format!("prompt too long ({} bytes)", text.len())))?;

        // every byte a token, plus BOS/EOS
        let mut buf: Vec<llama_token> = vec![0; text.len() + 2];
        for _ in 0..2 {
            let cap = i32::try_from(buf.len()).unwrap_or(i32::MAX);
            let n = unsafe {
                llama_tokenize(
                    self.vocab(),
                    text.as_ptr() as *const c_char,
                    text_len,
                    buf.as_mut_ptr(),
                    cap,
                    /* add_special   */ true,
                    /* parse_special */ true,
                )
            };
            if n >= 0 {
                buf.truncate(n as usize);
                return Ok(buf);
            }
            if n == i32::MIN {
                return Err(EngineError::Tokenize("token count overflowed".into()));
            }
            buf.resize(n.unsigned_abs() as usize, 0);
        }
        Err(EngineError::Tokenize(format!(
            "llama_tokenize still short after resizing to {} tokens",
            buf.len()
        )))
    }
}

impl TextModel for LlamaModel {
    type Session<'m>
        = LlamaSession<'m>
    where
        Self: 'm;

    fn load<P: AsRef<Path>>(model_path: P, params: &ModelParams) -> Result<Self> {
        Self::load_from_file(model_path.as_ref(), params.n_gpu_layers)
    }

    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let ids = self.tokenize_raw(text)?;
        debug!("[model] tokenized {} bytes into {} tokens", text.len(), ids.len());
        Ok(ids.into_iter().map(Token).collect())
    }

    fn token_to_piece(&self, token: Token) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; PIECE_BUF_LEN];
        for _ in 0..2 {
            let n = unsafe {
                llama_token_to_piece(
                    self.vocab(),
                    to_raw(token),
                    buf.as_mut_ptr() as *mut c_char,
                    i32::try_from(buf.len()).unwrap_or(i32::MAX),
                    /* lstrip  */ 0,
                    /* special */ true,
                )
            };
            if n >= 0 {
                buf.truncate(n as usize);
                return Ok(buf);
            }
            buf.resize(n.unsigned_abs() as usize, 0);
        }
        Err(EngineError::TokenToPiece(token.0))
    }

    fn is_end_of_generation(&self, token: Token) -> bool {
        unsafe { llama_vocab_is_eog(self.vocab(), to_raw(token)) }
    }

    fn has_encoder(&self) -> bool {
        unsafe { llama_model_has_encoder(self.as_ptr()) }
    }

    fn decoder_start_token(&self) -> Option<Token> {
        from_raw(unsafe { llama_model_decoder_start_token(self.as_ptr()) })
    }

    fn bos_token(&self) -> Token {
        Token(unsafe { llama_vocab_bos(self.vocab()) })
    }

    fn new_session(&self, params: &SessionParams) -> Result<LlamaSession<'_>> {
        LlamaSession::new(self, params)
    }
}

impl Drop for LlamaModel {
    fn drop(&mut self) {
        debug!("[ffi] llama_model_free()");
        unsafe { llama_model_free(self.model.as_ptr()) };
    }
}

// SAFETY: llama.cpp models are immutable after load; all mutable state lives
// in LlamaContext, which stays !Send/!Sync.
unsafe impl Send for LlamaModel {}
unsafe impl Sync for LlamaModel {}
