//! In-memory stand-in for a llama.cpp model, used by the engine tests.
//!
//! Tokens are plain integers: BOS and EOS are fixed, prompt words get ids
//! from 1000 upward, and anything else renders as " t{id}". Every call that
//! matters is recorded in a shared event log so tests can check ordering.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use baseinf_abi::backend::{
    InferenceSession, ModelParams, PerfCounters, SessionParams, TextModel,
};
use baseinf_abi::error::{EngineError, Result};
use baseinf_abi::token::Token;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Loaded(i32),
    SessionCreated(SessionParams),
    Encode(Vec<Token>),
    Decode(Vec<Token>, usize),
    Sample(Token),
    Released(&'static str),
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Tokens the sampler returns first, in order.
    pub script: Vec<Token>,
    /// 0-based decode call that fails.
    pub fail_decode_at: Option<usize>,
    pub fail_piece_for: Option<Token>,
    pub fail_encode: bool,
    pub fail_session: bool,
    pub load_fails: bool,
    pub tokenize_empty: bool,
    pub encoder: bool,
    pub decoder_start: Option<Token>,
}

impl MockBehavior {
    pub const BOS: Token = Token(1);
    pub const EOS: Token = Token(2);

    /// Greedy pick once the script runs out: a pure function of every token
    /// decoded so far. Never returns BOS or EOS.
    pub fn derive_next(history: &[Token]) -> Token {
        let mix = history
            .iter()
            .enumerate()
            .fold(17u64, |acc, (i, t)| {
                acc.wrapping_mul(31)
                    .wrapping_add((i as u64 + 1) * (t.0 as u64))
            });
        Token(10 + (mix % 50) as i32)
    }
}

#[derive(Default)]
struct State {
    behavior: MockBehavior,
    vocab: HashMap<i32, Vec<u8>>,
    decoded: Vec<Token>,
    sampled: Vec<Token>,
    sample_calls: usize,
    decode_calls: usize,
}

thread_local! {
    static STAGED: RefCell<Option<(MockBehavior, EventLog)>> = const { RefCell::new(None) };
}

pub struct MockModel {
    state: Rc<RefCell<State>>,
    log: EventLog,
}

impl MockModel {
    pub fn new(behavior: MockBehavior) -> Self {
        Self::with_log(behavior, EventLog::default())
    }

    fn with_log(behavior: MockBehavior, log: EventLog) -> Self {
        let state = State {
            behavior,
            ..State::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            log,
        }
    }

    /// Behavior and event log picked up by the next `TextModel::load` on this thread.
    pub fn stage_next_load(behavior: MockBehavior) -> EventLog {
        let log = EventLog::default();
        STAGED.with(|s| *s.borrow_mut() = Some((behavior, log.clone())));
        log
    }

    pub fn open_session(&self) -> MockSession {
        self.new_session(&SessionParams {
            n_ctx: 4096,
            n_batch: 4096,
        })
        .unwrap()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn decodes(&self) -> Vec<(Vec<Token>, usize)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Decode(tokens, n_past) => Some((tokens.clone(), *n_past)),
                _ => None,
            })
            .collect()
    }

    pub fn sampled(&self) -> Vec<Token> {
        self.state.borrow().sampled.clone()
    }

    /// What the stream should read after `tokens` were emitted.
    pub fn expected_text(&self, tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|&t| String::from_utf8(self.piece(t)).unwrap())
            .collect()
    }

    fn piece(&self, token: Token) -> Vec<u8> {
        if token == MockBehavior::BOS {
            return Vec::new();
        }
        match self.state.borrow().vocab.get(&token.0) {
            Some(bytes) => bytes.clone(),
            None => format!(" t{}", token.0).into_bytes(),
        }
    }
}

impl Drop for MockModel {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Event::Released("model"));
    }
}

impl TextModel for MockModel {
    type Session<'m>
        = MockSession
    where
        Self: 'm;

    fn load<P: AsRef<Path>>(model_path: P, params: &ModelParams) -> Result<Self> {
        let (behavior, log) = STAGED
            .with(|s| s.borrow_mut().take())
            .unwrap_or_default();
        if behavior.load_fails {
            return Err(EngineError::ModelLoad {
                path: model_path.as_ref().to_path_buf(),
            });
        }
        log.borrow_mut().push(Event::Loaded(params.n_gpu_layers));
        Ok(Self::with_log(behavior, log))
    }

    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let mut state = self.state.borrow_mut();
        if state.behavior.tokenize_empty {
            return Ok(Vec::new());
        }
        let mut tokens = vec![MockBehavior::BOS];
        for (i, word) in text.split_whitespace().enumerate() {
            let id = 1000 + i as i32;
            let piece = if i == 0 {
                word.to_string()
            } else {
                format!(" {word}")
            };
            state.vocab.insert(id, piece.into_bytes());
            tokens.push(Token(id));
        }
        Ok(tokens)
    }

    fn token_to_piece(&self, token: Token) -> Result<Vec<u8>> {
        if self.state.borrow().behavior.fail_piece_for == Some(token) {
            return Err(EngineError::TokenToPiece(token.0));
        }
        Ok(self.piece(token))
    }

    fn is_end_of_generation(&self, token: Token) -> bool {
        token == MockBehavior::EOS
    }

    fn has_encoder(&self) -> bool {
        self.state.borrow().behavior.encoder
    }

    fn decoder_start_token(&self) -> Option<Token> {
        self.state.borrow().behavior.decoder_start
    }

    fn bos_token(&self) -> Token {
        MockBehavior::BOS
    }

    fn new_session(&self, params: &SessionParams) -> Result<MockSession> {
        if self.state.borrow().behavior.fail_session {
            return Err(EngineError::ContextCreate("mock context refused".into()));
        }
        self.log.borrow_mut().push(Event::SessionCreated(*params));
        Ok(MockSession {
            sampler: DropProbe::new("sampler", &self.log),
            context: DropProbe::new("context", &self.log),
            state: self.state.clone(),
            log: self.log.clone(),
        })
    }
}

/// Records its own release in the event log.
pub struct DropProbe {
    what: &'static str,
    log: EventLog,
}

impl DropProbe {
    fn new(what: &'static str, log: &EventLog) -> Self {
        Self {
            what,
            log: log.clone(),
        }
    }
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Event::Released(self.what));
    }
}

pub struct MockSession {
    // field order is drop order
    #[allow(dead_code)]
    sampler: DropProbe,
    #[allow(dead_code)]
    context: DropProbe,
    state: Rc<RefCell<State>>,
    log: EventLog,
}

impl InferenceSession for MockSession {
    fn encode(&mut self, tokens: &[Token]) -> Result<()> {
        if self.state.borrow().behavior.fail_encode {
            return Err(EngineError::Encode(-1));
        }
        self.log.borrow_mut().push(Event::Encode(tokens.to_vec()));
        Ok(())
    }

    fn decode(&mut self, tokens: &[Token], n_past: usize) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let call = state.decode_calls;
        state.decode_calls += 1;
        if state.behavior.fail_decode_at == Some(call) {
            return Err(EngineError::Decode {
                n_past,
                n_tokens: tokens.len(),
                code: 1,
            });
        }
        state.decoded.extend_from_slice(tokens);
        self.log
            .borrow_mut()
            .push(Event::Decode(tokens.to_vec(), n_past));
        Ok(())
    }

    fn sample(&mut self) -> Result<Token> {
        let mut state = self.state.borrow_mut();
        let call = state.sample_calls;
        state.sample_calls += 1;
        let token = match state.behavior.script.get(call) {
            Some(&t) => t,
            None => MockBehavior::derive_next(&state.decoded),
        };
        if token != MockBehavior::EOS {
            state.sampled.push(token);
        }
        self.log.borrow_mut().push(Event::Sample(token));
        Ok(token)
    }

    fn perf(&self) -> Option<PerfCounters> {
        let state = self.state.borrow();
        Some(PerfCounters {
            n_sample: state.sampled.len() as i32,
            n_eval: state.decode_calls as i32,
            ..PerfCounters::default()
        })
    }
}
