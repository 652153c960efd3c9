// llama-rs/src/token.rs

use baseinf_abi::token::Token;
use llama_cpp_sys_2::llama_token;

/// llama.cpp's "no token" sentinel (LLAMA_TOKEN_NULL).
pub const TOKEN_NULL: llama_token = -1;

#[inline]
pub fn to_raw(token: Token) -> llama_token {
    token.0
}

/// `None` for the null sentinel and any other negative id.
#[inline]
pub fn from_raw(id: llama_token) -> Option<Token> {
    (id >= 0).then_some(Token(id))
}
