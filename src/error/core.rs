// Copyright (c) karate-core contributors
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level error type aggregating every error domain in the crate.

use derive_more::{Display, Error, From};

use super::{
    eval::EvalError, lexer::LexerError, match_engine::MatchError, parser::ParseError,
    runtime::{CallError, HookError, HttpError, InterruptedError, TimeoutError},
};

/// The union of every error domain this crate can raise.
///
/// Per spec, this type is never allowed to cross the Step Dispatcher
/// boundary: it is only produced while loading/parsing a
/// [`Source`](crate::source::Source) (which converts it into a synthetic
/// failed scenario) or while wiring up suite-level collaborators.
#[derive(Debug, Display, Error, From)]
pub enum CoreError {
    #[display("{_0}")]
    Lexer(LexerError),
    #[display("{_0}")]
    Parser(ParseError),
    #[display("{_0}")]
    Eval(EvalError),
    #[display("{_0}")]
    Match(MatchError),
    #[display("{_0}")]
    Http(HttpError),
    #[display("{_0}")]
    Call(CallError),
    #[display("{_0}")]
    Timeout(TimeoutError),
    #[display("{_0}")]
    Interrupted(InterruptedError),
    #[display("{_0}")]
    Hook(HookError),
    #[display("{context}: {source}")]
    #[from(ignore)]
    Context {
        context: String,
        #[error(source)]
        source: Box<CoreError>,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_lexer_error() {
        let err: CoreError = LexerError::new(1, 1, "bad char").into();
        assert!(matches!(err, CoreError::Lexer(_)));
    }

    #[test]
    fn context_preserves_source() {
        let err: CoreError = LexerError::new(2, 3, "oops").into();
        let wrapped = CoreError::Context { context: "loading feature".into(), source: Box::new(err) };
        assert!(wrapped.to_string().contains("loading feature"));
        assert!(wrapped.to_string().contains("oops"));
    }
}
