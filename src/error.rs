use std::fmt;

/// Failure while turning raw template text into tokens.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated tag starting before offset {position}")]
    UnterminatedTag { position: usize },
    #[error("unterminated string literal at offset {position}")]
    UnterminatedString { position: usize },
    #[error("invalid escape sequence `\\{found}` at offset {position}")]
    InvalidEscape { position: usize, found: String },
    #[error("invalid numeric literal `{literal}` at offset {position}")]
    InvalidNumber { position: usize, literal: String },
    #[error("nothing to tokenize: end of input already reached at offset {position}")]
    NothingToTokenize { position: usize },
}

/// Structural failure while building the node tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unknown tag `{name}` at offset {position}")]
    UnknownTag { name: String, position: usize },
    #[error("FOR tag at offset {position} takes a variable and 2 or 3 expressions, got {found} arguments")]
    ForArguments { found: usize, position: usize },
    #[error("invalid element {found} in {context} at offset {position}")]
    InvalidElement {
        found: String,
        context: &'static str,
        position: usize,
    },
    #[error("expected {expected}, got {found} at offset {position}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        position: usize,
    },
    #[error("END tag at offset {position} has no open FOR to close")]
    UnmatchedEnd { position: usize },
    #[error("FOR loop over `{variable}` is never closed by an END tag")]
    UnclosedFor { variable: String },
}

/// Failure inside the dynamic arithmetic model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("type mismatch: {type_name} cannot take part in arithmetic")]
    TypeMismatch { type_name: String },
    #[error("string \"{0}\" is not a number")]
    NotNumeric(String),
    #[error("integer division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StackError {
    #[error("empty stack: lane `{lane}` has no values")]
    Empty { lane: String },
}

/// Failure while executing a parsed document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),
    #[error("unknown function `@{0}`")]
    UnknownFunction(String),
    #[error("`{element}` cannot be used as a bound of the FOR loop over `{variable}`")]
    InvalidLoopBound { variable: String, element: String },
    #[error("@{function}: {message}")]
    FunctionArgument {
        function: &'static str,
        message: String,
    },
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error("failed to write output: {0}")]
    Format(#[from] fmt::Error),
}

/// Either half of a `parse` + `render` round.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
}
