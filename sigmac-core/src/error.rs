use thiserror::Error;

/// Errors produced by the compiler pipeline.
///
/// Every variant is fatal for the current compile: the pipeline stops at
/// the first failure and produces no partial output.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: u32, message: String },
    #[error("unsupported construct on line {line}: {message}")]
    UnsupportedConstruct { line: u32, message: String },
    #[error("non-integer constant on line {line}: {value}")]
    NonIntegerConstant { line: u32, value: String },
    #[error("all registers R1..R14 are already in use")]
    RegisterExhaustion,
}

impl CompileError {
    pub fn syntax(line: u32, message: impl Into<String>) -> Self {
        CompileError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn unsupported(line: u32, message: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            line,
            message: message.into(),
        }
    }
}
