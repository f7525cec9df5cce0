mod ast;
mod eval;
mod parse;
mod token;

pub use ast::{CompareOp, Expr, Operand};
pub use eval::Bindings;
pub use parse::parse;
pub use token::{Token, tokenize};
