pub mod ast;
pub mod node;
pub mod program;
pub mod span;
