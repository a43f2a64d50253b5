pub mod resolver;
pub mod symbols;
