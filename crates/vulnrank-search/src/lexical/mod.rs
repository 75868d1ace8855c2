//! Lexical (BM25) matching layer.

pub mod bm25;
pub mod tokenizer;

pub use bm25::Bm25Index;
pub use tokenizer::tokenize;
