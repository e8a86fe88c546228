//! Lossless JSX/TSX parsing and printing
//!
//! `parse` turns source text into a [`Module`] whose nodes all carry byte
//! spans. After editing the tree, [`Printer`] writes it back, copying every
//! untouched region from the original text so that unedited code keeps its
//! exact formatting.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod span_ids;
pub mod lexer;
pub mod line_index;
pub mod parser;
pub mod printer;
pub mod values;

pub use ast::*;
pub use error::{ParseError, ParseResult};
pub use span_ids::{path_seed, SpanIds};
pub use line_index::{LineIndex, Position};
pub use parser::Parser;
pub use printer::Printer;

/// Parse a source file
pub fn parse(source: &str) -> ParseResult<Module> {
    parse_with_path(source, "<anonymous>")
}

/// Parse a source file, seeding span ids from its path
pub fn parse_with_path(source: &str, path: &str) -> ParseResult<Module> {
    Parser::new_with_path(source, path).parse_module()
}

/// Parse a standalone markup snippet such as `<div className="x">hi</div>`.
///
/// The result carries no source positions and prints as generated code,
/// ready to be spliced into another tree.
pub fn parse_markup(snippet: &str) -> ParseResult<JsxNode> {
    let mut node = Parser::new_with_path(snippet, "<snippet>").parse_markup_fragment()?;
    parser::detach_node(&mut node, snippet);
    Ok(node)
}

/// Print a module with no edits marked dirty
pub fn print(module: &Module, source: &str) -> String {
    Printer::new(source).print(module)
}
