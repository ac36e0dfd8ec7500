//! Cascading Attribute Sheets.
//!
//! A CAS sheet looks like CSS but assigns HTML attributes:
//!
//! ```text
//! a { rel: noopener; }
//! a.external { target: _blank; }
//! ```
//!
//! [`Compiler::parse`] turns a sheet into a [`DeclarationList`] ordered by
//! selector specificity, and [`Compiler::compile`] applies it to a document,
//! letting more specific (or, on a tie, later) rules win.

pub mod cas_compile;
pub mod dom;
pub mod error;
pub mod host;
pub mod parser;
pub mod style;

pub use cas_compile::{Compiler, CompilerOptions};
pub use error::{CasError, ErrorHandler};
pub use host::{Html5everHost, HtmlHost};
pub use style::declaration::{Declaration, DeclarationList, Selector};
pub use style::specificity::{calculate, Specificity, SpecificityMode};
