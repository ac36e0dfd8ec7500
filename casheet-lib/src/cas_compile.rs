use crate::error::{CasError, ErrorHandler};
use crate::host::{Html5everHost, HtmlHost};
use crate::style::declaration::DeclarationList;
use crate::style::specificity::SpecificityMode;
use crate::style::{cas_parser, cascade};
use log::error;

/// Settings for a [`Compiler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompilerOptions {
    /// How declarations are ordered after parsing.
    pub specificity: SpecificityMode,
}

/// Parses CAS sheets and applies them to HTML.
///
/// Errors never escape as panics or `Err` values from `parse` and `compile`;
/// they go to the installed error handler (and to the `log` facade) and the
/// call returns whatever result it can.
pub struct Compiler {
    options: CompilerOptions,
    on_error: ErrorHandler,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    pub fn with_options(options: CompilerOptions) -> Self {
        Compiler {
            options,
            on_error: Box::new(|_: &CasError| {}),
        }
    }

    pub fn options(&self) -> CompilerOptions {
        self.options
    }

    /// Installs the handler called for every reported error.
    ///
    /// `None` is rejected with [`CasError::InvalidErrorHandler`], which is
    /// reported through the handler already installed; that handler stays.
    pub fn on_error(&mut self, handler: Option<ErrorHandler>) -> Result<(), CasError> {
        match handler {
            Some(handler) => {
                self.on_error = handler;
                Ok(())
            }
            None => {
                let err = CasError::InvalidErrorHandler;
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Builder form of [`Compiler::on_error`].
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&CasError) + Send + Sync + 'static,
    {
        self.on_error = Box::new(handler);
        self
    }

    fn report(&self, err: &CasError) {
        error!("{}", err);
        (self.on_error)(err);
    }

    /// Parses `cas` into a list sorted by specificity.
    ///
    /// Returns `None`, after reporting, when `cas` is empty.
    pub fn parse(&self, cas: &str) -> Option<DeclarationList> {
        match cas_parser::parse_with(cas, self.options.specificity) {
            Ok(list) => Some(list),
            Err(err) => {
                self.report(&err);
                None
            }
        }
    }

    /// Applies `cas` to `html` with the bundled html5ever host.
    pub fn compile(&self, cas: &str, html: &str) -> String {
        self.compile_with(&Html5everHost, cas, html)
    }

    /// Applies `cas` to `html` with `host` and returns the doctype followed
    /// by the serialized document. If `cas` cannot be parsed, `html` is
    /// returned unchanged.
    pub fn compile_with<H: HtmlHost>(&self, host: &H, cas: &str, html: &str) -> String {
        let Some(declarations) = self.parse(cas) else {
            return html.to_string();
        };
        let doctype = host.extract_doctype(html);
        let document = host.parse_fragment(html);
        self.apply(host, &document, &declarations);
        format!("{}{}", doctype, host.serialize(&document))
    }

    /// Applies an already parsed list to a host document.
    pub fn apply<H: HtmlHost>(
        &self,
        host: &H,
        document: &H::Document,
        declarations: &DeclarationList,
    ) {
        cascade::apply(host, document, declarations, |err| self.report(&err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collecting() -> (Arc<Mutex<Vec<CasError>>>, ErrorHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: ErrorHandler =
            Box::new(move |err: &CasError| sink.lock().unwrap().push(err.clone()));
        (seen, handler)
    }

    #[test]
    fn test_compile_applies_attributes() {
        let html = r#"<!DOCTYPE html><html><head></head><body><a id="id">x</a></body></html>"#;
        let out = Compiler::new().compile("a { x: 1; } #id { x: 2; }", html);
        assert_eq!(
            out,
            r#"<!DOCTYPE html><html><head></head><body><a id="id" x="2">x</a></body></html>"#
        );
    }

    #[test]
    fn test_empty_sheet_is_reported() {
        let (seen, handler) = collecting();
        let mut compiler = Compiler::new();
        compiler.on_error(Some(handler)).unwrap();

        assert!(compiler.parse("").is_none());
        assert_eq!(compiler.compile("", "<p>x</p>"), "<p>x</p>");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![CasError::EmptyInput, CasError::EmptyInput]
        );
    }

    #[test]
    fn test_missing_handler_keeps_previous() {
        let (seen, handler) = collecting();
        let mut compiler = Compiler::new();
        compiler.on_error(Some(handler)).unwrap();

        assert_eq!(compiler.on_error(None), Err(CasError::InvalidErrorHandler));
        compiler.parse("");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![CasError::InvalidErrorHandler, CasError::EmptyInput]
        );
    }

    #[test]
    fn test_invalid_selector_does_not_stop_compile() {
        let (seen, handler) = collecting();
        let mut compiler = Compiler::new();
        compiler.on_error(Some(handler)).unwrap();

        let out = compiler.compile("p::before { a: 1 } p { b: 2 }", "<p></p>");
        assert!(out.contains(r#"<p b="2"></p>"#));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(&seen[0], CasError::InvalidSelector { .. }));
    }

    #[test]
    fn test_tuple_option_changes_winner() {
        let html = r#"<p id="a" class="a b c d e f g h i j"></p>"#;
        let cas = ".a.b.c.d.e.f.g.h.i.j { x: classes } #a { x: id }";

        let legacy = Compiler::new().compile(cas, html);
        assert!(legacy.contains(r#"x="id""#));

        let tuple = Compiler::with_options(CompilerOptions {
            specificity: SpecificityMode::Tuple,
        })
        .compile(cas, html);
        assert!(tuple.contains(r#"x="id""#));

        // Written the other way round, only tuple ordering lets the id win.
        let cas = "#a { x: id } .a.b.c.d.e.f.g.h.i.j { x: classes }";
        assert!(Compiler::new().compile(cas, html).contains(r#"x="classes""#));
        let tuple = Compiler::with_options(CompilerOptions {
            specificity: SpecificityMode::Tuple,
        })
        .compile(cas, html);
        assert!(tuple.contains(r#"x="id""#));
    }
}
