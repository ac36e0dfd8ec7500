use crate::error::CasError;
use crate::host::HtmlHost;
use crate::style::declaration::DeclarationList;
use log::debug;

/// Applies `declarations` to `document` front to back.
///
/// Every property of a declaration is set on every element its selector
/// matches, so a later declaration overwrites what an earlier one wrote to
/// the same attribute. Pass a list sorted by specificity to get the cascade.
/// A selector the host rejects is handed to `report` and its declaration is
/// skipped; the remaining declarations still apply.
pub fn apply<H, F>(
    host: &H,
    document: &H::Document,
    declarations: &DeclarationList,
    mut report: F,
) where
    H: HtmlHost,
    F: FnMut(CasError),
{
    for declaration in declarations {
        let selector = declaration.selector().text();
        let elements = match host.query_all(document, selector) {
            Ok(elements) => elements,
            Err(err) => {
                report(err);
                continue;
            }
        };
        debug!(
            "`{}` matched {} element(s), setting {} attribute(s)",
            selector,
            elements.len(),
            declaration.len()
        );

        for element in &elements {
            for (name, value) in declaration.properties() {
                host.set_attribute(element, name, value);
            }
        }
    }
}
