pub mod cas_parser;
pub mod cascade;
pub mod css_matcher;
pub mod declaration;
pub mod specificity;
