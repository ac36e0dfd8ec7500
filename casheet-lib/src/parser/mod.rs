pub mod cas_html;
pub mod dom_indices;
pub mod html;
