//! Built-in function libraries.

pub mod blinn_phong;

pub use blinn_phong::{BlinnPhongCatalog, blinn_phong};

/// Look up a built-in library by its CLI name.
pub fn by_name(name: &str) -> Option<&'static crate::FunctionGraph> {
    match name {
        "blinn-phong" | "blinn_phong" => Some(&blinn_phong().graph),
        _ => None,
    }
}
