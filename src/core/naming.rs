use std::path::Path;

use crate::core::dimensions::Dimensions;

/// Output name for the base (unresized) variant.
pub fn base_name(stem: &str) -> String {
    format!("{stem}.webp")
}

/// Output name for an additional variant, dimension suffix included.
pub fn variant_name(stem: &str, dims: Dimensions) -> String {
    format!("{stem}-{}x{}.webp", dims.width, dims.height)
}

/// Upload name with its extension stripped.
pub fn stem_of(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}
