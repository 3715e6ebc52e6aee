use serde::Deserialize;

use crate::core::dimensions::SizeSpecifier;
use crate::core::error::ParameterError;

/// Quality handed to the converter when the caller supplies none. The range is
/// not validated here; the converter is authoritative on rejecting bad values.
pub const DEFAULT_QUALITY: i32 = 75;

/// Raw string-typed request parameters, exactly as the host hands them over.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawParameters {
    pub quality: Option<String>,
    pub num_additional_images: Option<String>,
    pub widths: Option<String>,
    pub heights: Option<String>,
}

/// Sizing for one additional variant, built by zipping the width and height
/// token lists by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantRequest {
    pub index: usize,
    pub width_spec: SizeSpecifier,
    pub height_spec: SizeSpecifier,
}

#[derive(Debug, Clone)]
pub struct VariantPlan {
    pub quality: i32,
    pub requests: Vec<VariantRequest>,
}

impl VariantPlan {
    /// Parses everything eagerly so malformed parameters fail before any
    /// conversion is attempted. The requested count does not have to match the
    /// token list lengths; indices past a list's end are `Unspecified`.
    pub fn build(params: &RawParameters) -> Result<Self, ParameterError> {
        let quality = parse_numeric(params.quality.as_deref(), "quality", DEFAULT_QUALITY)?;
        let count: i64 = parse_numeric(
            params.num_additional_images.as_deref(),
            "num_additional_images",
            0,
        )?;
        let count = count.max(0) as usize;

        let widths = split_tokens(params.widths.as_deref());
        let heights = split_tokens(params.heights.as_deref());

        let mut requests = Vec::with_capacity(count);
        for index in 0..count {
            requests.push(VariantRequest {
                index,
                width_spec: spec_at(&widths, index, "widths")?,
                height_spec: spec_at(&heights, index, "heights")?,
            });
        }

        Ok(Self { quality, requests })
    }
}

fn parse_numeric<T: std::str::FromStr>(
    raw: Option<&str>,
    param: &'static str,
    default: T,
) -> Result<T, ParameterError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse().map_err(|_| ParameterError::NotNumeric {
            param,
            value: raw.to_string(),
        }),
        None => Ok(default),
    }
}

/// Comma-split into ordered tokens; a missing or empty parameter is an empty
/// list, not a single empty token.
fn split_tokens(raw: Option<&str>) -> Vec<String> {
    match raw.map(str::trim) {
        None | Some("") => Vec::new(),
        Some(s) => s.split(',').map(|t| t.trim().to_string()).collect(),
    }
}

fn spec_at(
    tokens: &[String],
    index: usize,
    param: &'static str,
) -> Result<SizeSpecifier, ParameterError> {
    match tokens.get(index) {
        Some(token) => SizeSpecifier::parse(token, param),
        None => Ok(SizeSpecifier::Unspecified),
    }
}
