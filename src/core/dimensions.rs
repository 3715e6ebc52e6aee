use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{DimensionError, ParameterError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One parsed sizing token from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSpecifier {
    /// Empty token; the axis is derived from the other one.
    Unspecified,
    /// Absolute pixel value.
    Absolute(u32),
    /// Percentage of the original axis, integer truncation.
    Percentage(u32),
}

impl SizeSpecifier {
    /// Empty -> `Unspecified`, trailing `%` -> `Percentage`, otherwise `Absolute`.
    pub fn parse(raw: &str, param: &'static str) -> Result<Self, ParameterError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::Unspecified);
        }

        if let Some(pct) = raw.strip_suffix('%') {
            let pct = pct.trim().parse().map_err(|_| ParameterError::NotNumeric {
                param,
                value: raw.to_string(),
            })?;
            Ok(Self::Percentage(pct))
        } else {
            let px = raw.parse().map_err(|_| ParameterError::NotNumeric {
                param,
                value: raw.to_string(),
            })?;
            Ok(Self::Absolute(px))
        }
    }

    fn apply(self, original_axis: u32) -> Option<u32> {
        match self {
            Self::Unspecified => None,
            Self::Absolute(px) => Some(px),
            Self::Percentage(pct) => {
                Some((u64::from(original_axis) * u64::from(pct) / 100) as u32)
            }
        }
    }
}

/// Computes the target size for one variant. Each axis is resolved
/// independently; an unspecified axis is derived from the resolved one via the
/// original aspect ratio. Both unspecified falls back to the original size.
pub fn resolve(
    original: Dimensions,
    width_spec: SizeSpecifier,
    height_spec: SizeSpecifier,
) -> Result<Dimensions, DimensionError> {
    let width = width_spec.apply(original.width);
    let height = height_spec.apply(original.height);

    let (width, height) = match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => {
            if original.width == 0 {
                return Err(DimensionError::DegenerateSource);
            }
            let h = (u64::from(original.height) * u64::from(w) / u64::from(original.width)) as u32;
            (w, h)
        }
        (None, Some(h)) => {
            if original.height == 0 {
                return Err(DimensionError::DegenerateSource);
            }
            let w = (u64::from(original.width) * u64::from(h) / u64::from(original.height)) as u32;
            (w, h)
        }
        (None, None) => (original.width, original.height),
    };

    Ok(Dimensions { width, height })
}
