//! Resize request parameters.

/// Fit policy applied when both target dimensions are constrained.
///
/// Mirrors the accepted values of the `fit` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Preserve aspect ratio, letterbox onto the exact target canvas.
    #[default]
    Contain,
    /// Preserve aspect ratio, cover the target box and crop the excess.
    Cover,
    /// Ignore aspect ratio, stretch to the exact target dimensions.
    Fill,
    /// Preserve aspect ratio, both dimensions at most the target.
    Inside,
    /// Preserve aspect ratio, both dimensions at least the target.
    Outside,
}

impl FitMode {
    /// Parse a query value. Unrecognized values silently fall back to the
    /// default policy.
    pub fn parse(value: &str) -> Self {
        match value {
            "contain" => Self::Contain,
            "cover" => Self::Cover,
            "fill" => Self::Fill,
            "inside" => Self::Inside,
            "outside" => Self::Outside,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contain => "contain",
            Self::Cover => "cover",
            Self::Fill => "fill",
            Self::Inside => "inside",
            Self::Outside => "outside",
        }
    }
}

/// Target dimensions and fit policy for one request.
///
/// A missing dimension means "no constraint": the source dimension is kept
/// (or follows the aspect ratio when the other dimension is constrained).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitMode,
}

impl ResizeParams {
    pub fn new(width: Option<u32>, height: Option<u32>, fit: FitMode) -> Self {
        Self { width, height, fit }
    }

    /// Extract parameters from decoded query pairs (`w`, `h`, `fit`).
    ///
    /// Non-positive or unparseable dimensions count as absent.
    pub fn from_query_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        for (name, value) in pairs {
            match name {
                "w" => params.width = parse_dimension(value),
                "h" => params.height = parse_dimension(value),
                "fit" => params.fit = FitMode::parse(value),
                _ => {}
            }
        }
        params
    }

    /// True when no dimension is constrained; the image is still
    /// re-encoded but never resampled.
    pub fn is_unconstrained(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

fn parse_dimension(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fit_falls_back_to_contain() {
        assert_eq!(FitMode::parse("cover"), FitMode::Cover);
        assert_eq!(FitMode::parse("stretch"), FitMode::Contain);
        assert_eq!(FitMode::parse(""), FitMode::Contain);
    }

    #[test]
    fn query_pairs_are_extracted() {
        let params =
            ResizeParams::from_query_pairs([("w", "64"), ("fit", "cover"), ("junk", "1")]);
        assert_eq!(params.width, Some(64));
        assert_eq!(params.height, None);
        assert_eq!(params.fit, FitMode::Cover);
    }

    #[test]
    fn bogus_dimensions_count_as_absent() {
        let params = ResizeParams::from_query_pairs([("w", "0"), ("h", "abc")]);
        assert!(params.is_unconstrained());
    }
}
