//! Zoom clamping and zoom-text parsing

/// Allowed scale range for a viewer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleLimits {
    pub min: f32,
    pub max: f32,
}

impl ScaleLimits {
    #[must_use]
    pub fn new(min: f32, max: f32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Clamp a factor into the allowed range. NaN and infinities are rejected.
    #[must_use]
    pub fn clamp(&self, factor: f32) -> Option<f32> {
        if !factor.is_finite() {
            return None;
        }
        Some(factor.clamp(self.min, self.max))
    }
}

/// Errors from [`parse_zoom_text`]
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ZoomTextError {
    #[error("zoom value is empty")]
    Empty,

    #[error("not a zoom value: {0:?}")]
    NotANumber(String),
}

/// Parse free-form zoom input into a scale factor.
///
/// Accepts `"150%"`, `"1.5"`, and bare numbers; bare values above 10 are
/// treated as percentages, so `"150"` means 150% rather than 150x. The
/// returned factor is unclamped.
pub fn parse_zoom_text(input: &str) -> Result<f32, ZoomTextError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ZoomTextError::Empty);
    }

    if let Some(stripped) = trimmed.strip_suffix('%') {
        let percent: f32 = stripped
            .trim()
            .parse()
            .map_err(|_| ZoomTextError::NotANumber(input.to_string()))?;
        return Ok(percent / 100.0);
    }

    let value: f32 = trimmed
        .parse()
        .map_err(|_| ZoomTextError::NotANumber(input.to_string()))?;

    if value > 10.0 {
        Ok(value / 100.0)
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_suffix_divides_by_hundred() {
        assert_eq!(parse_zoom_text("150%"), Ok(1.5));
        assert_eq!(parse_zoom_text(" 75 % "), Ok(0.75));
    }

    #[test]
    fn bare_factors_pass_through() {
        assert_eq!(parse_zoom_text("1.5"), Ok(1.5));
        assert_eq!(parse_zoom_text("0.5"), Ok(0.5));
    }

    #[test]
    fn large_bare_values_are_percentages() {
        assert_eq!(parse_zoom_text("150"), Ok(1.5));
        // 10 is the threshold: still a factor
        assert_eq!(parse_zoom_text("10"), Ok(10.0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_zoom_text(""), Err(ZoomTextError::Empty));
        assert!(matches!(
            parse_zoom_text("big"),
            Err(ZoomTextError::NotANumber(_))
        ));
    }

    #[test]
    fn limits_clamp_and_reject_non_finite() {
        let limits = ScaleLimits::new(0.3, 3.0);
        assert_eq!(limits.clamp(0.1), Some(0.3));
        assert_eq!(limits.clamp(9.0), Some(3.0));
        assert_eq!(limits.clamp(1.5), Some(1.5));
        assert_eq!(limits.clamp(f32::NAN), None);
        assert_eq!(limits.clamp(f32::INFINITY), None);
    }

    #[test]
    fn inverted_limits_are_reordered() {
        let limits = ScaleLimits::new(3.0, 0.3);
        assert_eq!(limits.clamp(0.1), Some(0.3));
    }
}
