//! Coordinate bucketing for cache keys.
//!
//! Nearby coordinates are rounded to a fixed resolution before being used as
//! tag values, so lookups a few centimetres apart share one cache entry.

use crate::cache::Tags;

/// About one metre of latitude, in degrees.
pub const METER_RESOLUTION: f64 = 0.000_01;

/// Errors from coordinate quantization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("invalid resolution {0}: must be finite and greater than zero")]
    InvalidResolution(f64),
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `lat`/`lon` tags rounded to `resolution` degrees.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidResolution`] for a non-positive or
    /// non-finite resolution.
    pub fn bucket_tags(&self, resolution: f64) -> Result<Tags, GeoError> {
        Ok(Tags::new()
            .with("lat", quantize(self.lat, resolution)?)
            .with("lon", quantize(self.lon, resolution)?))
    }
}

/// Rounds `value` to the nearest multiple of `resolution` and prints it with
/// exactly as many decimals as `resolution` needs.
///
/// # Errors
///
/// Returns [`GeoError::InvalidResolution`] for a non-positive or non-finite
/// resolution.
pub fn quantize(value: f64, resolution: f64) -> Result<String, GeoError> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(GeoError::InvalidResolution(resolution));
    }

    let decimals = decimals_for(resolution);
    let rounded = (value / resolution).round() * resolution;
    let text = format!("{rounded:.decimals$}");

    // "-0.00000" and "0.00000" must share a bucket.
    if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        return Ok(text.trim_start_matches('-').to_string());
    }
    Ok(text)
}

/// Decimal places needed to print multiples of `resolution`.
fn decimals_for(resolution: f64) -> usize {
    // Tolerance absorbs log10 error, e.g. log10(1e-5) = -5.000000000000001.
    let digits = (-resolution.log10() - 1e-9).ceil();
    if digits <= 0.0 { 0 } else { digits as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_meter_resolution() {
        assert_eq!(quantize(37.774_929_1, METER_RESOLUTION).unwrap(), "37.77493");
        assert_eq!(quantize(-122.419_415_5, METER_RESOLUTION).unwrap(), "-122.41942");
    }

    #[test]
    fn test_nearby_points_share_bucket() {
        let a = Coordinate::new(37.774_930_1, -122.419_420_2);
        let b = Coordinate::new(37.774_929_8, -122.419_419_9);
        assert_eq!(
            a.bucket_tags(METER_RESOLUTION).unwrap(),
            b.bucket_tags(METER_RESOLUTION).unwrap()
        );
    }

    #[test]
    fn test_distant_points_differ() {
        let a = Coordinate::new(37.7749, -122.4194);
        let b = Coordinate::new(37.7750, -122.4194);
        assert_ne!(
            a.bucket_tags(METER_RESOLUTION).unwrap(),
            b.bucket_tags(METER_RESOLUTION).unwrap()
        );
    }

    #[test]
    fn test_coarse_resolution() {
        assert_eq!(quantize(12.34, 0.5).unwrap(), "12.5");
        assert_eq!(quantize(12.2, 1.0).unwrap(), "12");
        assert_eq!(quantize(1234.0, 100.0).unwrap(), "1200");
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(quantize(-0.000_001, METER_RESOLUTION).unwrap(), "0.00000");
    }

    #[test]
    fn test_invalid_resolution() {
        assert!(quantize(1.0, 0.0).is_err());
        assert!(quantize(1.0, -1.0).is_err());
        assert!(quantize(1.0, f64::NAN).is_err());
        assert!(quantize(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_bucket_tags_are_valid_cache_tags() {
        let tags = Coordinate::new(51.5, -0.12)
            .bucket_tags(METER_RESOLUTION)
            .unwrap();
        assert_eq!(tags.serialize().unwrap(), "lat=51.50000&lon=-0.12000");
    }
}
