//! Configuration parameters for the fingerprint engine

use crate::error::EngineError;

/// Engine configuration parameters
///
/// One record enumerates every recognized option. The defaults are tuned for
/// music on human-hearable bands and must match between the learn and query
/// paths of any given database: fingerprints produced under different
/// configurations do not compare.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Resampling
    /// Post-decimation sample rate in Hz (default: 11025)
    pub target_rate: u32,

    /// Anti-alias FIR tap count, must be odd (default: 101)
    pub fir_order: usize,

    // STFT parameters
    /// STFT window size in samples (default: 1024)
    pub window_len: usize,

    /// STFT hop in samples (default: 512, i.e. 50% overlap)
    pub hop: usize,

    // Peak extraction
    /// Log-frequency NMS width coefficient (default: 4.0)
    /// The frequency half-width at bin f is max(1, floor(nms_alpha * ln(1 + f)))
    pub nms_alpha: f32,

    /// NMS time half-width in frames (default: 3)
    pub nms_time_half: usize,

    /// Percentile threshold for peak retention (default: 75.0)
    /// A peak must strictly exceed this percentile of its wider neighborhood
    pub percentile: f32,

    // Fingerprint pairing
    /// Maximum target peaks paired with one anchor (default: 5)
    pub fanout: usize,

    /// Target zone lower time bound in frames (default: 1)
    pub dt_min: usize,

    /// Target zone upper time bound in frames (default: 32)
    pub dt_max: usize,

    /// Target zone frequency bound in bins (default: 64)
    pub df_max: usize,

    // Matcher thresholds
    /// Minimum address matches for a track to be considered (default: 5)
    pub k_min: usize,

    /// Minimum coherent score for a positive identification (default: 5)
    pub s_min: usize,

    /// Required lead over the second-best track's score (default: 2)
    pub margin: usize,

    /// Offset histogram bucket width in frames (default: 1)
    pub bucket: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_rate: 11025,
            fir_order: 101,
            window_len: 1024,
            hop: 512,
            nms_alpha: 4.0,
            nms_time_half: 3,
            percentile: 75.0,
            fanout: 5,
            dt_min: 1,
            dt_max: 32,
            df_max: 64,
            k_min: 5,
            s_min: 5,
            margin: 2,
            bucket: 1,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    ///
    /// Checks the ranges the address encoding and the pipeline rely on.
    /// Frequency bins and frame deltas are packed into 16-bit fields, so
    /// `window_len / 2` and `dt_max` must stay below 2^16.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` describing the offending option.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.target_rate == 0 {
            return Err(EngineError::InvalidInput(
                "target_rate must be > 0".to_string(),
            ));
        }
        if self.fir_order < 3 || self.fir_order % 2 == 0 {
            return Err(EngineError::InvalidInput(format!(
                "fir_order must be an odd tap count >= 3, got {}",
                self.fir_order
            )));
        }
        if self.window_len < 2 || self.window_len % 2 != 0 {
            return Err(EngineError::InvalidInput(format!(
                "window_len must be an even size >= 2, got {}",
                self.window_len
            )));
        }
        if self.window_len / 2 >= (1 << 16) {
            return Err(EngineError::InvalidInput(format!(
                "window_len {} yields more frequency bins than the address encoding can hold",
                self.window_len
            )));
        }
        if self.hop == 0 || self.hop > self.window_len {
            return Err(EngineError::InvalidInput(format!(
                "hop must be in 1..=window_len, got {}",
                self.hop
            )));
        }
        if self.nms_alpha <= 0.0 || !self.nms_alpha.is_finite() {
            return Err(EngineError::InvalidInput(format!(
                "nms_alpha must be a positive finite value, got {}",
                self.nms_alpha
            )));
        }
        if self.nms_time_half == 0 {
            return Err(EngineError::InvalidInput(
                "nms_time_half must be >= 1".to_string(),
            ));
        }
        if !(self.percentile > 0.0 && self.percentile <= 100.0) {
            return Err(EngineError::InvalidInput(format!(
                "percentile must be in (0, 100], got {}",
                self.percentile
            )));
        }
        if self.fanout == 0 {
            return Err(EngineError::InvalidInput(
                "fanout must be >= 1".to_string(),
            ));
        }
        if self.dt_min == 0 || self.dt_min > self.dt_max {
            return Err(EngineError::InvalidInput(format!(
                "target zone time bounds must satisfy 1 <= dt_min <= dt_max, got {}..{}",
                self.dt_min, self.dt_max
            )));
        }
        if self.dt_max >= (1 << 16) {
            return Err(EngineError::InvalidInput(format!(
                "dt_max {} exceeds the address encoding's frame-delta range",
                self.dt_max
            )));
        }
        if self.df_max >= (1 << 16) {
            return Err(EngineError::InvalidInput(format!(
                "df_max {} exceeds the address encoding's bin range",
                self.df_max
            )));
        }
        if self.bucket == 0 {
            return Err(EngineError::InvalidInput(
                "bucket width must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_even_fir_order_rejected() {
        let config = EngineConfig {
            fir_order: 100,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_hop_rejected() {
        let config = EngineConfig {
            hop: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_target_zone_rejected() {
        let config = EngineConfig {
            dt_min: 40,
            dt_max: 32,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_percentile_bounds() {
        let config = EngineConfig {
            percentile: 0.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            percentile: 100.0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
