//! Hall-effect current sensors on each pump's supply line.
//!
//! The sensor idles at a zero-offset voltage and swings by a fixed
//! sensitivity per amp.  Conversion averages a burst of raw ADC samples,
//! applies the linear calibration and clamps negative results to zero.
//!
//! A disconnected sensor rests at the zero offset and therefore reads 0 A,
//! indistinguishable from a pump that draws nothing.

/// Raw samples averaged per reading.
pub const SAMPLES_PER_READING: usize = 8;

/// Linear calibration of one current channel.
#[derive(Debug, Clone, Copy)]
pub struct CurrentCalibration {
    /// ADC reference voltage in millivolts.
    pub adc_ref_mv: f32,
    /// Full-scale ADC count (12-bit → 4095).
    pub adc_full_scale: u16,
    /// Output voltage at 0 A, in millivolts.
    pub zero_offset_mv: f32,
    /// Output swing per amp, in millivolts.
    pub sensitivity_mv_per_a: f32,
}

impl Default for CurrentCalibration {
    fn default() -> Self {
        // ACS712-20A behind a 5 V → 3.3 V divider.
        Self {
            adc_ref_mv: 3300.0,
            adc_full_scale: 4095,
            zero_offset_mv: 1650.0,
            sensitivity_mv_per_a: 66.0,
        }
    }
}

impl CurrentCalibration {
    /// ADC count the sensor produces at rest (0 A).
    pub fn zero_offset_raw(&self) -> u16 {
        let raw = self.zero_offset_mv / self.adc_ref_mv * self.adc_full_scale as f32;
        raw.round().clamp(0.0, self.adc_full_scale as f32) as u16
    }

    /// ADC count corresponding to `amps`, for simulation and tests.
    pub fn raw_for_amps(&self, amps: f32) -> u16 {
        let mv = self.zero_offset_mv + amps * self.sensitivity_mv_per_a;
        let raw = mv / self.adc_ref_mv * self.adc_full_scale as f32;
        raw.round().clamp(0.0, self.adc_full_scale as f32) as u16
    }

    /// Average `samples` and convert to amps.  Empty input reads 0 A.
    pub fn amps(&self, samples: &[u16]) -> f32 {
        if samples.is_empty() || self.sensitivity_mv_per_a <= 0.0 {
            return 0.0;
        }
        let sum: u32 = samples.iter().map(|&s| u32::from(s)).sum();
        let avg_raw = sum as f32 / samples.len() as f32;
        let mv = avg_raw / self.adc_full_scale as f32 * self.adc_ref_mv;
        ((mv - self.zero_offset_mv) / self.sensitivity_mv_per_a).max(0.0)
    }
}
