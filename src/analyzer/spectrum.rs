//! Spectrum definitions and parameter validation.

use std::collections::HashMap;
use thiserror::Error;

/// Absorbs the binary representation error of decimal step widths when the
/// energy window is an exact multiple of the step. A 4 eV window at 0.1 eV
/// steps must come out at 41 samples, not 40.
const STEP_EPSILON: f64 = 1e-9;

/// Why a spectrum definition was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing or invalid field '{0}'")]
    MissingOrInvalidField(String),

    #[error("field '{0}' is out of range")]
    OutOfRange(String),
}

impl ValidationError {
    /// Name of the failing field.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingOrInvalidField(field) | Self::OutOfRange(field) => field,
        }
    }
}

/// A validated fixed-analyzer-transmission spectrum definition.
///
/// Immutable once constructed; the derived sample count is cached at
/// validation time and never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumDefinition {
    /// First kinetic energy of the sweep, in eV.
    pub start_energy: f64,
    /// Last kinetic energy of the sweep, in eV.
    pub end_energy: f64,
    /// Energy distance between two samples, in eV.
    pub step_width: f64,
    /// Integration time per sample, in seconds.
    pub dwell_time: f64,
    /// Analyzer pass energy, in eV.
    pub pass_energy: f64,
    /// Electrostatic lens mode tag, free-form.
    pub lens_mode: Option<String>,
    /// Scan range tag, free-form.
    pub scan_range: Option<String>,
    sample_count: usize,
}

impl SpectrumDefinition {
    /// Validates raw wire parameters into a spectrum definition.
    ///
    /// Required keys are `StartEnergy`, `EndEnergy`, `StepWidth`,
    /// `DwellTime` and `PassEnergy`; `LensMode` and `ScanRange` pass
    /// through unvalidated.
    pub fn validate(raw: &HashMap<String, String>) -> Result<Self, ValidationError> {
        let start_energy = required_f64(raw, "StartEnergy")?;
        let end_energy = required_f64(raw, "EndEnergy")?;
        let step_width = required_f64(raw, "StepWidth")?;
        let dwell_time = required_f64(raw, "DwellTime")?;
        let pass_energy = required_f64(raw, "PassEnergy")?;

        if end_energy <= start_energy {
            return Err(ValidationError::OutOfRange("EndEnergy".into()));
        }
        if step_width <= 0.0 {
            return Err(ValidationError::OutOfRange("StepWidth".into()));
        }
        if dwell_time <= 0.0 {
            return Err(ValidationError::OutOfRange("DwellTime".into()));
        }
        if pass_energy <= 0.0 {
            return Err(ValidationError::OutOfRange("PassEnergy".into()));
        }

        let steps = (end_energy - start_energy) / step_width;
        let sample_count = (steps + STEP_EPSILON).floor() as usize + 1;

        Ok(Self {
            start_energy,
            end_energy,
            step_width,
            dwell_time,
            pass_energy,
            lens_mode: raw.get("LensMode").cloned(),
            scan_range: raw.get("ScanRange").cloned(),
            sample_count,
        })
    }

    /// Number of samples in the sweep, always at least one.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Kinetic energy of sample `index`.
    pub fn energy_at(&self, index: usize) -> f64 {
        self.start_energy + index as f64 * self.step_width
    }

    /// Nominal duration of a full sweep, in seconds.
    pub fn total_time(&self) -> f64 {
        self.sample_count as f64 * self.dwell_time
    }
}

fn required_f64(raw: &HashMap<String, String>, key: &str) -> Result<f64, ValidationError> {
    let missing = || ValidationError::MissingOrInvalidField(key.to_string());
    let value: f64 = raw
        .get(key)
        .ok_or_else(missing)?
        .trim()
        .parse()
        .map_err(|_| missing())?;
    if !value.is_finite() {
        return Err(missing());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fat_params() -> HashMap<String, String> {
        raw(&[
            ("StartEnergy", "82.0"),
            ("EndEnergy", "86.0"),
            ("StepWidth", "0.1"),
            ("DwellTime", "0.5"),
            ("PassEnergy", "10.0"),
        ])
    }

    #[test]
    fn derives_sample_count_from_decimal_step() {
        let definition = SpectrumDefinition::validate(&fat_params()).unwrap();
        // (86 - 82) / 0.1 has no exact binary representation; the count must
        // still land on the mathematical answer.
        assert_eq!(definition.sample_count(), 41);
    }

    #[test]
    fn keeps_optional_tags() {
        let mut params = fat_params();
        params.insert("LensMode".into(), "Wide Angle".into());
        params.insert("ScanRange".into(), "MediumArea".into());
        let definition = SpectrumDefinition::validate(&params).unwrap();
        assert_eq!(definition.lens_mode.as_deref(), Some("Wide Angle"));
        assert_eq!(definition.scan_range.as_deref(), Some("MediumArea"));
    }

    #[test]
    fn single_step_yields_two_samples() {
        let params = raw(&[
            ("StartEnergy", "10.0"),
            ("EndEnergy", "10.5"),
            ("StepWidth", "0.5"),
            ("DwellTime", "0.1"),
            ("PassEnergy", "20.0"),
        ]);
        let definition = SpectrumDefinition::validate(&params).unwrap();
        assert_eq!(definition.sample_count(), 2);
        assert_eq!(definition.energy_at(1), 10.5);
    }

    #[test]
    fn partial_trailing_step_is_truncated() {
        let params = raw(&[
            ("StartEnergy", "0.0"),
            ("EndEnergy", "1.0"),
            ("StepWidth", "0.4"),
            ("DwellTime", "0.1"),
            ("PassEnergy", "20.0"),
        ]);
        // 0.0, 0.4, 0.8; the 1.2 sample would overshoot the end energy.
        let definition = SpectrumDefinition::validate(&params).unwrap();
        assert_eq!(definition.sample_count(), 3);
    }

    #[test]
    fn missing_field_reports_key() {
        let mut params = fat_params();
        params.remove("DwellTime");
        let err = SpectrumDefinition::validate(&params).unwrap_err();
        assert_eq!(err, ValidationError::MissingOrInvalidField("DwellTime".into()));
        assert_eq!(err.field(), "DwellTime");
    }

    #[test]
    fn non_numeric_field_reports_key() {
        let mut params = fat_params();
        params.insert("PassEnergy".into(), "ten".into());
        let err = SpectrumDefinition::validate(&params).unwrap_err();
        assert_eq!(err, ValidationError::MissingOrInvalidField("PassEnergy".into()));
    }

    #[test]
    fn non_finite_field_is_invalid() {
        let mut params = fat_params();
        params.insert("EndEnergy".into(), "inf".into());
        let err = SpectrumDefinition::validate(&params).unwrap_err();
        assert_eq!(err, ValidationError::MissingOrInvalidField("EndEnergy".into()));
    }

    #[test]
    fn inverted_window_blames_end_energy() {
        let params = raw(&[
            ("StartEnergy", "20.0"),
            ("EndEnergy", "10.0"),
            ("StepWidth", "0.1"),
            ("DwellTime", "0.5"),
            ("PassEnergy", "10.0"),
        ]);
        let err = SpectrumDefinition::validate(&params).unwrap_err();
        assert_eq!(err, ValidationError::OutOfRange("EndEnergy".into()));
    }

    #[test]
    fn rejects_non_positive_step_and_dwell() {
        let mut params = fat_params();
        params.insert("StepWidth".into(), "0".into());
        assert_eq!(
            SpectrumDefinition::validate(&params).unwrap_err(),
            ValidationError::OutOfRange("StepWidth".into())
        );

        let mut params = fat_params();
        params.insert("DwellTime".into(), "-0.5".into());
        assert_eq!(
            SpectrumDefinition::validate(&params).unwrap_err(),
            ValidationError::OutOfRange("DwellTime".into())
        );
    }
}
