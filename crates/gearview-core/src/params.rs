//! Editable part parameters and their validation
//!
//! A part's parameters are edited as text in the UI. Submitting the form either
//! yields the complete parameter set or rejects the whole batch; valid fields
//! from a rejected batch are never applied on their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Parameter values keyed by field name, submitted to the backend as-is
pub type ParamSet = BTreeMap<String, f64>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParamError {
    #[error("{label} is not a number: {raw:?}")]
    NotANumber { label: String, raw: String },
    #[error("{label} out of range [{min}, {max}]: {value}")]
    OutOfRange {
        label: String,
        min: f64,
        max: f64,
        value: f64,
    },
}

/// One editable numeric field of a part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Key used in the submitted parameter set (e.g., "teeth")
    pub name: String,
    /// Label shown next to the input
    pub label: String,
    pub min: f64,
    pub max: f64,
    /// Drag increment in the UI
    #[serde(default = "default_step")]
    pub step: f64,
    pub default: f64,
}

fn default_step() -> f64 {
    1.0
}

impl FieldSpec {
    /// Check a value against `[min, max]`
    pub fn check(&self, value: f64) -> Result<f64, ParamError> {
        if value.is_nan() {
            return Err(ParamError::NotANumber {
                label: self.label.clone(),
                raw: value.to_string(),
            });
        }
        if value < self.min || value > self.max {
            return Err(ParamError::OutOfRange {
                label: self.label.clone(),
                min: self.min,
                max: self.max,
                value,
            });
        }
        Ok(value)
    }

    /// Parse raw input text and check it
    pub fn parse(&self, raw: &str) -> Result<f64, ParamError> {
        let value: f64 = raw.trim().parse().map_err(|_| ParamError::NotANumber {
            label: self.label.clone(),
            raw: raw.to_string(),
        })?;
        self.check(value)
    }
}

/// One row of the parameter form
#[derive(Debug, Clone, PartialEq)]
pub struct FormEntry {
    pub field: FieldSpec,
    /// Text currently in the input box
    pub text: String,
}

/// Parameter form for one part type
#[derive(Debug, Clone, PartialEq)]
pub struct ParamForm {
    pub part_type: String,
    pub entries: Vec<FormEntry>,
}

impl ParamForm {
    /// Build a form, showing provided values and falling back to field defaults
    pub fn new(part_type: &str, fields: &[FieldSpec], values: &ParamSet) -> Self {
        let entries = fields
            .iter()
            .map(|field| {
                let value = values.get(&field.name).copied().unwrap_or(field.default);
                FormEntry {
                    field: field.clone(),
                    text: value.to_string(),
                }
            })
            .collect();

        Self {
            part_type: part_type.to_string(),
            entries,
        }
    }

    /// Validate every entry; the first invalid one rejects the whole form
    pub fn submit(&self) -> Result<ParamSet, ParamError> {
        let mut params = ParamSet::new();
        for entry in &self.entries {
            let value = entry.field.parse(&entry.text)?;
            params.insert(entry.field.name.clone(), value);
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec {
                name: "teeth".to_string(),
                label: "Teeth".to_string(),
                min: 5.0,
                max: 200.0,
                step: 1.0,
                default: 20.0,
            },
            FieldSpec {
                name: "module".to_string(),
                label: "Module (mm)".to_string(),
                min: 0.1,
                max: 10.0,
                step: 0.1,
                default: 1.0,
            },
        ]
    }

    #[test]
    fn test_form_uses_values_then_defaults() {
        let mut values = ParamSet::new();
        values.insert("teeth".to_string(), 32.0);
        let form = ParamForm::new("gear", &gear_fields(), &values);

        assert_eq!(form.entries[0].text, "32");
        assert_eq!(form.entries[1].text, "1");
    }

    #[test]
    fn test_in_range_values_submitted_verbatim() {
        let mut form = ParamForm::new("gear", &gear_fields(), &ParamSet::new());
        form.entries[0].text = "57".to_string();
        form.entries[1].text = " 2.35 ".to_string();

        let params = form.submit().unwrap();
        assert_eq!(params["teeth"], 57.0);
        assert_eq!(params["module"], 2.35);
    }

    #[test]
    fn test_out_of_range_rejects_whole_batch() {
        let mut form = ParamForm::new("gear", &gear_fields(), &ParamSet::new());
        form.entries[0].text = "30".to_string();
        form.entries[1].text = "12".to_string();

        let err = form.submit().unwrap_err();
        assert_eq!(
            err,
            ParamError::OutOfRange {
                label: "Module (mm)".to_string(),
                min: 0.1,
                max: 10.0,
                value: 12.0,
            }
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let field = &gear_fields()[0];
        assert_eq!(field.check(5.0), Ok(5.0));
        assert_eq!(field.check(200.0), Ok(200.0));
        assert!(field.check(4.999).is_err());
    }

    #[test]
    fn test_not_a_number() {
        let field = &gear_fields()[0];
        assert!(matches!(field.parse("abc"), Err(ParamError::NotANumber { .. })));
        assert!(matches!(field.parse(""), Err(ParamError::NotANumber { .. })));
        assert!(matches!(field.parse("NaN"), Err(ParamError::NotANumber { .. })));
    }
}
