//! Human-facing form values and their conversion to model units.

use serde::{Deserialize, Serialize};

use crate::core::{FeatureRange, ModelInfo, PredictorError, PredictorResult};

/// The dataset stores median income in tens of thousands of dollars.
pub const INCOME_SCALE: f64 = 10_000.0;

/// Target values are in units of $100,000.
pub const HOUSE_VALUE_SCALE: f64 = 100_000.0;

/// One entry of the input form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormField {
    pub label: &'static str,
    pub feature: &'static str,
    /// Divide the entered value by this to get model units.
    pub scale: f64,
}

pub const FORM_FIELDS: [FormField; 8] = [
    FormField {
        label: "Median Income ($ per household)",
        feature: "MedInc",
        scale: INCOME_SCALE,
    },
    FormField {
        label: "House Age (years)",
        feature: "HouseAge",
        scale: 1.0,
    },
    FormField {
        label: "Average Rooms per Household",
        feature: "AveRooms",
        scale: 1.0,
    },
    FormField {
        label: "Average Bedrooms per Household",
        feature: "AveBedrms",
        scale: 1.0,
    },
    FormField {
        label: "Population (number of residents)",
        feature: "Population",
        scale: 1.0,
    },
    FormField {
        label: "Average Household Size",
        feature: "AveOccup",
        scale: 1.0,
    },
    FormField {
        label: "Latitude",
        feature: "Latitude",
        scale: 1.0,
    },
    FormField {
        label: "Longitude",
        feature: "Longitude",
        scale: 1.0,
    },
];

/// Neighbourhood characteristics in human-readable units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HousingInputs {
    pub median_income: f64,
    pub house_age: f64,
    pub avg_rooms: f64,
    pub avg_bedrooms: f64,
    pub population: f64,
    pub avg_occupancy: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for HousingInputs {
    // Dataset means, income in dollars.
    fn default() -> Self {
        Self {
            median_income: 38_700.0,
            house_age: 28.6,
            avg_rooms: 5.43,
            avg_bedrooms: 1.07,
            population: 1425.0,
            avg_occupancy: 3.07,
            latitude: 35.6,
            longitude: -119.6,
        }
    }
}

impl HousingInputs {
    /// Values in form order, as entered.
    pub fn as_entered(&self) -> [f64; 8] {
        [
            self.median_income,
            self.house_age,
            self.avg_rooms,
            self.avg_bedrooms,
            self.population,
            self.avg_occupancy,
            self.latitude,
            self.longitude,
        ]
    }

    /// Positional feature vector in the units the model was trained on.
    pub fn to_features(&self) -> Vec<f64> {
        self.as_entered()
            .iter()
            .zip(FORM_FIELDS.iter())
            .map(|(value, field)| value / field.scale)
            .collect()
    }

    /// Check that the model expects the form's features, in form order, and
    /// that every value lies inside the published training ranges.
    pub fn validate_for(&self, info: &ModelInfo) -> PredictorResult<()> {
        let expected = FORM_FIELDS.iter().map(|f| f.feature);
        if info.feature_names.len() != FORM_FIELDS.len()
            || !info.feature_names.iter().map(String::as_str).eq(expected)
        {
            return Err(PredictorError::InvalidInput(format!(
                "model features {:?} do not match the housing form",
                info.feature_names
            )));
        }

        match &info.feature_ranges {
            Some(ranges) => self.validate(ranges),
            None => Ok(()),
        }
    }

    /// Check every field against the training ranges (model units).
    pub fn validate(&self, ranges: &[FeatureRange]) -> PredictorResult<()> {
        if ranges.len() != FORM_FIELDS.len() {
            return Err(PredictorError::InvalidInput(format!(
                "model publishes {} feature ranges, the form has {} fields",
                ranges.len(),
                FORM_FIELDS.len()
            )));
        }

        for ((value, field), range) in self
            .to_features()
            .into_iter()
            .zip(FORM_FIELDS.iter())
            .zip(ranges)
        {
            if !range.contains(value) {
                return Err(PredictorError::InvalidInput(format!(
                    "{} must be between {} and {}",
                    field.label,
                    range.min * field.scale,
                    range.max * field.scale
                )));
            }
        }
        Ok(())
    }
}

/// Render a prediction (in $100,000s) as whole dollars, e.g. `$206,855`.
pub fn format_house_value(prediction: f64) -> String {
    let dollars = (prediction * HOUSE_VALUE_SCALE).round() as i64;
    let digits = dollars.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if dollars < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}
