use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{domain::ResponseShape, error::DecodeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub site: String,
    pub temp: f64,
}

impl TemperatureReading {
    pub fn new(site: impl Into<String>, temp: f64) -> Self {
        Self {
            site: site.into(),
            temp,
        }
    }

    /// Sentence shown on the page, e.g. `Der Bodensee ist gerade 21.5° warm.`
    pub fn message(&self) -> String {
        format!(
            "Der {} ist gerade {}° warm.",
            self.site,
            format_number(self.temp)
        )
    }
}

/// Decodes a response body according to `shape`.
///
/// `site` selects the nested entry and labels the resulting reading; the flat
/// layout carries no site of its own.
pub fn decode_reading(
    shape: ResponseShape,
    site: &str,
    body: &[u8],
) -> Result<TemperatureReading, DecodeError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let field = match shape {
        ResponseShape::Flat => value.get("temp"),
        ResponseShape::Nested => value
            .get("becken")
            .and_then(|becken| becken.get(site))
            .and_then(|entry| entry.get("temp")),
    };

    let path = shape.field_path(site);
    let temp = field
        .ok_or_else(|| DecodeError::MissingField(path.clone()))?
        .as_f64()
        .ok_or(DecodeError::NotANumber(path))?;

    Ok(TemperatureReading::new(site, temp))
}

/// Builds the JSON body the endpoint serves for `shape`.
///
/// The flat layout keeps the site name under `becken` as a plain string.
pub fn reading_body(shape: ResponseShape, reading: &TemperatureReading) -> Value {
    match shape {
        ResponseShape::Flat => json!({ "becken": reading.site, "temp": reading.temp }),
        ResponseShape::Nested => {
            let mut sites = Map::new();
            sites.insert(reading.site.clone(), json!({ "temp": reading.temp }));
            json!({ "becken": sites })
        }
    }
}

/// Entry written for the click counter.
pub fn click_message(clicks: u64) -> String {
    format!("Clicked {clicks} time(s)!")
}

/// Renders a number the way page text interpolation does: integral values
/// without a fractional part, no negative zero, and exponent notation
/// (`1e+21`, `1.5e-7`) outside `[1e-6, 1e21)`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if !(1e-6..1e21).contains(&magnitude) {
        let formatted = format!("{value:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        };
    }
    format!("{value}")
}
