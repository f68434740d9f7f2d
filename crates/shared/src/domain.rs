use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! seq_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

seq_newtype!(RequestSeq);
seq_newtype!(ActivationSeq);

/// The site whose temperature the `/api/bodensee` endpoint reports.
pub const DEFAULT_SITE: &str = "Bodensee";

/// Endpoint name observed in the page scripts (`GET /api/bodensee`).
pub const DEFAULT_API_NAME: &str = "bodensee";

/// JSON layout of a temperature response.
///
/// Two layouts are in circulation and neither is canonical:
/// - `nested`: `{ "becken": { "<site>": { "temp": number } } }`
/// - `flat`: `{ "temp": number }`, optionally with other top-level keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    Nested,
    #[default]
    Flat,
}

impl ResponseShape {
    /// Dotted path of the temperature field for this layout.
    pub fn field_path(&self, site: &str) -> String {
        match self {
            Self::Nested => format!("becken.{site}.temp"),
            Self::Flat => "temp".to_string(),
        }
    }
}

impl std::str::FromStr for ResponseShape {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "nested" => Ok(Self::Nested),
            "flat" => Ok(Self::Flat),
            other => Err(format!("unknown response shape '{other}' (expected nested|flat)")),
        }
    }
}

/// How a handler writes an entry into a display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceMode {
    /// Overwrite the whole text of the surface.
    #[default]
    Replace,
    /// Add a new child entry after the existing content.
    Append,
}
