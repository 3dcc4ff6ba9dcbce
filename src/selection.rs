//! Selection model: month, dataset key and the user's current choice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::LayerDescriptor;
use crate::error::{HexlayerError, Result};

/// A calendar month in `YYYYMM` form
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month(String);

impl Month {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label, `2023-07` for `202307`
    pub fn label(&self) -> String {
        format!("{}-{}", &self.0[..4], &self.0[4..])
    }
}

impl FromStr for Month {
    type Err = HexlayerError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || HexlayerError::invalid_param("month", format!("Expected YYYYMM, got '{}'", s));

        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let month: u32 = s[4..].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Ok(Month(s.to_string()))
    }
}

impl TryFrom<String> for Month {
    type Error = HexlayerError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one dataset resource: `{month}-{depth}-{layer_id}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DatasetKey {
    pub month: Month,
    pub depth: i32,
    pub layer_id: String,
}

impl DatasetKey {
    pub fn new(month: Month, depth: i32, layer_id: impl Into<String>) -> Self {
        Self {
            month,
            depth,
            layer_id: layer_id.into(),
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.month, self.depth, self.layer_id)
    }
}

/// What the user is currently looking at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub layer: Option<LayerDescriptor>,
    pub month: Month,
    pub depth: i32,
}

impl Selection {
    /// Key of the dataset this selection refers to; `None` without a layer
    pub fn key(&self) -> Option<DatasetKey> {
        self.layer
            .as_ref()
            .map(|layer| DatasetKey::new(self.month.clone(), self.depth, layer.id.clone()))
    }

    /// The depth selector only makes sense with more than one choice
    pub fn depth_selector_enabled(&self) -> bool {
        self.layer
            .as_ref()
            .map(|layer| layer.depths.len() > 1)
            .unwrap_or(false)
    }
}

/// A partial update to the selection; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionChange {
    pub layer: Option<String>,
    pub month: Option<String>,
    pub depth: Option<i32>,
}
