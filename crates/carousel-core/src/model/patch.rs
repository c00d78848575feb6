//! Partial object updates.

use super::LayoutObject;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from building a patch out of `key=value` text.
#[derive(Debug, Error, PartialEq)]
pub enum PatchError {
    #[error("Unknown object field: {0}")]
    UnknownField(String),
    #[error("Field {field} expects a number, got {value:?}")]
    InvalidNumber { field: String, value: String },
}

/// A shallow partial update of a [`LayoutObject`].
///
/// Every `Some` field overwrites the object's field; `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file_name: Option<String>,
}

impl ObjectPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// The update a finished drag produces.
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge this patch over `object`.
    pub fn apply(&self, object: &mut LayoutObject) {
        if let Some(x) = self.x {
            object.x = x;
        }
        if let Some(y) = self.y {
            object.y = y;
        }
        if self.width.is_some() {
            object.width = self.width;
        }
        if self.height.is_some() {
            object.height = self.height;
        }
        if self.radius.is_some() {
            object.radius = self.radius;
        }
        if self.rotation.is_some() {
            object.rotation = self.rotation;
        }
        if let Some(fill) = &self.fill {
            object.fill = Some(fill.clone());
        }
        if let Some(text) = &self.text {
            object.text = Some(text.clone());
        }
        if let Some(family) = &self.font_family {
            object.font_family = Some(family.clone());
        }
        if self.font_size.is_some() {
            object.font_size = self.font_size;
        }
        if let Some(url) = &self.image_url {
            object.image_url = Some(url.clone());
        }
        if let Some(name) = &self.image_file_name {
            object.image_file_name = Some(name.clone());
        }
    }

    /// Set one field from its JSON name and a textual value, as typed on a
    /// command line or in a properties panel.
    pub fn set_field(&mut self, key: &str, value: &str) -> Result<(), PatchError> {
        let number = || {
            value.trim().parse::<f64>().map_err(|_| PatchError::InvalidNumber {
                field: key.to_string(),
                value: value.to_string(),
            })
        };
        match key {
            "x" => self.x = Some(number()?),
            "y" => self.y = Some(number()?),
            "width" => self.width = Some(number()?),
            "height" => self.height = Some(number()?),
            "radius" => self.radius = Some(number()?),
            "rotation" => self.rotation = Some(number()?),
            "fontSize" => self.font_size = Some(number()?),
            "fill" => self.fill = Some(value.to_string()),
            "text" => self.text = Some(value.to_string()),
            "fontFamily" => self.font_family = Some(value.to_string()),
            "imageUrl" => self.image_url = Some(value.to_string()),
            "imageFileName" => self.image_file_name = Some(value.to_string()),
            other => return Err(PatchError::UnknownField(other.to_string())),
        }
        Ok(())
    }
}
