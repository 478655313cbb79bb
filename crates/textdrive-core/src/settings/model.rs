//! Editor settings domain models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TextDriveError};

/// Tab width used whenever a tab width of zero is requested.
pub const FALLBACK_TAB_SIZE: i64 = 8;

/// Keys of the editor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKey {
    Autosave,
    FontSize,
    LineNumbers,
    Margin,
    MarginCol,
    TabSize,
    WrapLines,
}

impl SettingKey {
    pub const ALL: [SettingKey; 7] = [
        SettingKey::Autosave,
        SettingKey::FontSize,
        SettingKey::LineNumbers,
        SettingKey::Margin,
        SettingKey::MarginCol,
        SettingKey::TabSize,
        SettingKey::WrapLines,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Autosave => "autosave",
            Self::FontSize => "fontsize",
            Self::LineNumbers => "linenumbers",
            Self::Margin => "margin",
            Self::MarginCol => "margincol",
            Self::TabSize => "tabsize",
            Self::WrapLines => "wraplines",
        }
    }

    /// Whether values of this key are booleans (otherwise integers).
    pub const fn is_boolean(self) -> bool {
        matches!(
            self,
            Self::Autosave | Self::LineNumbers | Self::Margin | Self::WrapLines
        )
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = TextDriveError;

    fn from_str(s: &str) -> Result<Self> {
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| TextDriveError::not_found("setting", s))
    }
}

/// Raw value of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
}

impl SettingValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(value),
            Self::Integer(_) => None,
        }
    }

    pub fn as_integer(self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(value),
            Self::Bool(_) => None,
        }
    }

    /// Parses user input for `key`.
    pub fn parse_for(key: SettingKey, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if key.is_boolean() {
            match raw {
                "true" | "on" | "1" => Ok(Self::Bool(true)),
                "false" | "off" | "0" => Ok(Self::Bool(false)),
                _ => Err(TextDriveError::config(format!(
                    "'{raw}' is not a boolean value for {key}"
                ))),
            }
        } else {
            raw.parse::<i64>().map(Self::Integer).map_err(|_| {
                TextDriveError::config(format!("'{raw}' is not an integer value for {key}"))
            })
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
        }
    }
}

fn default_fontsize() -> i64 {
    14
}

fn default_margincol() -> i64 {
    80
}

fn default_tabsize() -> i64 {
    2
}

fn default_true() -> bool {
    true
}

/// Editor settings snapshot.
///
/// `fontsize` is not exposed in a settings form; it only changes through
/// zoom shortcuts of the editing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub autosave: bool,
    #[serde(default = "default_fontsize")]
    pub fontsize: i64,
    #[serde(default = "default_true")]
    pub linenumbers: bool,
    #[serde(default)]
    pub margin: bool,
    #[serde(default = "default_margincol")]
    pub margincol: i64,
    #[serde(default = "default_tabsize")]
    pub tabsize: i64,
    #[serde(default = "default_true")]
    pub wraplines: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            autosave: false,
            fontsize: default_fontsize(),
            linenumbers: true,
            margin: false,
            margincol: default_margincol(),
            tabsize: default_tabsize(),
            wraplines: true,
        }
    }
}

impl EditorSettings {
    pub fn get(&self, key: SettingKey) -> SettingValue {
        match key {
            SettingKey::Autosave => SettingValue::Bool(self.autosave),
            SettingKey::FontSize => SettingValue::Integer(self.fontsize),
            SettingKey::LineNumbers => SettingValue::Bool(self.linenumbers),
            SettingKey::Margin => SettingValue::Bool(self.margin),
            SettingKey::MarginCol => SettingValue::Integer(self.margincol),
            SettingKey::TabSize => SettingValue::Integer(self.tabsize),
            SettingKey::WrapLines => SettingValue::Bool(self.wraplines),
        }
    }

    /// Writes `value` under `key`, rejecting values of the wrong kind.
    pub fn set(&mut self, key: SettingKey, value: SettingValue) -> Result<()> {
        let mismatch =
            || TextDriveError::config(format!("setting {key} does not accept value {value}"));
        match key {
            SettingKey::Autosave => self.autosave = value.as_bool().ok_or_else(mismatch)?,
            SettingKey::FontSize => self.fontsize = value.as_integer().ok_or_else(mismatch)?,
            SettingKey::LineNumbers => self.linenumbers = value.as_bool().ok_or_else(mismatch)?,
            SettingKey::Margin => self.margin = value.as_bool().ok_or_else(mismatch)?,
            SettingKey::MarginCol => self.margincol = value.as_integer().ok_or_else(mismatch)?,
            SettingKey::TabSize => self.tabsize = value.as_integer().ok_or_else(mismatch)?,
            SettingKey::WrapLines => self.wraplines = value.as_bool().ok_or_else(mismatch)?,
        }
        Ok(())
    }
}
