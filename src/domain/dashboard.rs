// Dashboard domain model
use super::card::Card;
use super::parameter::{Parameter, ParameterValues};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedType {
    Public,
    Signed,
    Interactive,
    Sdk,
}

impl EmbedType {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedType::Public => "public",
            EmbedType::Signed => "signed",
            EmbedType::Interactive => "interactive",
            EmbedType::Sdk => "sdk",
        }
    }
}

impl fmt::Display for EmbedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(EmbedType::Public),
            "signed" => Ok(EmbedType::Signed),
            "interactive" => Ok(EmbedType::Interactive),
            "sdk" => Ok(EmbedType::Sdk),
            other => Err(format!("unknown embed type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedTheme {
    Light,
    Dark,
    Night,
    Transparent,
}

impl EmbedTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedTheme::Light => "light",
            EmbedTheme::Dark => "dark",
            EmbedTheme::Night => "night",
            EmbedTheme::Transparent => "transparent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "light" => Some(EmbedTheme::Light),
            "dark" => Some(EmbedTheme::Dark),
            "night" => Some(EmbedTheme::Night),
            "transparent" => Some(EmbedTheme::Transparent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardTheme {
    Light,
    Dark,
    Custom,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedConfig {
    #[serde(default = "default_true")]
    pub bordered: bool,
    #[serde(default = "default_true")]
    pub titled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<EmbedTheme>,
    #[serde(default)]
    pub hide_parameters: bool,
    /// Host-fixed values; always win and are never user-editable.
    #[serde(default)]
    pub locked_parameters: ParameterValues,
    #[serde(default)]
    pub hidden_parameters: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default = "default_true")]
    pub download_buttons: bool,
    #[serde(default = "default_true")]
    pub fullscreen: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            bordered: true,
            titled: true,
            theme: None,
            hide_parameters: false,
            locked_parameters: ParameterValues::new(),
            hidden_parameters: BTreeSet::new(),
            font: None,
            background: None,
            download_buttons: true,
            fullscreen: true,
        }
    }
}

impl EmbedConfig {
    pub fn is_locked(&self, parameter_id: &str) -> bool {
        self.locked_parameters.contains_key(parameter_id)
    }

    pub fn is_hidden(&self, parameter_id: &str) -> bool {
        self.hidden_parameters.contains(parameter_id)
    }

    /// Overlay a partial config (e.g. decoded from a URL) onto this one.
    pub fn merged(&self, patch: &EmbedConfigPatch) -> EmbedConfig {
        let mut merged = self.clone();
        if let Some(bordered) = patch.bordered {
            merged.bordered = bordered;
        }
        if let Some(titled) = patch.titled {
            merged.titled = titled;
        }
        if let Some(theme) = patch.theme {
            merged.theme = Some(theme);
        }
        if let Some(hide) = patch.hide_parameters {
            merged.hide_parameters = hide;
        }
        if let Some(locked) = &patch.locked_parameters {
            merged.locked_parameters = locked.clone();
        }
        if let Some(hidden) = &patch.hidden_parameters {
            merged.hidden_parameters = hidden.clone();
        }
        if let Some(font) = &patch.font {
            merged.font = Some(font.clone());
        }
        if let Some(background) = &patch.background {
            merged.background = Some(background.clone());
        }
        if let Some(download) = patch.download_buttons {
            merged.download_buttons = download;
        }
        if let Some(fullscreen) = patch.fullscreen {
            merged.fullscreen = fullscreen;
        }
        merged
    }
}

/// Partial embed configuration; `None` fields leave the base untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bordered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<EmbedTheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_parameters: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_parameters: Option<ParameterValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_parameters: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_buttons: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullscreen: Option<bool>,
}

impl EmbedConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == EmbedConfigPatch::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLayoutConfig {
    pub cols: u32,
    pub row_height: u32,
    pub margin: [u32; 2],
    pub container_padding: [u32; 2],
}

impl Default for GridLayoutConfig {
    fn default() -> Self {
        Self {
            cols: 18,
            row_height: 60,
            margin: [16, 16],
            container_padding: [16, 16],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardTab {
    pub id: String,
    pub name: String,
    pub order: u32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub theme: DashboardTheme,
    pub embed_type: EmbedType,
    #[serde(default)]
    pub embed_config: EmbedConfig,
    #[serde(default)]
    pub tabs: Vec<DashboardTab>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub layout: GridLayoutConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dashboard {
    pub fn parameter(&self, id: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.id == id)
    }

    pub fn tab(&self, id: &str) -> Option<&DashboardTab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    /// Tabs sorted by their ordering index.
    pub fn ordered_tabs(&self) -> Vec<&DashboardTab> {
        let mut tabs: Vec<&DashboardTab> = self.tabs.iter().collect();
        tabs.sort_by_key(|t| t.order);
        tabs
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.tabs.iter().flat_map(|t| t.cards.iter()).find(|c| c.id == id)
    }
}
