use std::path::{Path, PathBuf};

use folio_store::DEFAULT_DOCUMENT_NAME;
use folio_types::Value;
use serde::{Deserialize, Serialize};

use crate::error::{EntriesError, EntriesResult};

/// Default `date_format`: `2024-01-31 18:30:00`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Repository configuration.
///
/// Every key is optional in TOML; missing keys take the defaults below.
///
/// ```toml
/// root = "project/entries"
/// date_format = "%Y-%m-%d %H:%M:%S"
///
/// [cache]
/// enabled = true
/// directory = "project/cache"
///
/// [fields.slug]
/// enabled = true
///
/// [fields.created_by]
/// default = "admin"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory holding all entries.
    pub root: PathBuf,
    /// File name of the document inside each entry directory.
    pub document_name: String,
    /// `strftime`-style pattern used to write and normalize dates.
    pub date_format: String,
    pub cache: CacheSettings,
    pub fields: FieldSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("entries"),
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            cache: CacheSettings::default(),
            fields: FieldSettings::default(),
        }
    }
}

impl Settings {
    /// Defaults rooted at `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(text: &str) -> EntriesResult<Self> {
        toml::from_str(text).map_err(|e| EntriesError::Config(e.to_string()))
    }

    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> EntriesResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EntriesError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> EntriesResult<String> {
        toml::to_string(self).map_err(|e| EntriesError::Config(e.to_string()))
    }
}

/// `[cache]` section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub enabled: bool,
    /// On-disk cache directory. Without one the cache lives in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

/// On/off switch for a computed field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldToggle {
    pub enabled: bool,
}

impl Default for FieldToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Switch plus a configured fallback value.
///
/// When `default` is omitted the hook's built-in fallback applies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultedField {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl DefaultedField {
    pub fn with_default(default: impl Into<Value>) -> Self {
        Self {
            enabled: true,
            default: Some(default.into()),
        }
    }

    /// The configured default, or `fallback`.
    pub fn default_or(&self, fallback: Value) -> Value {
        self.default.clone().unwrap_or(fallback)
    }
}

impl Default for DefaultedField {
    fn default() -> Self {
        Self {
            enabled: true,
            default: None,
        }
    }
}

/// `[fields.*]` sections, one per built-in field hook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldSettings {
    pub id: FieldToggle,
    pub slug: FieldToggle,
    pub modified_at: FieldToggle,
    pub published_at: FieldToggle,
    pub published_by: DefaultedField,
    pub created_at: FieldToggle,
    pub created_by: DefaultedField,
    pub uuid: FieldToggle,
    pub visibility: DefaultedField,
    pub routable: DefaultedField,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            id: FieldToggle::default(),
            slug: FieldToggle::default(),
            modified_at: FieldToggle::default(),
            published_at: FieldToggle::default(),
            published_by: DefaultedField::with_default(""),
            created_at: FieldToggle::default(),
            created_by: DefaultedField::with_default(""),
            uuid: FieldToggle::default(),
            visibility: DefaultedField::with_default("visible"),
            routable: DefaultedField::with_default(true),
        }
    }
}
