//! Manifest and connection configuration
//!
//! A manifest holds the firewall connection plus any number of resource
//! groups. TOML and JSON are both accepted; the format follows the file
//! extension.
//!
//! ```toml
//! [connection]
//! base_url = "https://fw.example/api"
//! api_credential_file = "~/.config/opnsync/apikey.txt"
//!
//! [[group]]
//! kind = "alias"
//! state = "present"
//!
//! [group.defaults]
//! type = "host"
//!
//! [group.items.web_servers]
//! content = ["10.0.0.1", "10.0.0.2"]
//! ```

use anyhow::{Context, Result, bail};
use declarative::{BulkRequest, DesiredState, GroupOverrides, types::field_map_from_json};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::paths;

/// Environment variables consulted for connection settings
pub const ENV_URL: &str = "OPNSYNC_URL";
pub const ENV_API_KEY: &str = "OPNSYNC_API_KEY";
pub const ENV_API_SECRET: &str = "OPNSYNC_API_SECRET";

const DEFAULT_TIMEOUT_SECS: u64 = 20;

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default, rename = "group", alias = "groups")]
    pub groups: Vec<GroupConfig>,
}

/// Supported manifest formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Toml,
    Json,
}

impl ManifestFormat {
    /// Pick the format from the file extension (TOML unless `.json`)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

impl Manifest {
    /// Load a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content, ManifestFormat::from_path(path))
            .with_context(|| format!("Invalid manifest {}", path.display()))
    }

    /// Load a manifest if it exists, or an empty one
    ///
    /// Used by commands that only need connection settings.
    pub fn load_optional(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No manifest at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self> {
        let manifest: Self = match format {
            ManifestFormat::Toml => toml::from_str(content)?,
            ManifestFormat::Json => serde_json::from_str(content)?,
        };
        Ok(manifest)
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Connection settings as written in a manifest or given on the command line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    /// File in the firewall's `key=...` / `secret=...` download format
    #[serde(default)]
    pub api_credential_file: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub ssl_verify: Option<bool>,
}

/// Fully resolved connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout_secs: u64,
    pub ssl_verify: bool,
}

impl ConnectionConfig {
    /// Layer `overrides` on top of this config
    #[must_use]
    pub fn merged(self, overrides: Self) -> Self {
        Self {
            base_url: overrides.base_url.or(self.base_url),
            api_key: overrides.api_key.or(self.api_key),
            api_secret: overrides.api_secret.or(self.api_secret),
            api_credential_file: overrides.api_credential_file.or(self.api_credential_file),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            ssl_verify: overrides.ssl_verify.or(self.ssl_verify),
        }
    }

    /// Check that everything needed to connect is present
    pub fn resolve(self) -> Result<ConnectionSettings> {
        let (mut api_key, mut api_secret) = (self.api_key, self.api_secret);

        if (api_key.is_none() || api_secret.is_none())
            && let Some(file) = &self.api_credential_file
        {
            let path = paths::expand(file);
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Could not read credential file {}", path.display()))?;
            let (key, secret) = parse_credentials(&content);
            api_key = api_key.or(key);
            api_secret = api_secret.or(secret);
        }

        let Some(base_url) = self.base_url else {
            bail!("No firewall URL configured (set [connection].base_url or {ENV_URL})");
        };
        let Some(api_key) = api_key else {
            bail!("No API key configured (set [connection].api_key or {ENV_API_KEY})");
        };
        let Some(api_secret) = api_secret else {
            bail!("No API secret configured (set [connection].api_secret or {ENV_API_SECRET})");
        };

        Ok(ConnectionSettings {
            base_url,
            api_key,
            api_secret,
            timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ssl_verify: self.ssl_verify.unwrap_or(true),
        })
    }
}

/// Read `key=` and `secret=` lines
fn parse_credentials(content: &str) -> (Option<String>, Option<String>) {
    let mut key = None;
    let mut secret = None;

    for line in content.lines() {
        match line.trim().split_once('=') {
            Some(("key", value)) => key = Some(value.trim().to_string()),
            Some(("secret", value)) => secret = Some(value.trim().to_string()),
            _ => {}
        }
    }
    (key, secret)
}

// ============================================================================
// Groups
// ============================================================================

/// Named entries of one resource kind, reconciled in one bulk pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupConfig {
    pub kind: String,
    /// Forced onto every entry unless `unset`
    #[serde(default = "unset_state")]
    pub state: DesiredState,
    /// Forced onto every entry when set
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Abort on the first invalid entry instead of skipping it
    #[serde(default)]
    pub fail_verification: bool,
    #[serde(default = "default_true")]
    pub reload: bool,
    #[serde(default)]
    pub defaults: IndexMap<String, Value>,
    #[serde(default)]
    pub items: IndexMap<String, Option<IndexMap<String, Value>>>,
}

fn unset_state() -> DesiredState {
    DesiredState::Unset
}

fn default_true() -> bool {
    true
}

impl GroupConfig {
    /// Short label for output, e.g. "alias (3 entries)"
    pub fn label(&self) -> String {
        let count = self.items.len();
        format!(
            "{} ({} {})",
            self.kind,
            count,
            if count == 1 { "entry" } else { "entries" }
        )
    }

    /// Convert into a bulk request, keeping item order
    pub fn to_request(&self) -> BulkRequest {
        BulkRequest {
            items: self
                .items
                .iter()
                .map(|(name, fields)| {
                    let fields = fields.as_ref().map(field_map_from_json).unwrap_or_default();
                    (name.clone(), fields)
                })
                .collect(),
            defaults: field_map_from_json(&self.defaults),
            overrides: GroupOverrides::new(self.state, self.enabled),
            fail_verification: self.fail_verification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::FieldValue;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const TOML_MANIFEST: &str = r#"
[connection]
base_url = "https://fw.example/api"
api_key = "key"
api_secret = "secret"

[[group]]
kind = "alias"
state = "present"

[group.defaults]
type = "network"

[group.items.zeta]
content = ["10.0.0.0/24"]

[group.items.alpha]
content = "10.1.0.0/24"
enabled = false
"#;

    #[test]
    fn test_parse_toml_keeps_item_order() {
        let manifest = Manifest::parse(TOML_MANIFEST, ManifestFormat::Toml).unwrap();
        assert_eq!(manifest.groups.len(), 1);

        let group = &manifest.groups[0];
        assert_eq!(group.kind, "alias");
        assert!(group.reload);
        assert!(!group.fail_verification);
        let names: Vec<_> = group.items.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn test_to_request() {
        let manifest = Manifest::parse(TOML_MANIFEST, ManifestFormat::Toml).unwrap();
        let request = manifest.groups[0].to_request();

        assert_eq!(request.defaults["type"], FieldValue::text("network"));
        assert_eq!(request.items["alpha"]["enabled"], FieldValue::Bool(false));
        assert_eq!(
            request.items["zeta"]["content"],
            FieldValue::list(["10.0.0.0/24"])
        );
        assert_eq!(request.overrides.state, Some(DesiredState::Present));
        assert_eq!(request.overrides.enabled, None);
    }

    #[test]
    fn test_group_state_defaults_to_unset() {
        let json = r#"{"group": [{"kind": "unbound_dot", "items": {"example.com": null}}]}"#;
        let manifest = Manifest::parse(json, ManifestFormat::Json).unwrap();

        let group = &manifest.groups[0];
        assert_eq!(group.state, DesiredState::Unset);
        let request = group.to_request();
        assert!(request.overrides.state.is_none());
        assert!(request.items["example.com"].is_empty());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = Manifest::parse("[[group]]\nkind = \"alias\"\ncolour = 1\n", ManifestFormat::Toml);
        assert!(err.is_err());
    }

    #[test]
    fn test_load_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.json");
        fs::write(
            &path,
            r#"{"connection": {"base_url": "https://fw"}, "groups": []}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.connection.base_url.as_deref(), Some("https://fw"));

        let missing = Manifest::load_optional(&dir.path().join("none.toml")).unwrap();
        assert!(missing.groups.is_empty());
    }

    #[test]
    fn test_overrides_win_and_defaults_fill_in() {
        let file = ConnectionConfig {
            base_url: Some("https://file".into()),
            api_key: Some("file-key".into()),
            api_secret: Some("file-secret".into()),
            ..ConnectionConfig::default()
        };
        let overrides = ConnectionConfig {
            base_url: Some("https://env".into()),
            ..ConnectionConfig::default()
        };

        let settings = file.merged(overrides).resolve().unwrap();
        assert_eq!(settings.base_url, "https://env");
        assert_eq!(settings.api_key, "file-key");
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(settings.ssl_verify);
    }

    #[test]
    fn test_missing_secret_names_env_var() {
        let config = ConnectionConfig {
            base_url: Some("https://fw".into()),
            api_key: Some("key".into()),
            ..ConnectionConfig::default()
        };
        let err = config.resolve().unwrap_err().to_string();
        assert!(err.contains(ENV_API_SECRET));
    }

    #[test]
    fn test_credential_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "key=abc\nsecret=def").unwrap();

        let config = ConnectionConfig {
            base_url: Some("https://fw".into()),
            api_credential_file: Some(file.path().display().to_string()),
            ..ConnectionConfig::default()
        };
        let settings = config.resolve().unwrap();
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.api_secret, "def");
    }
}
