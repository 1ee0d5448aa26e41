//! Declarative configuration sets and the generated application config.
//!
//! A configuration set is a directory of TOML documents, one airspace
//! per document, applied in lexical order. The generated application
//! config is a derived JSON artifact for frontend/client tooling; it is
//! regenerated from the set plus the bootstrap authority and never read
//! back as a source of truth.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use airlift_core::keypair::{derive_address, Pubkey};
use airlift_chain::client::ConfigEntry;

/// A token to be configured inside an airspace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenDoc {
    /// The symbol for the token.
    pub symbol: String,
    /// The display name for the token.
    pub name: String,
    /// The number of decimals the token should have.
    pub decimals: u8,
    /// The oracle price feed for the token, if it has one.
    #[serde(default)]
    pub feed: Option<String>,
}

/// One declarative configuration document: an airspace and its tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AirspaceDoc {
    /// The name for the airspace.
    pub name: String,
    /// If true, user registration with the airspace is restricted.
    #[serde(default)]
    pub is_restricted: bool,
    /// The tokens to be configured for use in the airspace.
    #[serde(default)]
    pub tokens: Vec<TokenDoc>,
}

/// Errors reading a configuration set or writing derived artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed while trying I/O on {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("failed while parsing toml in {path}: {error}")]
    Toml {
        path: PathBuf,
        error: toml::de::Error,
    },

    #[error("no configuration documents found in {0}")]
    Empty(PathBuf),

    #[error("airspace '{name}' defined twice (second definition in {path})")]
    DuplicateAirspace { name: String, path: PathBuf },
}

/// An ordered, parsed configuration set.
#[derive(Debug, Clone)]
pub struct ConfigSet {
    documents: Vec<(PathBuf, AirspaceDoc)>,
}

impl ConfigSet {
    /// Load every `*.toml` document under `dir`, in lexical order.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let entries = fs::read_dir(dir).map_err(|error| ConfigError::Io {
            path: dir.to_path_buf(),
            error,
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(ConfigError::Empty(dir.to_path_buf()));
        }

        let mut seen = BTreeSet::new();
        let mut documents = Vec::with_capacity(paths.len());

        for path in paths {
            let text = fs::read_to_string(&path).map_err(|error| ConfigError::Io {
                path: path.clone(),
                error,
            })?;
            let doc: AirspaceDoc = toml::from_str(&text).map_err(|error| ConfigError::Toml {
                path: path.clone(),
                error,
            })?;

            if !seen.insert(doc.name.clone()) {
                return Err(ConfigError::DuplicateAirspace {
                    name: doc.name,
                    path,
                });
            }
            documents.push((path, doc));
        }

        Ok(Self { documents })
    }

    /// The parsed documents with their source paths, in apply order.
    pub fn documents(&self) -> &[(PathBuf, AirspaceDoc)] {
        &self.documents
    }

    pub fn airspace(&self, name: &str) -> Option<&AirspaceDoc> {
        self.documents
            .iter()
            .map(|(_, doc)| doc)
            .find(|doc| doc.name == name)
    }

    /// The lookup-table address set for a named airspace: the mint and
    /// margin-pool addresses of every configured token. Deterministic,
    /// so repeated updates resolve the same set.
    pub fn lookup_addresses(&self, airspace: &str) -> Option<BTreeSet<String>> {
        let doc = self.airspace(airspace)?;
        let mut tables = BTreeSet::new();
        for token in &doc.tokens {
            tables.insert(token_mint(&token.symbol).as_str().to_string());
            tables.insert(
                derive_address(&["margin-pool", airspace, &token.symbol])
                    .as_str()
                    .to_string(),
            );
        }
        Some(tables)
    }
}

/// The deterministic mint address for a token symbol.
pub fn token_mint(symbol: &str) -> Pubkey {
    derive_address(&["token-mint", symbol])
}

/// The on-chain entries described by one airspace document.
///
/// Keys are stable across runs, so re-applying an unchanged document
/// converges to [`ApplyOutcome::Unchanged`](airlift_chain::client::ApplyOutcome)
/// for every entry.
pub fn entries_for(doc: &AirspaceDoc) -> Vec<ConfigEntry> {
    let mut entries = vec![ConfigEntry {
        key: format!("airspace/{}", doc.name),
        value: serde_json::json!({ "isRestricted": doc.is_restricted }),
    }];

    for token in &doc.tokens {
        entries.push(ConfigEntry {
            key: format!("airspace/{}/token/{}", doc.name, token.symbol),
            value: serde_json::json!({
                "name": token.name,
                "decimals": token.decimals,
                "feed": token.feed,
                "mint": token_mint(&token.symbol).as_str(),
            }),
        });
    }

    entries
}

// ---------------------------------------------------------------------------
// Generated application config
// ---------------------------------------------------------------------------

/// Token entry in the generated application config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppToken {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub mint: String,
}

/// Airspace entry in the generated application config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppAirspace {
    pub name: String,
    pub is_restricted: bool,
    /// Overridden with the bootstrap authority: the declarative set
    /// cannot know it statically, since it is generated at run time.
    pub lookup_registry_authority: String,
}

/// The derived application config artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub tokens: Vec<AppToken>,
    pub airspaces: Vec<AppAirspace>,
}

impl AppConfig {
    /// Build the artifact from a configuration set, substituting
    /// `lookup_authority` into every airspace. Tokens are deduplicated
    /// by symbol; both lists come out sorted.
    pub fn from_config_set(set: &ConfigSet, lookup_authority: &Pubkey) -> Self {
        let mut tokens: BTreeMap<String, AppToken> = BTreeMap::new();
        let mut airspaces = Vec::new();

        for (_, doc) in set.documents() {
            for token in &doc.tokens {
                tokens.entry(token.symbol.clone()).or_insert_with(|| AppToken {
                    symbol: token.symbol.clone(),
                    name: token.name.clone(),
                    decimals: token.decimals,
                    mint: token_mint(&token.symbol).as_str().to_string(),
                });
            }
            airspaces.push(AppAirspace {
                name: doc.name.clone(),
                is_restricted: doc.is_restricted,
                lookup_registry_authority: lookup_authority.as_str().to_string(),
            });
        }

        airspaces.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            tokens: tokens.into_values().collect(),
            airspaces,
        }
    }

    /// Write the artifact as pretty-printed JSON.
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).expect("app config serializes");
        fs::write(path, json).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use airlift_core::keypair::Keypair;

    fn write_doc(dir: &Path, file: &str, contents: &str) {
        fs::write(dir.join(file), contents).unwrap();
    }

    const DEFAULT_DOC: &str = r#"
name = "default"
is_restricted = false

[[tokens]]
symbol = "USDC"
name = "USD Coin"
decimals = 6
feed = "USDC"

[[tokens]]
symbol = "SOL"
name = "Solana"
decimals = 9
feed = "SOL"
"#;

    #[test]
    fn load_parses_documents_in_lexical_order() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "20-other.toml", "name = \"other\"\n");
        write_doc(dir.path(), "10-default.toml", DEFAULT_DOC);

        let set = ConfigSet::load(dir.path()).unwrap();
        let names: Vec<&str> = set
            .documents()
            .iter()
            .map(|(_, doc)| doc.name.as_str())
            .collect();
        assert_eq!(names, vec!["default", "other"]);
    }

    #[test]
    fn load_ignores_non_toml_files() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "airspace.toml", DEFAULT_DOC);
        write_doc(dir.path(), "README.md", "# not config");

        let set = ConfigSet::load(dir.path()).unwrap();
        assert_eq!(set.documents().len(), 1);
    }

    #[test]
    fn load_empty_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigSet::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Empty(_)));
    }

    #[test]
    fn malformed_document_names_the_offending_path() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "bad.toml", "name = [broken");

        let err = ConfigSet::load(dir.path()).unwrap_err();
        match err {
            ConfigError::Toml { path, .. } => assert!(path.ends_with("bad.toml")),
            other => panic!("expected Toml error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_airspace_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "a.toml", "name = \"default\"\n");
        write_doc(dir.path(), "b.toml", "name = \"default\"\n");

        let err = ConfigSet::load(dir.path()).unwrap_err();
        match err {
            ConfigError::DuplicateAirspace { name, path } => {
                assert_eq!(name, "default");
                assert!(path.ends_with("b.toml"));
            }
            other => panic!("expected DuplicateAirspace, got {other:?}"),
        }
    }

    #[test]
    fn entries_have_stable_keys() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "default.toml", DEFAULT_DOC);
        let set = ConfigSet::load(dir.path()).unwrap();

        let doc = &set.documents()[0].1;
        let first = entries_for(doc);
        let second = entries_for(doc);
        assert_eq!(first, second);
        assert_eq!(first[0].key, "airspace/default");
        assert_eq!(first[1].key, "airspace/default/token/USDC");
    }

    #[test]
    fn lookup_addresses_cover_mints_and_pools() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "default.toml", DEFAULT_DOC);
        let set = ConfigSet::load(dir.path()).unwrap();

        let tables = set.lookup_addresses("default").unwrap();
        // One mint plus one pool per token.
        assert_eq!(tables.len(), 4);
        assert!(tables.contains(token_mint("USDC").as_str()));
    }

    #[test]
    fn lookup_addresses_unknown_airspace_is_none() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "default.toml", DEFAULT_DOC);
        let set = ConfigSet::load(dir.path()).unwrap();

        assert!(set.lookup_addresses("nope").is_none());
    }

    #[test]
    fn app_config_substitutes_authority_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "b.toml", DEFAULT_DOC);
        write_doc(dir.path(), "a.toml", "name = \"alpha\"\nis_restricted = true\n");
        let set = ConfigSet::load(dir.path()).unwrap();

        let authority = Keypair::from_seed([3u8; 32]).pubkey();
        let app = AppConfig::from_config_set(&set, &authority);

        let names: Vec<&str> = app.airspaces.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "default"]);
        for airspace in &app.airspaces {
            assert_eq!(airspace.lookup_registry_authority, authority.as_str());
        }

        let symbols: Vec<&str> = app.tokens.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SOL", "USDC"]);
    }

    #[test]
    fn app_config_dedupes_tokens_across_airspaces() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "a.toml", DEFAULT_DOC);
        write_doc(
            dir.path(),
            "b.toml",
            r#"
name = "second"

[[tokens]]
symbol = "USDC"
name = "USD Coin"
decimals = 6
"#,
        );
        let set = ConfigSet::load(dir.path()).unwrap();

        let authority = Keypair::from_seed([3u8; 32]).pubkey();
        let app = AppConfig::from_config_set(&set, &authority);
        assert_eq!(app.tokens.len(), 2);
    }

    #[test]
    fn app_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        write_doc(dir.path(), "default.toml", DEFAULT_DOC);
        let set = ConfigSet::load(dir.path()).unwrap();

        let authority = Keypair::from_seed([3u8; 32]).pubkey();
        let app = AppConfig::from_config_set(&set, &authority);

        let out = dir.path().join("app.config.json");
        app.write_to_file(&out).unwrap();

        let restored: AppConfig =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(restored, app);
    }
}
