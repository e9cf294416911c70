//! Loaders for the challenge catalog and the easter egg table.
//!
//! Two catalog layouts are accepted: `{ "categories": [...] }` or a flat array of challenges
//! carrying a `category` label, which is grouped by first appearance.

use std::{fs, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, serde_as};
use thiserror::Error;

use crate::state::{
    catalog::{Attachment, Catalog, CatalogError, Category, Challenge, FlagMaterial},
    easter_eggs::{DEFAULT_RESPONSE, EasterEgg, EasterEggTable},
};

/// Category used for flat challenges without a `category` field.
const FALLBACK_CATEGORY: &str = "Misc";

/// Failures while reading static content from disk.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The file could not be read.
    #[error("failed to read `{path}`")]
    Read {
        /// Offending file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON of the expected shape.
    #[error("failed to parse `{path}`")]
    Parse {
        /// Offending file.
        path: String,
        /// Underlying decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// The catalog content is inconsistent.
    #[error("invalid catalog `{path}`")]
    Invalid {
        /// Offending file.
        path: String,
        /// Validation failure.
        #[source]
        source: CatalogError,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCatalog {
    Shaped { categories: Vec<RawCategory> },
    Flat(Vec<RawChallenge>),
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    challenges: Vec<RawChallenge>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChallenge {
    id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    difficulty: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    external_link: Option<String>,
    #[serde(default)]
    files: Vec<RawAttachment>,
    #[serde(default)]
    flag: Option<String>,
    #[serde(default, alias = "flag_sha256")]
    flag_sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "contentB64")]
    content_b64: Option<String>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawEasterEgg {
    #[serde(default)]
    trigger: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    points: i64,
    #[serde(default)]
    response: Option<String>,
}

impl From<RawAttachment> for Attachment {
    fn from(value: RawAttachment) -> Self {
        Self {
            name: value.name,
            url: value.url,
            content_b64: value.content_b64,
        }
    }
}

impl RawChallenge {
    fn into_challenge(self) -> Result<Challenge, CatalogError> {
        let difficulty =
            u8::try_from(self.difficulty).map_err(|_| CatalogError::DifficultyOutOfRange {
                id: self.id.clone(),
                difficulty: self.difficulty,
            })?;
        let flag = match (self.flag, self.flag_sha256) {
            (_, Some(digest)) if !digest.trim().is_empty() => {
                FlagMaterial::Sha256(digest.trim().to_ascii_lowercase())
            }
            (Some(flag), _) => FlagMaterial::Plain(flag.trim().to_string()),
            _ => FlagMaterial::Missing,
        };

        Ok(Challenge {
            id: self.id.trim().to_string(),
            category_key: String::new(),
            difficulty,
            title: self.title,
            description: self.description,
            hint: self.hint.unwrap_or_default(),
            external_link: self.external_link.unwrap_or_default(),
            files: self.files.into_iter().map(Into::into).collect(),
            flag,
        })
    }
}

/// Derive a category key from its label: lowercase, whitespace runs replaced by `_`.
pub fn category_key(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

fn shape(raw: RawCatalog) -> Result<Catalog, CatalogError> {
    let categories = match raw {
        RawCatalog::Shaped { categories } => categories
            .into_iter()
            .map(|category| {
                let label = category
                    .label
                    .or(category.name)
                    .or_else(|| category.key.clone())
                    .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());
                let key = category
                    .key
                    .filter(|key| !key.trim().is_empty())
                    .unwrap_or_else(|| category_key(&label));
                let challenges = category
                    .challenges
                    .into_iter()
                    .map(RawChallenge::into_challenge)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Category {
                    key,
                    label,
                    challenges,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?,
        RawCatalog::Flat(challenges) => {
            let mut grouped: IndexMap<String, Vec<Challenge>> = IndexMap::new();
            for raw in challenges {
                let label = raw
                    .category
                    .clone()
                    .filter(|label| !label.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());
                grouped
                    .entry(label)
                    .or_default()
                    .push(raw.into_challenge()?);
            }
            grouped
                .into_iter()
                .map(|(label, challenges)| Category {
                    key: category_key(&label),
                    label,
                    challenges,
                })
                .collect()
        }
    };
    Catalog::new(categories)
}

/// Parse a catalog document.
pub fn parse_catalog(contents: &str, origin: &str) -> Result<Catalog, ContentError> {
    let raw = serde_json::from_str::<RawCatalog>(contents).map_err(|source| ContentError::Parse {
        path: origin.to_string(),
        source,
    })?;
    shape(raw).map_err(|source| ContentError::Invalid {
        path: origin.to_string(),
        source,
    })
}

/// Read and validate the catalog at `path`. The file is mandatory.
pub fn load_catalog(path: &Path) -> Result<Catalog, ContentError> {
    let origin = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ContentError::Read {
        path: origin.clone(),
        source,
    })?;
    parse_catalog(&contents, &origin)
}

/// Parse an easter egg document.
pub fn parse_easter_eggs(contents: &str, origin: &str) -> Result<EasterEggTable, ContentError> {
    let raw = serde_json::from_str::<Vec<RawEasterEgg>>(contents).map_err(|source| {
        ContentError::Parse {
            path: origin.to_string(),
            source,
        }
    })?;
    let eggs = raw
        .into_iter()
        .filter_map(|egg| {
            Some(EasterEgg {
                trigger: egg.trigger?,
                reward: egg.points,
                response: egg
                    .response
                    .filter(|response| !response.is_empty())
                    .unwrap_or_else(|| DEFAULT_RESPONSE.to_string()),
            })
        })
        .collect();
    Ok(EasterEggTable::new(eggs))
}

/// Read the easter egg table at `path`; a missing file yields an empty table.
pub fn load_easter_eggs(path: &Path) -> Result<EasterEggTable, ContentError> {
    let origin = path.display().to_string();
    match fs::read_to_string(path) {
        Ok(contents) => parse_easter_eggs(&contents, &origin),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(EasterEggTable::default()),
        Err(source) => Err(ContentError::Read {
            path: origin,
            source,
        }),
    }
}
