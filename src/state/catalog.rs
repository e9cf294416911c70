//! Read-only challenge catalog: categories, their challenges, and the flag material used by
//! the in-process verifier.

use std::collections::HashMap;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Identifier of a challenge, unique across the whole catalog.
pub type ChallengeId = String;

/// Lowest difficulty a challenge may declare.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty a challenge may declare; also the number of tiles per category.
pub const MAX_DIFFICULTY: u8 = 10;

/// Problems detected while assembling a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// A challenge has an empty identifier.
    #[error("challenge in category `{category}` has an empty id")]
    EmptyId {
        /// Category holding the offending challenge.
        category: String,
    },
    /// Two challenges share the same identifier.
    #[error("duplicate challenge id `{id}`")]
    DuplicateId {
        /// The repeated identifier.
        id: ChallengeId,
    },
    /// Two categories share the same key.
    #[error("duplicate category key `{key}`")]
    DuplicateCategory {
        /// The repeated key.
        key: String,
    },
    /// Difficulty outside of `MIN_DIFFICULTY..=MAX_DIFFICULTY`.
    #[error("challenge `{id}` has difficulty {difficulty}, expected 1..=10")]
    DifficultyOutOfRange {
        /// Offending challenge.
        id: ChallengeId,
        /// Declared difficulty.
        difficulty: i64,
    },
}

/// Secret answer material attached to a challenge. Never exposed through the public API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagMaterial {
    /// Plaintext flag compared against the trimmed candidate.
    Plain(String),
    /// Lowercase hex SHA-256 digest of the trimmed flag.
    Sha256(String),
    /// No flag configured; every candidate is rejected.
    Missing,
}

impl FlagMaterial {
    /// Check a candidate answer. Surrounding whitespace of the candidate is ignored.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        match self {
            FlagMaterial::Plain(flag) => flag == candidate,
            FlagMaterial::Sha256(digest) => {
                let actual = hex::encode(Sha256::digest(candidate.as_bytes()));
                actual.eq_ignore_ascii_case(digest)
            }
            FlagMaterial::Missing => false,
        }
    }
}

/// Downloadable material attached to a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name presented to the player.
    pub name: String,
    /// Remote location of the file, when hosted elsewhere.
    pub url: Option<String>,
    /// Inline base64 content, when shipped with the catalog.
    pub content_b64: Option<String>,
}

/// One challenge of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Unique identifier.
    pub id: ChallengeId,
    /// Key of the owning category.
    pub category_key: String,
    /// Difficulty tier in `1..=10`; drives points and allotted time.
    pub difficulty: u8,
    /// Display title.
    pub title: String,
    /// Statement shown once the challenge is open.
    pub description: String,
    /// Hint revealed by the oracle joker; may be empty.
    pub hint: String,
    /// Optional external resource.
    pub external_link: String,
    /// Attached files.
    pub files: Vec<Attachment>,
    /// Answer material used by the in-process verifier.
    pub flag: FlagMaterial,
}

/// Ordered column of the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Stable key (lowercase, underscores).
    pub key: String,
    /// Display label.
    pub label: String,
    /// Challenges sorted by difficulty; ties keep their declaration order.
    pub challenges: Vec<Challenge>,
}

/// Validated, indexed catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: IndexMap<String, Category>,
    index: HashMap<ChallengeId, (usize, usize)>,
}

impl Catalog {
    /// Build a catalog, sorting each category by difficulty and rejecting inconsistent input.
    pub fn new(categories: Vec<Category>) -> Result<Self, CatalogError> {
        let mut by_key = IndexMap::with_capacity(categories.len());
        let mut index = HashMap::new();

        for mut category in categories {
            if by_key.contains_key(&category.key) {
                return Err(CatalogError::DuplicateCategory { key: category.key });
            }

            category.challenges.sort_by_key(|challenge| challenge.difficulty);
            let category_slot = by_key.len();

            for (position, challenge) in category.challenges.iter_mut().enumerate() {
                if challenge.id.trim().is_empty() {
                    return Err(CatalogError::EmptyId {
                        category: category.key.clone(),
                    });
                }
                if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&challenge.difficulty) {
                    return Err(CatalogError::DifficultyOutOfRange {
                        id: challenge.id.clone(),
                        difficulty: challenge.difficulty.into(),
                    });
                }
                if index
                    .insert(challenge.id.clone(), (category_slot, position))
                    .is_some()
                {
                    return Err(CatalogError::DuplicateId {
                        id: challenge.id.clone(),
                    });
                }
                challenge.category_key = category.key.clone();
            }

            by_key.insert(category.key.clone(), category);
        }

        Ok(Self {
            categories: by_key,
            index,
        })
    }

    /// Iterate over categories in declaration order.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Total number of challenges, alternates included.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True when no challenge is defined at all.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Look a challenge up by id.
    pub fn challenge(&self, id: &str) -> Option<&Challenge> {
        let (category, position) = *self.index.get(id)?;
        self.categories
            .get_index(category)
            .and_then(|(_, category)| category.challenges.get(position))
    }

    /// Every challenge of the `(category, difficulty)` slot, in declaration order.
    pub fn slot<'a>(
        &'a self,
        category_key: &str,
        difficulty: u8,
    ) -> impl Iterator<Item = &'a Challenge> {
        self.categories
            .get(category_key)
            .into_iter()
            .flat_map(|category| category.challenges.iter())
            .filter(move |challenge| challenge.difficulty == difficulty)
    }

    /// Other challenges sharing the category and difficulty of `id`.
    pub fn alternates(&self, id: &str) -> Vec<&Challenge> {
        let Some(current) = self.challenge(id) else {
            return Vec::new();
        };
        self.categories
            .get(&current.category_key)
            .map(|category| {
                category
                    .challenges
                    .iter()
                    .filter(|candidate| {
                        candidate.difficulty == current.difficulty && candidate.id != current.id
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{catalog, challenge};
    use super::*;

    #[test]
    fn board_tile_is_first_challenge_of_a_difficulty() {
        let catalog = catalog();
        assert_eq!(catalog.slot("web", 3).next().map(|c| c.id.as_str()), Some("web-3a"));
        assert!(catalog.slot("crypto", 3).next().is_none());
        assert!(catalog.slot("unknown", 1).next().is_none());
    }

    #[test]
    fn alternates_share_category_and_difficulty() {
        let catalog = catalog();
        let ids: Vec<_> = catalog
            .alternates("web-3a")
            .into_iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["web-3b".to_string()]);
        assert!(catalog.alternates("crypto-2").is_empty());
    }

    #[test]
    fn category_key_is_stamped_on_challenges() {
        let catalog = catalog();
        assert_eq!(catalog.challenge("crypto-2").unwrap().category_key, "crypto");
        assert_eq!(catalog.len(), 5);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Catalog::new(vec![
            Category {
                key: "a".into(),
                label: "A".into(),
                challenges: vec![challenge("x", 1, "")],
            },
            Category {
                key: "b".into(),
                label: "B".into(),
                challenges: vec![challenge("x", 2, "")],
            },
        ])
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId { id: "x".into() });
    }

    #[test]
    fn slot_lists_every_alternate_in_order() {
        let catalog = catalog();
        let ids: Vec<_> = catalog.slot("web", 3).map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["web-3a", "web-3b"]);
        assert_eq!(catalog.slot("ghost", 3).count(), 0);
    }

    #[test]
    fn difficulty_must_be_in_range() {
        let err = Catalog::new(vec![Category {
            key: "a".into(),
            label: "A".into(),
            challenges: vec![challenge("x", 11, "")],
        }])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DifficultyOutOfRange { difficulty: 11, .. }));
    }

    #[test]
    fn flag_material_matching() {
        assert!(FlagMaterial::Plain("flag{a}".into()).matches("  flag{a}\n"));
        assert!(!FlagMaterial::Plain("flag{a}".into()).matches("flag{b}"));

        let digest = hex::encode(Sha256::digest(b"flag{a}"));
        assert!(FlagMaterial::Sha256(digest.to_uppercase()).matches("flag{a}"));
        assert!(!FlagMaterial::Sha256(digest).matches("flag{b}"));

        assert!(!FlagMaterial::Missing.matches(""));
    }
}
