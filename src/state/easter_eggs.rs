/// Message returned when an incantation matches nothing.
pub const MISS_MESSAGE: &str = "Nothing happens…";
/// Message returned when a matching egg has no response text.
pub const DEFAULT_RESPONSE: &str = "✨";

/// Secret phrase granting (or taking) points outside of the challenge board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EasterEgg {
    /// Phrase to type, compared trimmed and case-insensitively.
    pub trigger: String,
    /// Signed score adjustment.
    pub reward: i64,
    /// Message shown on a hit.
    pub response: String,
}

/// Lookup table of easter eggs.
#[derive(Debug, Clone, Default)]
pub struct EasterEggTable {
    eggs: Vec<EasterEgg>,
}

impl EasterEggTable {
    /// Build the table, dropping entries whose trigger is blank.
    pub fn new(eggs: Vec<EasterEgg>) -> Self {
        let eggs = eggs
            .into_iter()
            .filter(|egg| !egg.trigger.trim().is_empty())
            .collect();
        Self { eggs }
    }

    /// Number of usable eggs.
    pub fn len(&self) -> usize {
        self.eggs.len()
    }

    /// True when no egg is configured.
    pub fn is_empty(&self) -> bool {
        self.eggs.is_empty()
    }

    /// Find the egg triggered by `text`.
    pub fn lookup(&self, text: &str) -> Option<&EasterEgg> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.eggs
            .iter()
            .find(|egg| egg.trigger.trim().to_lowercase() == needle)
    }
}
