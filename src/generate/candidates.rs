//! Candidate model list assembly.

/// Fixed fallback models, in priority order. Tried after the configured
/// primary model, if any.
const FALLBACK_MODELS: [&str; 5] = [
    "gemini-3.1-pro-preview",
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-pro-latest",
    "gemini-flash-latest",
];

/// Ordered, de-duplicated list of backend model candidates.
///
/// Order is preference; de-duplication keeps the first occurrence. Model
/// names are normalized by stripping the `models/` resource prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    models: Vec<String>,
}

impl CandidateList {
    /// Build a list from raw model names, normalizing and de-duplicating.
    pub fn new<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut models: Vec<String> = Vec::new();
        for name in raw {
            let name = Self::normalize(name.as_ref());
            if name.is_empty() {
                continue;
            }
            if !models.contains(&name) {
                models.push(name);
            }
        }

        Self {
            models,
        }
    }

    /// Assemble the effective list for a session: the configured primary
    /// model first, then the fixed fallback models.
    pub fn assemble(primary: Option<&str>) -> Self {
        Self::new(primary.into_iter().chain(FALLBACK_MODELS))
    }

    fn normalize(raw: &str) -> String {
        let trimmed = raw.trim();
        trimmed.strip_prefix("models/").unwrap_or(trimmed).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.models.iter().map(|m| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplication_keeps_first_occurrence() {
        let list = CandidateList::new(["model-x", "model-x", "model-y"]);
        let models: Vec<&str> = list.iter().collect();
        assert_eq!(models, vec!["model-x", "model-y"]);
    }

    #[test]
    fn test_resource_prefix_is_normalized() {
        let list = CandidateList::new(["models/gemini-2.5-pro", "gemini-2.5-pro"]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next(), Some("gemini-2.5-pro"));
    }

    #[test]
    fn test_assemble_puts_primary_first() {
        let list = CandidateList::assemble(Some("models/gemini-2.5-flash"));
        let models: Vec<&str> = list.iter().collect();
        assert_eq!(models[0], "gemini-2.5-flash");
        // the duplicate fallback entry collapsed into the primary slot
        assert_eq!(models.len(), FALLBACK_MODELS.len());
    }

    #[test]
    fn test_assemble_without_primary() {
        let list = CandidateList::assemble(None);
        let models: Vec<&str> = list.iter().collect();
        assert_eq!(models, FALLBACK_MODELS.to_vec());
    }

    #[test]
    fn test_blank_entries_are_dropped() {
        let list = CandidateList::new(["", "  ", "gemini-pro-latest"]);
        assert_eq!(list.len(), 1);
    }
}
