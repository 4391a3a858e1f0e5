use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::key::KeyMatch;

/// How a donor's children are carried over to the survivor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Every donor child is appended; repeated tags accumulate.
    #[default]
    #[serde(rename = "merge-append-all")]
    AppendAll,
    /// A donor child is appended only if the survivor has no direct child
    /// with the same tag yet; otherwise it is dropped.
    #[serde(rename = "merge-first-wins")]
    FirstWins,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppendAll => "merge-append-all",
            Self::FirstWins => "merge-first-wins",
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge-append-all" | "append-all" => Ok(Self::AppendAll),
            "merge-first-wins" | "first-wins" => Ok(Self::FirstWins),
            other => Err(format!(
                "unknown merge policy '{other}' (expected merge-append-all or merge-first-wins)"
            )),
        }
    }
}

/// Parameters of a targeted merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    /// The tag whose sibling occurrences are grouped.
    pub tag: String,
    /// Child tag whose text is the key. `None` selects the heuristic: the
    /// first child with non-blank text.
    pub key_field: Option<String>,
    /// When set, only donor children with these tags are migrated.
    pub allowed_child_tags: Option<BTreeSet<String>>,
    pub policy: MergePolicy,
    pub key_match: KeyMatch,
}

impl MergeOptions {
    /// Append-all merge of `tag` with heuristic keys and no child filter.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            key_field: None,
            allowed_child_tags: None,
            policy: MergePolicy::AppendAll,
            key_match: KeyMatch::Exact,
        }
    }

    pub fn with_key_field(mut self, field: impl Into<String>) -> Self {
        self.key_field = Some(field.into());
        self
    }

    pub fn with_allowed_child_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_child_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_policy(mut self, policy: MergePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_key_match(mut self, key_match: KeyMatch) -> Self {
        self.key_match = key_match;
        self
    }
}

/// Parameters of the whole-document merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericMergeOptions {
    pub policy: MergePolicy,
    pub key_match: KeyMatch,
}

impl Default for GenericMergeOptions {
    fn default() -> Self {
        Self {
            policy: MergePolicy::FirstWins,
            key_match: KeyMatch::Exact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_names_are_stable() {
        assert_eq!(MergePolicy::AppendAll.to_string(), "merge-append-all");
        assert_eq!(MergePolicy::FirstWins.to_string(), "merge-first-wins");
        assert_eq!(
            serde_json::to_string(&MergePolicy::FirstWins).unwrap(),
            "\"merge-first-wins\""
        );
    }

    #[test]
    fn policy_parses_full_and_short_names() {
        assert_eq!("merge-append-all".parse::<MergePolicy>().unwrap(), MergePolicy::AppendAll);
        assert_eq!("first-wins".parse::<MergePolicy>().unwrap(), MergePolicy::FirstWins);
        assert!("last-wins".parse::<MergePolicy>().is_err());
    }

    #[test]
    fn builder_sets_fields() {
        let options = MergeOptions::new("Employee")
            .with_key_field("XRefCode")
            .with_allowed_child_tags(["Job"])
            .with_policy(MergePolicy::FirstWins)
            .with_key_match(KeyMatch::Numeric);

        assert_eq!(options.tag, "Employee");
        assert_eq!(options.key_field.as_deref(), Some("XRefCode"));
        assert!(options.allowed_child_tags.unwrap().contains("Job"));
        assert_eq!(options.policy, MergePolicy::FirstWins);
        assert_eq!(options.key_match, KeyMatch::Numeric);
    }

    #[test]
    fn generic_defaults_to_first_wins() {
        assert_eq!(GenericMergeOptions::default().policy, MergePolicy::FirstWins);
    }
}
