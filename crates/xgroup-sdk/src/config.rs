use std::path::Path;

use serde::{Deserialize, Serialize};

use xgroup_merge::{GenericMergeOptions, KeyMatch, MergeOptions, MergePolicy};
use xgroup_tree::WriteOptions;

use crate::error::{SdkError, SdkResult};

const MAX_INDENT: usize = 16;

/// What to merge and how to write the result.
///
/// Without a `tag` the whole-document merge runs: every repeating tag,
/// heuristic keys, no child filter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegroupConfig {
    /// Tag whose sibling occurrences are merged.
    pub tag: Option<String>,
    /// Child tag holding the grouping key; heuristic when absent.
    pub key_field: Option<String>,
    /// Donor child tags carried over to the survivor; all when absent.
    pub allowed_child_tags: Option<Vec<String>>,
    /// Defaults to `merge-append-all` for a targeted merge and
    /// `merge-first-wins` for the whole-document merge.
    pub policy: Option<MergePolicy>,
    pub key_match: KeyMatch,
    /// Remove elements left without text or children after merging.
    pub prune_empty: bool,
    pub output: OutputConfig,
}

/// Serialization settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub pretty: bool,
    pub indent: usize,
    pub declaration: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 2,
            declaration: true,
        }
    }
}

impl Default for RegroupConfig {
    fn default() -> Self {
        Self {
            tag: None,
            key_field: None,
            allowed_child_tags: None,
            policy: None,
            key_match: KeyMatch::Exact,
            prune_empty: false,
            output: OutputConfig::default(),
        }
    }
}

impl RegroupConfig {
    /// A targeted merge of `tag` with the default policy.
    pub fn for_tag(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    /// Fixed-schema employee import: `Employee` records keyed by
    /// `XRefCode`, with every `Job` of every fragment collected under the
    /// first fragment.
    pub fn employee_import() -> Self {
        Self {
            tag: Some("Employee".into()),
            key_field: Some("XRefCode".into()),
            allowed_child_tags: Some(vec!["Job".into()]),
            policy: Some(MergePolicy::AppendAll),
            ..Default::default()
        }
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "employee-import" => Some(Self::employee_import()),
            _ => None,
        }
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Reject settings that cannot describe a merge.
    pub fn validate(&self) -> SdkResult<()> {
        if let Some(tag) = &self.tag {
            if tag.trim().is_empty() {
                return Err(SdkError::Config("tag must not be empty".into()));
            }
        }
        if let Some(field) = &self.key_field {
            if self.tag.is_none() {
                return Err(SdkError::Config("key_field requires a tag".into()));
            }
            if field.trim().is_empty() {
                return Err(SdkError::Config("key_field must not be empty".into()));
            }
        }
        if let Some(allowed) = &self.allowed_child_tags {
            if self.tag.is_none() {
                return Err(SdkError::Config("allowed_child_tags requires a tag".into()));
            }
            if allowed.iter().any(|t| t.trim().is_empty()) {
                return Err(SdkError::Config(
                    "allowed_child_tags must not contain empty tags".into(),
                ));
            }
        }
        if self.output.indent > MAX_INDENT {
            return Err(SdkError::Config(format!(
                "indent must be at most {MAX_INDENT}, got {}",
                self.output.indent
            )));
        }
        Ok(())
    }

    /// The policy in effect, after applying the mode-specific default.
    pub fn effective_policy(&self) -> MergePolicy {
        match (self.policy, &self.tag) {
            (Some(policy), _) => policy,
            (None, Some(_)) => MergePolicy::AppendAll,
            (None, None) => MergePolicy::FirstWins,
        }
    }

    /// Targeted merge options, or `None` in whole-document mode.
    pub fn merge_options(&self) -> Option<MergeOptions> {
        let tag = self.tag.as_ref()?;
        let mut options = MergeOptions::new(tag.clone())
            .with_policy(self.effective_policy())
            .with_key_match(self.key_match);
        if let Some(field) = &self.key_field {
            options = options.with_key_field(field.clone());
        }
        if let Some(allowed) = &self.allowed_child_tags {
            options = options.with_allowed_child_tags(allowed.iter().cloned());
        }
        Some(options)
    }

    pub fn generic_options(&self) -> GenericMergeOptions {
        GenericMergeOptions {
            policy: self.effective_policy(),
            key_match: self.key_match,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            pretty: self.output.pretty,
            indent: self.output.indent,
            declaration: self.output.declaration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_is_whole_document_first_wins() {
        let c = RegroupConfig::default();
        assert!(c.tag.is_none());
        assert!(c.merge_options().is_none());
        assert_eq!(c.effective_policy(), MergePolicy::FirstWins);
        assert!(c.output.pretty);
        assert!(c.output.declaration);
        assert_eq!(c.output.indent, 2);
    }

    #[test]
    fn targeted_defaults_to_append_all() {
        let c = RegroupConfig::for_tag("Employee");
        assert_eq!(c.effective_policy(), MergePolicy::AppendAll);
        let options = c.merge_options().unwrap();
        assert_eq!(options.tag, "Employee");
        assert!(options.key_field.is_none());
    }

    #[test]
    fn parses_full_toml() {
        let c = RegroupConfig::from_toml_str(
            r#"
            tag = "Employee"
            key_field = "XRefCode"
            allowed_child_tags = ["Job", "Note"]
            policy = "merge-first-wins"
            key_match = "case-insensitive"
            prune_empty = true

            [output]
            pretty = false
            declaration = false
            "#,
        )
        .unwrap();

        assert_eq!(c.tag.as_deref(), Some("Employee"));
        assert_eq!(c.policy, Some(MergePolicy::FirstWins));
        assert_eq!(c.key_match, KeyMatch::CaseInsensitive);
        assert!(c.prune_empty);
        assert!(!c.output.pretty);
        assert_eq!(c.output.indent, 2);

        let options = c.merge_options().unwrap();
        assert_eq!(options.key_field.as_deref(), Some("XRefCode"));
        let allowed = options.allowed_child_tags.unwrap();
        assert!(allowed.contains("Job") && allowed.contains("Note"));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(RegroupConfig::from_toml_str("").unwrap(), RegroupConfig::default());
    }

    #[test]
    fn rejects_unknown_keys_and_policies() {
        assert!(matches!(
            RegroupConfig::from_toml_str("tagg = \"x\""),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            RegroupConfig::from_toml_str("tag = \"x\"\npolicy = \"last-wins\""),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn validate_rejects_inconsistent_settings() {
        let key_without_tag = RegroupConfig {
            key_field: Some("Id".into()),
            ..Default::default()
        };
        assert!(key_without_tag.validate().is_err());

        let blank_tag = RegroupConfig::for_tag("  ");
        assert!(blank_tag.validate().is_err());

        let blank_child = RegroupConfig {
            allowed_child_tags: Some(vec!["".into()]),
            ..RegroupConfig::for_tag("E")
        };
        assert!(blank_child.validate().is_err());

        let wide = RegroupConfig {
            output: OutputConfig {
                indent: 40,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(wide.validate().is_err());
    }

    #[test]
    fn employee_import_preset() {
        let c = RegroupConfig::preset("employee-import").unwrap();
        assert_eq!(c, RegroupConfig::employee_import());
        c.validate().unwrap();
        let options = c.merge_options().unwrap();
        assert_eq!(options.tag, "Employee");
        assert_eq!(options.key_field.as_deref(), Some("XRefCode"));
        assert_eq!(options.policy, MergePolicy::AppendAll);
        assert!(RegroupConfig::preset("nope").is_none());
    }

    #[test]
    fn toml_roundtrip() {
        let c = RegroupConfig::employee_import();
        let text = c.to_toml_string().unwrap();
        assert_eq!(RegroupConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tag = \"Order\"\nkey_match = \"numeric\"").unwrap();
        let c = RegroupConfig::load(file.path()).unwrap();
        assert_eq!(c.tag.as_deref(), Some("Order"));
        assert_eq!(c.key_match, KeyMatch::Numeric);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RegroupConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, SdkError::Io(_)));
    }
}
