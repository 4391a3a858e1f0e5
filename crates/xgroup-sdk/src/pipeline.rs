use std::collections::BTreeSet;

use tracing::{debug, info};

use xgroup_analyze::{KeyCandidate, RepeatSite};
use xgroup_merge::MergeReport;
use xgroup_tree::{prune_empty, Document};

use crate::config::RegroupConfig;
use crate::error::SdkResult;

/// Result of one pipeline run.
#[derive(Clone, Debug)]
pub struct RegroupOutput {
    /// The serialized document.
    pub xml: Vec<u8>,
    pub report: MergeReport,
    /// Elements removed by the prune step; zero when pruning is off.
    pub pruned: usize,
}

/// Parse, merge, optionally prune, serialize.
#[derive(Clone, Debug)]
pub struct Regrouper {
    config: RegroupConfig,
}

impl Regrouper {
    pub fn new(config: RegroupConfig) -> SdkResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegroupConfig {
        &self.config
    }

    // ---- Pipeline ----

    pub fn run(&self, input: &[u8]) -> SdkResult<RegroupOutput> {
        let mut doc = Document::parse(input)?;
        let (report, pruned) = self.apply(&mut doc);
        let xml = doc.to_bytes(&self.config.write_options())?;

        info!(
            groups = report.groups_merged,
            donors = report.donors_removed,
            pruned,
            bytes = xml.len(),
            "regrouped document"
        );
        Ok(RegroupOutput {
            xml,
            report,
            pruned,
        })
    }

    /// Merge (and prune, if configured) an already parsed document.
    pub fn apply(&self, doc: &mut Document) -> (MergeReport, usize) {
        let report = match self.config.merge_options() {
            Some(options) => xgroup_merge::merge(doc, &options),
            None => xgroup_merge::merge_all(doc, &self.config.generic_options()),
        };
        let pruned = if self.config.prune_empty {
            prune_empty(doc)
        } else {
            0
        };
        debug!(policy = %self.config.effective_policy(), pruned, "applied regroup");
        (report, pruned)
    }

    /// Only remove empty elements; no merging takes place.
    pub fn prune(&self, input: &[u8]) -> SdkResult<RegroupOutput> {
        let mut doc = Document::parse(input)?;
        let pruned = prune_empty(&mut doc);
        let xml = doc.to_bytes(&self.config.write_options())?;
        Ok(RegroupOutput {
            xml,
            report: MergeReport::new(),
            pruned,
        })
    }

    // ---- Analysis ----

    pub fn candidate_tags(input: &[u8]) -> SdkResult<BTreeSet<String>> {
        let doc = Document::parse(input)?;
        Ok(xgroup_analyze::candidate_tags(&doc))
    }

    pub fn repeat_sites(input: &[u8]) -> SdkResult<Vec<RepeatSite>> {
        let doc = Document::parse(input)?;
        Ok(xgroup_analyze::repeat_sites(&doc))
    }

    /// Child field names of the first element with `tag`.
    pub fn key_fields(input: &[u8], tag: &str) -> SdkResult<Vec<String>> {
        let doc = Document::parse(input)?;
        Ok(xgroup_analyze::child_field_names(&doc, tag))
    }

    pub fn key_candidates(input: &[u8], tag: &str) -> SdkResult<Vec<KeyCandidate>> {
        let doc = Document::parse(input)?;
        Ok(xgroup_analyze::key_candidates(&doc, tag))
    }

    pub fn child_tags(input: &[u8], tag: &str) -> SdkResult<BTreeSet<String>> {
        let doc = Document::parse(input)?;
        Ok(xgroup_analyze::child_tags(&doc, tag))
    }
}
