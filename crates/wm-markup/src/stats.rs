//! Per-render element statistics.

use std::collections::BTreeMap;

use crate::element::ElementType;
use crate::resolve::{FragmentOutcome, LinkType, ResolvedFragment};

/// Counts of what a render extracted and how it resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RenderStats {
    /// Extracted elements per kind.
    pub elements: BTreeMap<ElementType, usize>,
    /// Links per classification, red links included.
    pub links: BTreeMap<LinkType, usize>,
    /// Internal and InterWiki links whose target does not exist.
    pub red_links: usize,
    /// Variables shown as their original syntax.
    pub unresolved: usize,
    /// Elements rendered as error fragments.
    pub failed: usize,
}

impl RenderStats {
    pub(crate) fn from_fragments(fragments: &[ResolvedFragment]) -> Self {
        let mut stats = Self::default();
        for fragment in fragments {
            *stats.elements.entry(fragment.kind).or_default() += 1;
            if let Some(link_type) = fragment.link_type {
                *stats.links.entry(link_type).or_default() += 1;
            }
            match fragment.outcome {
                FragmentOutcome::Resolved => {}
                FragmentOutcome::Unresolved => stats.unresolved += 1,
                FragmentOutcome::Failed => stats.failed += 1,
                FragmentOutcome::RedLink => stats.red_links += 1,
            }
        }
        stats
    }

    /// Total number of extracted elements.
    #[must_use]
    pub fn total(&self) -> usize {
        self.elements.values().sum()
    }

    /// Number of elements of one kind.
    #[must_use]
    pub fn count(&self, kind: ElementType) -> usize {
        self.elements.get(&kind).copied().unwrap_or(0)
    }

    /// Number of links of one type.
    #[must_use]
    pub fn link_count(&self, link_type: LinkType) -> usize {
        self.links.get(&link_type).copied().unwrap_or(0)
    }
}
