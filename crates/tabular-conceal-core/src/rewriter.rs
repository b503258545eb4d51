//! Identifier substitution inside text blocks
//!
//! Only identifiers present in the resolved map are matched, as literal
//! strings, so surrounding hex or dash runs cannot hide them.

use crate::document::TextDocument;
use crate::error::{ConcealError, Result};
use crate::identifier::find_identifiers;
use aho_corasick::{AhoCorasick, MatchKind};
use indexmap::IndexMap;
use std::borrow::Cow;
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteStats {
    pub blocks_changed: usize,
    pub replacements: usize,
    /// Identifier-shaped runs still present after rewriting.
    pub unresolved_occurrences: usize,
}

pub struct TextRewriter<'a> {
    matcher: Option<AhoCorasick>,
    replacements: Vec<&'a str>,
}

impl<'a> TextRewriter<'a> {
    pub fn new(resolved: &'a IndexMap<String, String>) -> Result<Self> {
        let (patterns, replacements): (Vec<&str>, Vec<&str>) = resolved
            .iter()
            .filter(|(identifier, _)| !identifier.is_empty())
            .map(|(identifier, value)| (identifier.as_str(), value.as_str()))
            .unzip();

        let matcher = if patterns.is_empty() {
            None
        } else {
            let matcher = AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostFirst)
                .build(&patterns)
                .map_err(|e| ConcealError::Matcher(e.to_string()))?;
            Some(matcher)
        };

        Ok(Self {
            matcher,
            replacements,
        })
    }

    /// Single left-to-right pass; substituted text is never re-scanned.
    /// Returns `Cow::Borrowed` when the block has nothing to replace.
    pub fn rewrite_block<'t>(&self, block: &'t str, stats: &mut RewriteStats) -> Cow<'t, str> {
        let rewritten = match &self.matcher {
            Some(matcher) => self.substitute(matcher, block, stats),
            None => Cow::Borrowed(block),
        };

        stats.unresolved_occurrences += find_identifiers(&rewritten).count();
        rewritten
    }

    fn substitute<'t>(
        &self,
        matcher: &AhoCorasick,
        block: &'t str,
        stats: &mut RewriteStats,
    ) -> Cow<'t, str> {
        let mut output = String::new();
        let mut last = 0;
        let mut replaced = 0usize;

        for found in matcher.find_iter(block) {
            output.push_str(&block[last..found.start()]);
            output.push_str(self.replacements[found.pattern().as_usize()]);
            last = found.end();
            replaced += 1;
        }

        if replaced == 0 {
            return Cow::Borrowed(block);
        }

        output.push_str(&block[last..]);
        stats.replacements += replaced;
        stats.blocks_changed += 1;
        Cow::Owned(output)
    }

    pub fn rewrite_document(&self, document: &mut TextDocument) -> RewriteStats {
        let mut stats = RewriteStats::default();
        for block in document.blocks_mut() {
            let updated = match self.rewrite_block(block, &mut stats) {
                Cow::Owned(updated) => Some(updated),
                Cow::Borrowed(_) => None,
            };
            if let Some(updated) = updated {
                *block = updated;
            }
        }
        debug!(
            "Rewrote {} blocks with {} replacements",
            stats.blocks_changed, stats.replacements
        );
        stats
    }
}
