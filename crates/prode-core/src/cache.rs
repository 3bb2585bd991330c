// Memoized fixture resolution for one template.
//
// Official results change far less often than predictions, so callers that
// rebuild the leaderboard on every request keep one of these around.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::bracket::BracketTemplate;
use crate::error::TemplateError;
use crate::resolver::{resolve_fixture, VirtualFixture};
use crate::score::ScoreSet;

/// Entries kept before the cache starts over.
const DEFAULT_CAPACITY: usize = 16;

/// Caches `resolve_fixture` results keyed by a hash of the score inputs.
/// The inputs themselves are kept alongside so a hash collision can never
/// hand back the wrong fixture.
#[derive(Debug, Clone)]
pub struct FixtureCache {
    template: BracketTemplate,
    entries: HashMap<u64, (ScoreSet, VirtualFixture)>,
    capacity: usize,
}

impl FixtureCache {
    pub fn new(template: BracketTemplate) -> Self {
        Self::with_capacity(template, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(template: BracketTemplate, capacity: usize) -> Self {
        FixtureCache {
            template,
            entries: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn template(&self) -> &BracketTemplate {
        &self.template
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `scores`, reusing a previous result for identical inputs.
    pub fn resolve(&mut self, scores: &ScoreSet) -> Result<VirtualFixture, TemplateError> {
        let key = score_hash(scores);
        if let Some((cached_scores, fixture)) = self.entries.get(&key) {
            if cached_scores == scores {
                debug!("fixture cache hit ({} scores)", scores.len());
                return Ok(fixture.clone());
            }
        }

        let fixture = resolve_fixture(&self.template, scores)?;
        if self.entries.len() >= self.capacity {
            self.entries.clear();
        }
        self.entries.insert(key, (scores.clone(), fixture.clone()));
        Ok(fixture)
    }
}

/// Deterministic across runs: `DefaultHasher::new` uses fixed keys and the
/// score set iterates in key order.
fn score_hash(scores: &ScoreSet) -> u64 {
    let mut hasher = DefaultHasher::new();
    scores.hash(&mut hasher);
    hasher.finish()
}
