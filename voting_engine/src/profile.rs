use std::collections::HashMap;

use log::debug;

/// One declared position: an issue name, the weight the holder puts on it
/// and where they stand on it.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueStance {
    pub issue: String,
    /// How much the issue matters to the holder, 0 meaning not held at all.
    pub weight: f64,
    /// Stance on the issue, -10 to +10.
    pub stance: f64,
}

impl IssueStance {
    pub fn new(issue: &str, weight: f64, stance: f64) -> IssueStance {
        IssueStance {
            issue: issue.to_string(),
            weight: weight.clamp(0.0, 1.0),
            stance: stance.clamp(-10.0, 10.0),
        }
    }
}

/// Canonical form used for every name-based identity in the engine
/// (issue names, party names). Applied once at ingestion.
pub(crate) fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Stable issue-name to dense-index mapping, built once per simulation from
/// the union of all declared issues and shared read-only by every profile.
/// Indices never change for the lifetime of a run.
#[derive(Debug, Clone, Default)]
pub struct IssueVocabulary {
    index: HashMap<String, usize>,
}

impl IssueVocabulary {
    pub fn from_stances<'a, I>(all: I) -> IssueVocabulary
    where
        I: IntoIterator<Item = &'a IssueStance>,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        for stance in all {
            let key = canonical(&stance.issue);
            let next = index.len();
            index.entry(key).or_insert(next);
        }
        IssueVocabulary { index }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index_of(&self, issue: &str) -> Option<usize> {
        self.index.get(&canonical(issue)).copied()
    }
}

/// Dense per-issue (importance, stance) vectors over the shared vocabulary.
///
/// Owned by the entity it profiles and rebuilt, never mutated, when the
/// underlying values change.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueProfile {
    /// Importance per issue in [0, 1]; 0 means the issue is not held.
    pub importance: Vec<f64>,
    /// Stance per issue in [-10, 10].
    pub stance: Vec<f64>,
}

impl ValueProfile {
    pub fn empty(issue_count: usize) -> ValueProfile {
        ValueProfile {
            importance: vec![0.0; issue_count],
            stance: vec![0.0; issue_count],
        }
    }

    /// Builds a profile from declared stances. Issue names missing from the
    /// vocabulary are skipped rather than failing the build.
    pub fn build(stances: &[IssueStance], vocab: &IssueVocabulary) -> ValueProfile {
        let mut profile = ValueProfile::empty(vocab.len());
        for s in stances {
            match vocab.index_of(&s.issue) {
                Some(i) => {
                    profile.importance[i] = s.weight.clamp(0.0, 1.0);
                    profile.stance[i] = s.stance.clamp(-10.0, 10.0);
                }
                None => {
                    debug!("build: skipping unknown issue {:?}", s.issue);
                }
            }
        }
        profile
    }
}
