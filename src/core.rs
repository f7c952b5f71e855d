// Core data structures for flightcheck
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to a persisted project record owned elsewhere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Reference to a persisted release record; absent for pre-release cycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Reference to the cycle record representing this check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRef {
    #[serde(rename = "_id")]
    pub id: String,
}

/// The unit-of-work payload carried by a `cycle:start` event.
///
/// Immutable once received; shared read-only across all hooks for the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub repo: String,
    pub tag: String,
    pub project: ProjectRef,
    #[serde(default)]
    pub release: Option<ReleaseRef>,
    pub cycle: CycleRef,
}

impl Job {
    pub fn new(
        repo: impl Into<String>,
        tag: impl Into<String>,
        project: ProjectRef,
        release: Option<ReleaseRef>,
        cycle: CycleRef,
    ) -> Self {
        Self {
            repo: repo.into(),
            tag: tag.into(),
            project,
            release,
            cycle,
        }
    }
}

/// A named check stage (e.g. "pre"). Normalized to lowercase on construction
/// so discovery comparisons are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phase(String);

impl Phase {
    pub fn new(name: impl AsRef<str>) -> Self {
        Phase(name.as_ref().to_lowercase())
    }

    /// The phase every `cycle:start` event triggers
    pub fn pre() -> Self {
        Phase("pre".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unit of externally reportable feedback produced by a hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    pub body: String,
}

impl Issue {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Result contributed by exactly one hook; immutable after the hook completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PartialResult {
    #[serde(default)]
    pub errors: u64,
    #[serde(default)]
    pub warnings: u64,
    #[serde(default)]
    pub information: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<Issue>,
}

impl PartialResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_errors(mut self, errors: u64) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_warnings(mut self, warnings: u64) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.information.insert(key.into(), value);
        self
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issue = Some(issue);
        self
    }
}

/// The merged result of one run, published as the `cycle:finished` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub cycle: String,
    pub project: String,
    pub release: Option<String>,
    pub errors: u64,
    pub warnings: u64,
    pub information: BTreeMap<String, serde_json::Value>,
    pub issues: Vec<Issue>,
}

/// Fold a sequence of partial results into one report stamped with the job's
/// correlation identifiers.
///
/// Errors and warnings are summed. The information map is merged with
/// last-write-wins on key collision, in sequence order. Issues keep sequence
/// order, omitting hooks that raised none. Pure: no I/O, deterministic.
pub fn aggregate(results: &[PartialResult], job: &Job) -> AggregateReport {
    let mut report = AggregateReport {
        cycle: job.cycle.id.clone(),
        project: job.project.id.clone(),
        release: job.release.as_ref().map(|r| r.id.clone()),
        errors: 0,
        warnings: 0,
        information: BTreeMap::new(),
        issues: Vec::new(),
    };

    for result in results {
        report.errors += result.errors;
        report.warnings += result.warnings;
        for (key, value) in &result.information {
            report.information.insert(key.clone(), value.clone());
        }
        if let Some(issue) = &result.issue {
            report.issues.push(issue.clone());
        }
    }

    report
}
