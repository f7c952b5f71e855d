// Built-in hook implementations
//
// Each hook inspects only the job payload it is given. Checks that need a
// checkout of the repository belong in external hook modules; these built-ins
// cover the metadata-level checks every project gets.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::core::{Issue, Job, PartialResult};
use crate::discovery::HookRegistry;
use crate::error::Result;
use crate::hooks::Hook;

/// Register the built-in hooks under their module ids
pub fn register_builtin_hooks(registry: &mut HookRegistry) {
    registry.register("repo", || Arc::new(RepoUrlHook));
    registry.register("tag", || Arc::new(TagFormatHook));
    registry.register("release", || Arc::new(ReleaseVersionHook));
}

/// Checks that the job's repository address looks like a cloneable git remote
pub struct RepoUrlHook;

#[async_trait]
impl Hook for RepoUrlHook {
    fn id(&self) -> &str {
        "repo"
    }

    async fn run(&self, job: Arc<Job>) -> Result<PartialResult> {
        let looks_like_git = job.repo.ends_with(".git")
            && (job.repo.starts_with("git@")
                || job.repo.starts_with("https://")
                || job.repo.starts_with("git://"));

        let mut result = PartialResult::new().with_info("repoUrlOk", json!(looks_like_git));
        if !looks_like_git {
            result = result.with_errors(1).with_issue(Issue::new(
                "Repository address is not cloneable",
                format!(
                    "The address `{}` does not look like a git remote. \
                     Expected a `git@`, `https://` or `git://` URL ending in `.git`.",
                    job.repo
                ),
            ));
        }
        Ok(result)
    }
}

/// Warns when the job's tag is not a plain release tag (vX.Y.Z or X.Y.Z)
pub struct TagFormatHook;

impl TagFormatHook {
    fn is_release_tag(tag: &str) -> bool {
        let version = tag.strip_prefix('v').unwrap_or(tag);
        semver::Version::parse(version).is_ok()
    }
}

#[async_trait]
impl Hook for TagFormatHook {
    fn id(&self) -> &str {
        "tag"
    }

    async fn run(&self, job: Arc<Job>) -> Result<PartialResult> {
        let is_release = Self::is_release_tag(&job.tag);
        let mut result = PartialResult::new().with_info("releaseTag", json!(is_release));
        if !is_release {
            result = result.with_warnings(1).with_info(
                "tag",
                json!(format!("`{}` is not a semantic version tag", job.tag)),
            );
        }
        Ok(result)
    }
}

/// Checks that the release version, when the job carries one, matches the tag
pub struct ReleaseVersionHook;

#[async_trait]
impl Hook for ReleaseVersionHook {
    fn id(&self) -> &str {
        "release"
    }

    async fn run(&self, job: Arc<Job>) -> Result<PartialResult> {
        let Some(release) = &job.release else {
            // Pre-release cycles have nothing to cross-check
            return Ok(PartialResult::new().with_info("releasePresent", json!(false)));
        };

        let mut result = PartialResult::new().with_info("releasePresent", json!(true));
        if let Some(version) = &release.version {
            let tag_version = job.tag.strip_prefix('v').unwrap_or(&job.tag);
            if tag_version != version {
                result = result.with_errors(1).with_issue(Issue::new(
                    "Release version does not match tag",
                    format!(
                        "The release record says `{}` but the tagged version is `{}`.",
                        version, tag_version
                    ),
                ));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CycleRef, ProjectRef, ReleaseRef};

    fn job_with(repo: &str, tag: &str, release: Option<ReleaseRef>) -> Arc<Job> {
        Arc::new(Job::new(
            repo,
            tag,
            ProjectRef {
                id: "p1".to_string(),
                name: "App".to_string(),
            },
            release,
            CycleRef {
                id: "c1".to_string(),
            },
        ))
    }

    #[tokio::test]
    async fn test_repo_hook_accepts_ssh_remote() {
        let result = RepoUrlHook
            .run(job_with("git@host:org/app.git", "v1.0.0", None))
            .await
            .unwrap();
        assert_eq!(result.errors, 0);
        assert!(result.issue.is_none());
    }

    #[tokio::test]
    async fn test_repo_hook_flags_local_path() {
        let result = RepoUrlHook
            .run(job_with("/home/user/app", "v1.0.0", None))
            .await
            .unwrap();
        assert_eq!(result.errors, 1);
        assert!(result.issue.is_some());
    }

    #[tokio::test]
    async fn test_tag_hook_warns_on_branch_name() {
        let result = TagFormatHook
            .run(job_with("git@host:org/app.git", "master", None))
            .await
            .unwrap();
        assert_eq!(result.warnings, 1);
        assert_eq!(result.errors, 0);
    }

    #[tokio::test]
    async fn test_tag_hook_accepts_v_prefixed_version() {
        let result = TagFormatHook
            .run(job_with("git@host:org/app.git", "v2.1.0", None))
            .await
            .unwrap();
        assert_eq!(result.warnings, 0);
    }

    #[tokio::test]
    async fn test_release_hook_detects_version_mismatch() {
        let release = ReleaseRef {
            id: "r1".to_string(),
            version: Some("2.0.0".to_string()),
        };
        let result = ReleaseVersionHook
            .run(job_with("git@host:org/app.git", "v2.1.0", Some(release)))
            .await
            .unwrap();
        assert_eq!(result.errors, 1);
        assert!(result.issue.is_some());
    }

    #[tokio::test]
    async fn test_release_hook_skips_without_release() {
        let result = ReleaseVersionHook
            .run(job_with("git@host:org/app.git", "v2.1.0", None))
            .await
            .unwrap();
        assert_eq!(result.errors, 0);
    }
}
