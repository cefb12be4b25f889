//! Release tag calculation.
//!
//! Releases are tagged `v0.0.<n>`. The next tag increments the highest
//! existing `n`; tags in any other shape are ignored.

use std::process::Command;

use anyhow::Context;

/// Compute the next release tag from the existing tag list.
///
/// With no matching tag the baseline is `v0.0.0`, so the first release
/// is `v0.0.1`.
pub fn next_tag(tags: &[String]) -> String {
    let highest = tags.iter().filter_map(|t| parse_patch(t)).max().unwrap_or(0);
    format!("v0.0.{}", highest + 1)
}

/// Extract `n` from a tag matching exactly `v0.0.<digits>`.
fn parse_patch(tag: &str) -> Option<u64> {
    let suffix = tag.strip_prefix("v0.0.")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// List the repository's `v0.0.*` tags.
pub fn git_tags() -> anyhow::Result<Vec<String>> {
    let output = Command::new("git")
        .args(["tag", "--list", "v0.0.*"])
        .output()
        .context("run git tag")?;
    if !output.status.success() {
        anyhow::bail!(
            "git tag failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .filter(|l| !l.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_release_from_empty_tag_list() {
        assert_eq!(next_tag(&[]), "v0.0.1");
    }

    #[test]
    fn increments_highest_patch() {
        assert_eq!(next_tag(&tags(&["v0.0.1", "v0.0.3", "v0.0.2"])), "v0.0.4");
    }

    #[test]
    fn highest_wins_over_list_order() {
        assert_eq!(next_tag(&tags(&["v0.0.10", "v0.0.9"])), "v0.0.11");
    }

    #[test]
    fn ignores_non_matching_tags() {
        assert_eq!(
            next_tag(&tags(&["v1.2.3", "v0.1.0", "release-2", "v0.0.7-rc1"])),
            "v0.0.1"
        );
    }

    #[test]
    fn mixed_tags_only_count_exact_matches() {
        assert_eq!(
            next_tag(&tags(&["v0.0.5", "v0.0.12-beta", "v0.0.8", "v2.0.0"])),
            "v0.0.9"
        );
    }

    #[test]
    fn parse_patch_rejects_empty_and_signed_suffixes() {
        assert_eq!(parse_patch("v0.0."), None);
        assert_eq!(parse_patch("v0.0.+3"), None);
        assert_eq!(parse_patch("v0.0.42"), Some(42));
    }
}
