//! Base branch selection (spec.md §4.7.5): default to the repository's
//! configured branch unless the issue's parent has a branch that actually
//! exists, in which case that branch is used (sanitized).

/// Strip backticks from a branch name pulled out of free text, so it can't
/// be used to inject shell-meaningful characters downstream.
#[must_use]
pub fn sanitize_branch_name(name: &str) -> String {
    name.replace('`', "")
}

/// Resolve the base branch for a new session.
///
/// `parent_branch` is `Some` only when the issue has a parent AND that
/// parent's branch has already been confirmed to exist locally or on the
/// remote — callers resolve that existence check themselves (it requires a
/// git call out of this crate's scope).
#[must_use]
pub fn select_base_branch(repository_base_branch: &str, parent_branch: Option<&str>) -> String {
    match parent_branch {
        Some(branch) if !branch.trim().is_empty() => sanitize_branch_name(branch),
        _ => repository_base_branch.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_repository_branch_without_a_parent() {
        assert_eq!(select_base_branch("main", None), "main");
    }

    #[test]
    fn uses_parent_branch_when_present() {
        assert_eq!(select_base_branch("main", Some("feature/eng-1")), "feature/eng-1");
    }

    #[test]
    fn sanitizes_backticks_out_of_parent_branch() {
        assert_eq!(select_base_branch("main", Some("feature/`rm -rf`")), "feature/rm -rf");
    }

    #[test]
    fn blank_parent_branch_falls_back_to_repository_branch() {
        assert_eq!(select_base_branch("main", Some("   ")), "main");
    }
}
