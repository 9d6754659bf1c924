//! Output lines of the `clean` command.
//!
//! A dry run reports what a real run would delete.

use warden_engine::Removed;

fn verb(dry_run: bool) -> &'static str {
    if dry_run {
        "Would delete"
    } else {
        "Deleted"
    }
}

pub fn orphaned(removed: Removed, dry_run: bool) -> String {
    let verb = verb(dry_run);
    match removed {
        Removed::Nothing => "No orphaned abilities.".to_string(),
        Removed::Deleted(1) => format!("{verb} 1 orphaned ability."),
        Removed::Deleted(count) => format!("{verb} {count} orphaned abilities."),
    }
}

pub fn missing(removed: Removed, dry_run: bool) -> String {
    let verb = verb(dry_run);
    match removed {
        Removed::Nothing => "No abilities with missing models.".to_string(),
        Removed::Deleted(1) => format!("{verb} 1 ability with a missing model."),
        Removed::Deleted(count) => format!("{verb} {count} abilities with missing models."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphaned_lines() {
        assert_eq!(orphaned(Removed::Nothing, false), "No orphaned abilities.");
        assert_eq!(orphaned(Removed::Deleted(1), false), "Deleted 1 orphaned ability.");
        assert_eq!(orphaned(Removed::Deleted(2), false), "Deleted 2 orphaned abilities.");
    }

    #[test]
    fn test_missing_lines() {
        assert_eq!(missing(Removed::Nothing, false), "No abilities with missing models.");
        assert_eq!(
            missing(Removed::Deleted(1), false),
            "Deleted 1 ability with a missing model."
        );
        assert_eq!(
            missing(Removed::Deleted(3), false),
            "Deleted 3 abilities with missing models."
        );
    }

    #[test]
    fn test_dry_run_lines() {
        assert_eq!(
            orphaned(Removed::Deleted(2), true),
            "Would delete 2 orphaned abilities."
        );
        assert_eq!(
            missing(Removed::Deleted(1), true),
            "Would delete 1 ability with a missing model."
        );
        assert_eq!(orphaned(Removed::Nothing, true), "No orphaned abilities.");
    }
}
