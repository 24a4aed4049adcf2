//! Batch planning: which migrations a run touches, and in what order
//!
//! Everything here is pure. The engine reconciles the ledger and the resolver first and
//! hands the results in, so ordering rules can be tested without a database.

use crate::migration::error::{MigrationError, Result};
use crate::migration::resolver::MigrationUnit;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    /// Past tense, for log lines
    pub fn verb(&self) -> &'static str {
        match self {
            Direction::Up => "Applied",
            Direction::Down => "Reverted",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a batch should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Every pending migration (up) or every applied one (down)
    All,
    /// At most `n` migrations
    Steps(usize),
    /// Up to and including the named migration
    To(String),
}

impl Intent {
    pub fn default_for(direction: Direction) -> Self {
        match direction {
            Direction::Up => Intent::All,
            Direction::Down => Intent::Steps(1),
        }
    }
}

/// Pending migrations in name order
///
/// `units` must already be sorted by name, as [`Resolver::resolve_all`] returns them.
///
/// # Errors
///
/// Returns `MigrationError::UnknownMigration` if `Intent::To` names a migration that does
/// not resolve.
///
/// [`Resolver::resolve_all`]: crate::migration::resolver::Resolver::resolve_all
pub fn plan_up<'a>(
    units: &'a [MigrationUnit],
    applied: &[String],
    intent: &Intent,
) -> Result<Vec<&'a MigrationUnit>> {
    let applied: HashSet<&str> = applied.iter().map(String::as_str).collect();
    let pending = units.iter().filter(|u| !applied.contains(u.name.as_str()));

    let plan = match intent {
        Intent::All => pending.collect(),
        Intent::Steps(n) => pending.take(*n).collect(),
        Intent::To(target) => {
            if !units.iter().any(|u| &u.name == target) {
                return Err(MigrationError::UnknownMigration(target.clone()));
            }
            pending.filter(|u| u.name.as_str() <= target.as_str()).collect()
        }
    };
    Ok(plan)
}

/// Applied migrations to revert, newest first
///
/// # Errors
///
/// Returns `MigrationError::UnknownMigration` if `Intent::To` names a migration that is not
/// applied, and `MigrationError::MissingMigration` if a selected ledger entry no longer
/// resolves to a unit (its `down` cannot be run).
pub fn plan_down<'a>(
    units: &'a [MigrationUnit],
    applied: &[String],
    intent: &Intent,
) -> Result<Vec<&'a MigrationUnit>> {
    let mut newest_first: Vec<&str> = applied.iter().map(String::as_str).collect();
    newest_first.sort_unstable_by(|a, b| b.cmp(a));

    let selected: Vec<&str> = match intent {
        Intent::All => newest_first,
        Intent::Steps(n) => newest_first.into_iter().take(*n).collect(),
        Intent::To(target) => {
            if !newest_first.contains(&target.as_str()) {
                return Err(MigrationError::UnknownMigration(target.clone()));
            }
            newest_first
                .into_iter()
                .take_while(|name| *name >= target.as_str())
                .collect()
        }
    };

    selected
        .into_iter()
        .map(|name| {
            units
                .iter()
                .find(|u| u.name == name)
                .ok_or_else(|| MigrationError::MissingMigration(name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(names: &[&str]) -> Vec<MigrationUnit> {
        names
            .iter()
            .map(|n| MigrationUnit::sql(*n, format!("/migrations/{n}")))
            .collect()
    }

    fn applied(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn names(plan: &[&MigrationUnit]) -> Vec<String> {
        plan.iter().map(|u| u.name.clone()).collect()
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Down.as_str(), "down");
        assert_eq!(Intent::default_for(Direction::Up), Intent::All);
        assert_eq!(Intent::default_for(Direction::Down), Intent::Steps(1));
    }

    #[test]
    fn test_plan_up_skips_applied_in_name_order() {
        let all = units(&["001_a.sql", "002_b.sql", "003_c.sql", "004_d.sql"]);
        let done = applied(&["001_a.sql", "003_c.sql"]);

        let plan = plan_up(&all, &done, &Intent::All).unwrap();
        assert_eq!(names(&plan), vec!["002_b.sql", "004_d.sql"]);

        let plan = plan_up(&all, &done, &Intent::Steps(1)).unwrap();
        assert_eq!(names(&plan), vec!["002_b.sql"]);
    }

    #[test]
    fn test_plan_up_to_target() {
        let all = units(&["001_a.sql", "002_b.sql", "003_c.sql"]);

        let plan = plan_up(&all, &[], &Intent::To("002_b.sql".to_string())).unwrap();
        assert_eq!(names(&plan), vec!["001_a.sql", "002_b.sql"]);

        let err = plan_up(&all, &[], &Intent::To("009_nope.sql".to_string())).unwrap_err();
        assert!(matches!(err, MigrationError::UnknownMigration(ref n) if n == "009_nope.sql"));
    }

    #[test]
    fn test_plan_up_nothing_pending() {
        let all = units(&["001_a.sql"]);
        let plan = plan_up(&all, &applied(&["001_a.sql"]), &Intent::All).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_down_newest_first() {
        let all = units(&["001_a.sql", "002_b.sql", "003_c.sql"]);
        let done = applied(&["001_a.sql", "002_b.sql", "003_c.sql"]);

        let plan = plan_down(&all, &done, &Intent::Steps(1)).unwrap();
        assert_eq!(names(&plan), vec!["003_c.sql"]);

        let plan = plan_down(&all, &done, &Intent::All).unwrap();
        assert_eq!(names(&plan), vec!["003_c.sql", "002_b.sql", "001_a.sql"]);

        let plan = plan_down(&all, &done, &Intent::To("002_b.sql".to_string())).unwrap();
        assert_eq!(names(&plan), vec!["003_c.sql", "002_b.sql"]);
    }

    #[test]
    fn test_plan_down_errors() {
        let all = units(&["001_a.sql"]);
        let done = applied(&["001_a.sql", "002_gone.sql"]);

        let err = plan_down(&all, &done, &Intent::Steps(1)).unwrap_err();
        assert!(matches!(err, MigrationError::MissingMigration(ref n) if n == "002_gone.sql"));

        let err = plan_down(&all, &applied(&["001_a.sql"]), &Intent::To("003_x.sql".to_string()))
            .unwrap_err();
        assert!(matches!(err, MigrationError::UnknownMigration(_)));
    }

    #[test]
    fn test_plan_down_empty_ledger() {
        let all = units(&["001_a.sql"]);
        assert!(plan_down(&all, &[], &Intent::Steps(1)).unwrap().is_empty());
    }
}
