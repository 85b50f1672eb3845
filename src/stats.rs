use std::sync::Arc;

use chrono::DateTime;
use rusqlite::{Row, params};
use tracing::{debug, info};

use crate::database::Database;
use crate::errors::StoreResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchStat {
    pub version_label: String,
    pub launch_count: u32,
    pub release_marker: String,
}

impl LaunchStat {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            version_label: row.get(0)?,
            launch_count: row.get(1)?,
            release_marker: row.get(2)?,
        })
    }
}

/// `DD.MM.YYYY` for a parseable RFC 3339 hint, otherwise a label built from
/// the last token of `version_label`.
pub fn release_marker(version_label: &str, release_hint: Option<&str>) -> String {
    if let Some(hint) = release_hint {
        match DateTime::parse_from_rfc3339(hint) {
            Ok(time) => return time.format("%d.%m.%Y").to_string(),
            Err(e) => debug!("Unparseable release time {:?}: {}", hint, e),
        }
    }
    let token = version_label.split_whitespace().last().unwrap_or(version_label);
    format!("{} (no release date)", token)
}

fn like_pattern(substring: &str) -> String {
    let mut escaped = String::with_capacity(substring.len() + 2);
    escaped.push('%');
    for c in substring.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[derive(Clone)]
pub struct StatsStore {
    db: Arc<Database>,
}

impl StatsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Count one launch of `version_label` and return the new total.
    pub fn record_launch(&self, version_label: &str, release_hint: Option<&str>) -> StoreResult<u32> {
        let marker = release_marker(version_label, release_hint);
        let conn = self.db.connection()?;
        let launches: u32 = conn.query_row(
            "INSERT INTO stats (version, launches, release) VALUES (?1, 1, ?2)
             ON CONFLICT(version) DO UPDATE SET launches = launches + 1
             RETURNING launches",
            params![version_label, marker],
            |row| row.get(0),
        )?;
        info!("{} launched {} time(s)", version_label, launches);
        Ok(launches)
    }

    pub fn query_all(&self) -> StoreResult<Vec<LaunchStat>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare_cached("SELECT version, launches, release FROM stats ORDER BY rowid")?;
        let rows = stmt.query_map([], LaunchStat::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rows whose label contains `substring`, ignoring ASCII case.
    pub fn query_filtered(&self, substring: &str) -> StoreResult<Vec<LaunchStat>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare_cached(
            "SELECT version, launches, release FROM stats
             WHERE version LIKE ?1 ESCAPE '\\'
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([like_pattern(substring)], LaunchStat::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StatsStore {
        StatsStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn labels(stats: &[LaunchStat]) -> Vec<&str> {
        stats.iter().map(|s| s.version_label.as_str()).collect()
    }

    #[test]
    fn test_first_launch_then_increments() {
        let store = store();
        assert_eq!(store.record_launch("Vanilla 1.20.1", Some("2023-06-12T13:25:51+00:00")).unwrap(), 1);
        for n in 2..=5 {
            assert_eq!(store.record_launch("Vanilla 1.20.1", None).unwrap(), n);
        }

        let all = store.query_all().unwrap();
        assert_eq!(
            all,
            vec![LaunchStat {
                version_label: "Vanilla 1.20.1".to_string(),
                launch_count: 5,
                release_marker: "12.06.2023".to_string(),
            }]
        );
    }

    #[test]
    fn test_release_marker_is_kept_on_increment() {
        let store = store();
        store.record_launch("Fabric 1.19.4", None).unwrap();
        store.record_launch("Fabric 1.19.4", Some("2023-03-14T12:56:18+00:00")).unwrap();

        let all = store.query_all().unwrap();
        assert_eq!(all[0].launch_count, 2);
        assert_eq!(all[0].release_marker, "1.19.4 (no release date)");
    }

    #[test]
    fn test_release_marker_fallbacks() {
        assert_eq!(release_marker("Vanilla 1.8.9", Some("2015-12-03T09:24:39+00:00")), "03.12.2015");
        assert_eq!(release_marker("Fabric 1.20.1", None), "1.20.1 (no release date)");
        assert_eq!(release_marker("Vanilla 1.20", Some("yesterday")), "1.20 (no release date)");
        assert_eq!(release_marker("", None), " (no release date)");
    }

    #[test]
    fn test_empty_filter_matches_query_all() {
        let store = store();
        store.record_launch("Vanilla 1.20.1", None).unwrap();
        store.record_launch("Fabric 1.20.1", None).unwrap();
        store.record_launch("Vanilla 1.16.5", None).unwrap();

        assert_eq!(store.query_filtered("").unwrap(), store.query_all().unwrap());
        assert_eq!(store.query_all().unwrap().len(), 3);
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let store = store();
        store.record_launch("Vanilla 1.20.1", None).unwrap();
        store.record_launch("Fabric 1.20.1", None).unwrap();
        store.record_launch("Vanilla 1.16.5", None).unwrap();

        assert_eq!(labels(&store.query_filtered("vanilla").unwrap()), vec!["Vanilla 1.20.1", "Vanilla 1.16.5"]);
        assert_eq!(labels(&store.query_filtered("FABRIC").unwrap()), vec!["Fabric 1.20.1"]);
        assert_eq!(labels(&store.query_filtered("1.20").unwrap()), vec!["Vanilla 1.20.1", "Fabric 1.20.1"]);
        assert!(store.query_filtered("forge").unwrap().is_empty());
    }

    #[test]
    fn test_filter_wildcards_are_literal() {
        let store = store();
        store.record_launch("Vanilla 1.20.1", None).unwrap();
        store.record_launch("Custom 100%_done", None).unwrap();

        assert_eq!(labels(&store.query_filtered("%").unwrap()), vec!["Custom 100%_done"]);
        assert_eq!(labels(&store.query_filtered("_").unwrap()), vec!["Custom 100%_done"]);
        assert!(store.query_filtered("1_20").unwrap().is_empty());
    }
}
