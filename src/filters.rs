// ABOUTME: Database and table selection rules for dump and import runs
// ABOUTME: Handles include/exclude database lists and per-database table exclusions

use anyhow::{bail, Result};

/// Selection rules applied to discovered databases
#[derive(Debug, Clone, Default)]
pub struct DatabaseFilter {
    include_databases: Option<Vec<String>>,
    exclude_databases: Option<Vec<String>>,
    exclude_tables: Vec<String>, // Format: "db.table"
}

impl DatabaseFilter {
    /// Creates a filter from CLI arguments
    pub fn new(
        include_databases: Option<Vec<String>>,
        exclude_databases: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_databases.is_some() && exclude_databases.is_some() {
            bail!("Cannot use both --include-databases and --exclude-databases");
        }

        let exclude_tables = exclude_tables.unwrap_or_default();
        for table in &exclude_tables {
            match table.split_once('.') {
                Some((db, name)) if !db.is_empty() && !name.is_empty() => {}
                _ => bail!(
                    "Table must be specified as 'database.table', got '{}'",
                    table
                ),
            }
        }

        Ok(Self {
            include_databases,
            exclude_databases,
            exclude_tables,
        })
    }

    /// Creates an empty filter (everything selected)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.include_databases.is_none()
            && self.exclude_databases.is_none()
            && self.exclude_tables.is_empty()
    }

    /// Determines if a database takes part in the run
    pub fn should_include_database(&self, db_name: &str) -> bool {
        if let Some(ref include) = self.include_databases {
            if !include.iter().any(|db| db == db_name) {
                return false;
            }
        }

        if let Some(ref exclude) = self.exclude_databases {
            if exclude.iter().any(|db| db == db_name) {
                return false;
            }
        }

        true
    }

    /// Excluded tables belonging to `db_name`, still in `db.table` form
    pub fn excluded_tables_for(&self, db_name: &str) -> Vec<String> {
        let prefix = format!("{}.", db_name);
        self.exclude_tables
            .iter()
            .filter(|full| {
                full.strip_prefix(&prefix)
                    .is_some_and(|table| !table.is_empty())
            })
            .cloned()
            .collect()
    }
}
