// ABOUTME: Discovers the databases present on the server
// ABOUTME: Runs SHOW DATABASES through the client and drops introspection schemas

use crate::mysql::{is_introspection_schema, ClientCommand, ServerConnection};
use anyhow::{Context, Result};

/// List every database worth dumping, in server order
pub fn list_databases(conn: &ServerConnection) -> Result<Vec<String>> {
    let lines = conn
        .command(
            ClientCommand::Query,
            vec![
                "-sN".to_string(),
                "-e".to_string(),
                "SHOW DATABASES;".to_string(),
            ],
        )
        .output_lines()
        .context("Failed to get database list")?;

    Ok(parse_database_list(lines))
}

/// Trim lines, drop blanks and the two introspection schemas
pub fn parse_database_list<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let name = line.as_ref().trim();
            if name.is_empty() || is_introspection_schema(name) {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_database_list_keeps_order_and_mysql() {
        let output = [
            "information_schema",
            "mysql",
            "orders  ",
            "",
            "   ",
            "performance_schema",
            "customers",
            "sys",
        ];
        assert_eq!(
            parse_database_list(output),
            vec!["mysql", "orders", "customers", "sys"]
        );
    }

    #[test]
    fn test_parse_database_list_empty() {
        assert!(parse_database_list(Vec::<String>::new()).is_empty());
    }
}
