use anyhow::Result;
use sqlx::{Executor, PgPool};
use tracing::info;

/// Migration scripts compiled into the binary, keyed by file name
const MIGRATIONS: &[(&str, &str)] = &[
    ("add_indexes.sql", include_str!("sql/add_indexes.sql")),
    (
        "001_create_camera_registrations.sql",
        include_str!("sql/001_create_camera_registrations.sql"),
    ),
];

/// Numbered files run in numeric order; index scripts run after every table
fn get_order_value(name: &str) -> usize {
    if name.starts_with("add_indexes") {
        return 2000;
    }
    name.split('_')
        .next()
        .and_then(|prefix| prefix.parse::<usize>().ok())
        .unwrap_or(usize::MAX)
}

/// Migration names in the order they are applied
pub fn ordered_migrations() -> Vec<(&'static str, &'static str)> {
    let mut entries = MIGRATIONS.to_vec();
    entries.sort_by_key(|(name, _)| get_order_value(name));
    entries
}

/// Apply every migration. Scripts are idempotent, so this is safe on each start.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    for (name, sql) in ordered_migrations() {
        pool.execute(sql).await?;
        info!("Applied migration: {}", name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_run_before_indexes() {
        let names: Vec<&str> = ordered_migrations().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["001_create_camera_registrations.sql", "add_indexes.sql"]
        );
    }

    #[test]
    fn scripts_are_idempotent() {
        for (name, sql) in MIGRATIONS {
            assert!(
                sql.contains("IF NOT EXISTS"),
                "{} must be safe to re-run",
                name
            );
        }
    }
}
