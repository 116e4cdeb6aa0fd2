//! Source inspection commands: `check`, `entities`, `users`.

use anyhow::Result;
use std::path::Path;

use profile_harvest_core::batch::batch_count;
use profile_harvest_core::entity::{find, EntitySpec, REGISTRY};

use crate::config::{Config, DatabaseConfig};
use crate::db::{self, Databases};
use crate::users::discover_users;

/// Probe both databases with `SELECT 1` and print a status table.
///
/// Returns an error if either database is unhealthy, after printing
/// the full table.
pub async fn check_sources(config: &Config) -> Result<()> {
    let primary = probe(&config.primary).await;
    let secondary = probe(&config.secondary).await;

    println!("{:<16} {:<12} HEALTHY", "DATABASE", "STATUS");
    let mut healthy = true;
    for (name, status) in [("primary", &primary), ("secondary", &secondary)] {
        match status {
            Ok(()) => println!("{:<16} {:<12} true", name, "OK"),
            Err(e) => {
                healthy = false;
                println!("{:<16} {:<12} false", name, "UNREACHABLE");
                tracing::warn!(database = name, error = %e, "health check failed");
            }
        }
    }

    if !healthy {
        anyhow::bail!("one or more databases are unreachable");
    }
    Ok(())
}

async fn probe(db: &DatabaseConfig) -> Result<()> {
    let pool = db::connect(db).await?;
    let result = sqlx::query("SELECT 1").execute(&pool).await;
    pool.close().await;
    result?;
    Ok(())
}

/// Print one entity type by name, or the whole registry.
pub fn show_entities(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => match find(name) {
            Some(spec) => print_entity(spec),
            None => anyhow::bail!("unknown entity type: {}", name),
        },
        None => list_entities(REGISTRY),
    }
    Ok(())
}

/// Print every entity in `registry` with its columns and lookups.
pub fn list_entities(registry: &[EntitySpec]) {
    for entity in registry {
        print_entity(entity);
    }
    println!("{} entities", registry.len());
}

fn print_entity(entity: &EntitySpec) {
    println!("{}", entity.name);
    println!("  columns: {}", entity.output_fields().join(", "));
    for lookup in entity.lookups {
        println!(
            "  lookup: {} -> {}.{} as {}",
            lookup.column, lookup.table, lookup.label_column, lookup.target
        );
    }
    for code in entity.codes {
        println!("  code: {} ({})", code.column, code.kind.name());
    }
}

/// Resolve the run's users and print how many batches they form.
pub async fn list_users(config: &Config, input: Option<&Path>, list: bool) -> Result<()> {
    let dbs = Databases::connect(config).await?;
    let result = discover_users(&dbs.primary, config, input).await;
    dbs.close().await;
    let user_ids = result?;

    if list {
        for id in &user_ids {
            println!("{}", id);
        }
    } else {
        println!("users");
        println!("  count: {}", user_ids.len());
        println!(
            "  batches: {} (batch size {})",
            batch_count(user_ids.len(), config.extract.batch_size),
            config.extract.batch_size
        );
        println!("ok");
    }
    Ok(())
}

/// Check every registered entity definition. Run at startup.
pub fn validate_registry() -> Result<()> {
    for entity in REGISTRY {
        entity.validate()?;
    }
    Ok(())
}
