//! Batch export: user ids → composite documents → output artifact.
//!
//! Each batch is assembled in full and then appended to the output as
//! one JSON array. A batch that fails is never written, so the output
//! holds only complete batches; the error names the batch to resume
//! from with `--start-batch`.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use profile_harvest_core::batch::{batch_count, batches};
use profile_harvest_core::entity::{EntitySpec, REGISTRY};
use profile_harvest_core::lookup::LookupResolver;
use profile_harvest_core::models::UserId;
use profile_harvest_core::source::{LookupSource, PrimarySource};
use profile_harvest_core::Assembler;

use crate::config::Config;
use crate::db::Databases;
use crate::pg_source::{PgLookup, PgPrimary};
use crate::progress::{ExportProgressEvent, ExportProgressReporter, ProgressMode};
use crate::users::discover_users;

/// Command-line overrides for one export run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// CSV of user UUIDs, overriding `[input]`.
    pub input: Option<PathBuf>,
    /// Overrides `extract.batch_size`.
    pub batch_size: Option<usize>,
    /// Number of leading batches to skip.
    pub start_batch: usize,
    /// Truncate the user list to this many ids.
    pub limit: Option<usize>,
    pub dry_run: bool,
    pub progress: ProgressMode,
}

/// Knobs for [`export_batches`].
#[derive(Debug, Clone, Copy)]
pub struct ExportSettings {
    pub batch_size: usize,
    pub start_batch: usize,
    pub cache_lookups: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub batches_total: usize,
    pub batches_written: usize,
    pub documents: usize,
}

/// Run a full export against the configured databases.
pub async fn run_export(config: &Config, opts: RunOptions) -> Result<()> {
    let run_id = Uuid::new_v4();
    let batch_size = opts.batch_size.unwrap_or(config.extract.batch_size);
    if batch_size == 0 {
        anyhow::bail!("--batch-size must be > 0");
    }
    info!(%run_id, batch_size, "starting export");

    let reporter = opts.progress.reporter();
    let dbs = Databases::connect(config).await?;
    let result = export_with(&dbs, config, &opts, batch_size, reporter.as_ref()).await;
    dbs.close().await;

    match &result {
        Ok(_) => info!(%run_id, "export finished"),
        Err(e) => warn!(%run_id, error = %e, "export aborted"),
    }
    result
}

async fn export_with(
    dbs: &Databases,
    config: &Config,
    opts: &RunOptions,
    batch_size: usize,
    reporter: &dyn ExportProgressReporter,
) -> Result<()> {
    reporter.report(ExportProgressEvent::Discovering);
    let mut user_ids = discover_users(&dbs.primary, config, opts.input.as_deref()).await?;
    if let Some(limit) = opts.limit {
        user_ids.truncate(limit);
    }
    let total = batch_count(user_ids.len(), batch_size);

    if opts.dry_run {
        println!("run (dry-run)");
        println!("  users: {}", user_ids.len());
        println!("  batches: {}", total);
        println!("  starting at batch: {}", opts.start_batch);
        return Ok(());
    }

    let primary = PgPrimary::new(dbs.primary.clone());
    let lookup = PgLookup::new(dbs.secondary.clone());
    let mut out = open_output(&config.output.path)?;
    let settings = ExportSettings {
        batch_size,
        start_batch: opts.start_batch,
        cache_lookups: config.extract.cache_lookups,
    };

    let summary = export_batches(
        &primary,
        &lookup,
        REGISTRY,
        &user_ids,
        settings,
        &mut out,
        reporter,
    )
    .await?;

    println!("run");
    println!("  users: {}", user_ids.len());
    println!(
        "  batches written: {} / {}",
        summary.batches_written, summary.batches_total
    );
    println!("  documents: {}", summary.documents);
    println!("  output: {}", config.output.path.display());
    println!("ok");
    Ok(())
}

/// An append-only output that can be cut back to an earlier length.
///
/// A batch whose write fails is rolled back with [`Artifact::truncate_to`],
/// so the artifact only ever holds whole batches.
pub trait Artifact: Write {
    /// Current length in bytes.
    fn byte_len(&mut self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Artifact for File {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Artifact for Vec<u8> {
    fn byte_len(&mut self) -> io::Result<u64> {
        Ok(Vec::len(self) as u64)
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        Vec::truncate(self, len as usize);
        Ok(())
    }
}

/// Append one serialized batch, or leave the artifact as it was.
fn append_batch<W: Artifact + ?Sized>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    let start = out.byte_len()?;
    let written = out.write_all(bytes).and_then(|_| out.flush());
    if let Err(e) = written {
        if let Err(rollback) = out.truncate_to(start) {
            warn!(error = %rollback, "could not remove partial batch from output");
        }
        return Err(e);
    }
    Ok(())
}

/// Open the output artifact for appending, creating it if needed.
pub fn open_output(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))
}

/// Assemble and write every batch from `settings.start_batch` on.
///
/// Batches run strictly one after another. Each batch is serialized in
/// full, then appended and flushed before the next begins.
pub async fn export_batches<P, L, W>(
    primary: &P,
    lookup: &L,
    registry: &[EntitySpec],
    user_ids: &[UserId],
    settings: ExportSettings,
    out: &mut W,
    reporter: &dyn ExportProgressReporter,
) -> Result<ExportSummary>
where
    P: PrimarySource + ?Sized,
    L: LookupSource + ?Sized,
    W: Artifact + ?Sized,
{
    let resolver = if settings.cache_lookups {
        LookupResolver::cached(lookup)
    } else {
        LookupResolver::new(lookup)
    };
    let mut assembler = Assembler::new(primary, resolver, registry);

    let mut summary = ExportSummary {
        batches_total: batch_count(user_ids.len(), settings.batch_size),
        ..Default::default()
    };

    let all = batches(user_ids, settings.batch_size)?;
    for (idx, batch) in all.enumerate().skip(settings.start_batch) {
        let resume = || {
            format!(
                "batch {} failed; nothing was written for it (resume with --start-batch {})",
                idx, idx
            )
        };
        let documents = assembler.assemble(batch).await.with_context(resume)?;
        let bytes = serde_json::to_vec(&documents).with_context(resume)?;
        append_batch(out, &bytes).with_context(resume)?;

        summary.batches_written += 1;
        summary.documents += documents.len();
        info!(batch = idx, users = batch.len(), "batch written");
        reporter.report(ExportProgressEvent::BatchWritten {
            n: idx as u64 + 1,
            total: summary.batches_total as u64,
            users: batch.len() as u64,
        });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use profile_harvest_core::entity::LookupSpec;
    use profile_harvest_core::source::memory::{MemoryLookup, MemoryPrimary};
    use serde_json::{json, Value};

    const SKILLS: EntitySpec = EntitySpec {
        name: "user_skills",
        query: "",
        columns: &["user_id", "skill_name"],
        lookups: &[],
        codes: &[],
    };
    const SUBJECTS: EntitySpec = EntitySpec {
        name: "user_subject_interests",
        query: "",
        columns: &["user_id", "subject_id"],
        lookups: &[LookupSpec::named("subject_id", "subjects", "subject")],
        codes: &[],
    };

    fn settings(batch_size: usize) -> ExportSettings {
        ExportSettings {
            batch_size,
            start_batch: 0,
            cache_lookups: false,
        }
    }

    fn ids(range: std::ops::RangeInclusive<i64>) -> Vec<UserId> {
        range.map(UserId::Int).collect()
    }

    fn arrays(out: &[u8]) -> Vec<Value> {
        serde_json::Deserializer::from_slice(out)
            .into_iter::<Value>()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_array_per_batch() {
        let primary = MemoryPrimary::new().with_rows(
            "user_skills",
            vec![vec![json!(1), json!("Algebra")], vec![json!(3), json!("Poetry")]],
        );
        let lookup = MemoryLookup::new();
        let mut out = Vec::new();
        let summary = export_batches(
            &primary,
            &lookup,
            &[SKILLS],
            &ids(1..=5),
            settings(2),
            &mut out,
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            ExportSummary {
                batches_total: 3,
                batches_written: 3,
                documents: 5
            }
        );
        let arrays = arrays(&out);
        assert_eq!(arrays.len(), 3);
        assert_eq!(arrays[0][0], json!({"user_id": 1, "user_skills": [{"skill_name": "Algebra"}]}));
        assert_eq!(arrays[1][0]["user_id"], json!(3));
        assert_eq!(arrays[2].as_array().unwrap().len(), 1);
        assert_eq!(primary.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_start_batch_skips() {
        let primary = MemoryPrimary::new();
        let lookup = MemoryLookup::new();
        let mut out = Vec::new();
        let summary = export_batches(
            &primary,
            &lookup,
            &[SKILLS],
            &ids(1..=5),
            ExportSettings {
                start_batch: 2,
                ..settings(2)
            },
            &mut out,
            &NoProgress,
        )
        .await
        .unwrap();
        assert_eq!(summary.batches_written, 1);
        assert_eq!(arrays(&out)[0][0]["user_id"], json!(5));
    }

    #[tokio::test]
    async fn test_failed_batch_writes_nothing() {
        let primary = MemoryPrimary::new()
            .with_rows("user_subject_interests", vec![vec![json!(1), json!("s1")]]);
        // No `subjects` table: the lookup for the first batch fails.
        let lookup = MemoryLookup::new();
        let mut out = Vec::new();
        let err = export_batches(
            &primary,
            &lookup,
            &[SKILLS, SUBJECTS],
            &ids(1..=2),
            settings(1),
            &mut out,
            &NoProgress,
        )
        .await
        .unwrap_err();
        assert!(out.is_empty());
        assert!(err.to_string().contains("--start-batch 0"));
    }

    #[tokio::test]
    async fn test_cached_lookups_fetch_once_per_run() {
        let primary = MemoryPrimary::new().with_rows(
            "user_subject_interests",
            vec![vec![json!(1), json!("s1")], vec![json!(2), json!("s2")]],
        );
        let lookup = MemoryLookup::new().with_table(
            "subjects",
            vec![(json!("s1"), json!("Physics")), (json!("s2"), json!("Art"))],
        );
        let mut out = Vec::new();
        export_batches(
            &primary,
            &lookup,
            &[SUBJECTS],
            &ids(1..=2),
            ExportSettings {
                cache_lookups: true,
                ..settings(1)
            },
            &mut out,
            &NoProgress,
        )
        .await
        .unwrap();
        assert_eq!(lookup.calls(), vec!["subjects"]);
        let arrays = arrays(&out);
        assert_eq!(arrays[1][0]["user_subject_interests"][0]["subject"], json!("Art"));
    }

    /// Accepts `capacity` bytes, then fails like a full disk.
    struct FullDisk {
        data: Vec<u8>,
        capacity: usize,
        writes: usize,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            let room = self.capacity - self.data.len();
            if room == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "No space left on device"));
            }
            let n = room.min(buf.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Artifact for FullDisk {
        fn byte_len(&mut self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_partial_batch() {
        let primary = MemoryPrimary::new().with_rows(
            "user_skills",
            vec![vec![json!(1), json!("Algebra")], vec![json!(2), json!("Poetry")]],
        );
        let lookup = MemoryLookup::new();
        let mut first = Vec::new();
        export_batches(
            &primary,
            &lookup,
            &[SKILLS],
            &ids(1..=1),
            settings(1),
            &mut first,
            &NoProgress,
        )
        .await
        .unwrap();

        // Room for the first batch and part of the second.
        let mut out = FullDisk {
            data: Vec::new(),
            capacity: first.len() + 10,
            writes: 0,
        };
        let err = export_batches(
            &primary,
            &lookup,
            &[SKILLS],
            &ids(1..=2),
            settings(1),
            &mut out,
            &NoProgress,
        )
        .await
        .unwrap_err();

        assert_eq!(out.data, first);
        assert_eq!(arrays(&out.data).len(), 1);
        assert!(err.to_string().contains("--start-batch 1"));
        assert!(format!("{:#}", err).contains("No space left on device"));
        // First batch in one write; the second is cut short, then refused.
        assert_eq!(out.writes, 3);
    }

    #[test]
    fn test_append_batch_rolls_back_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        let mut file = open_output(&path).unwrap();
        append_batch(&mut file, b"[1]").unwrap();
        assert_eq!(file.byte_len().unwrap(), 3);
        file.truncate_to(1).unwrap();
        append_batch(&mut file, b"2]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[2]");
    }

    #[test]
    fn test_open_output_appends() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested/data.json");
        open_output(&path).unwrap().write_all(b"[1]").unwrap();
        open_output(&path).unwrap().write_all(b"[2]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1][2]");
    }
}
