//! Handoff archive

use crate::error::{Result, TaskError, TaskResult};
use crate::runner::Context;
use crate::tasks::TaskOutput;
use crate::utils::{compile_glob_set, to_slash};
use anyhow::Context as _;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files under `root` that belong in the archive, relative and sorted.
///
/// Excluded directories written as `dir/**` are pruned without being walked.
/// Dotfiles are included. The archive itself is never an entry. Symlinks are
/// followed; unreadable directories and symlink loops fail the walk.
pub fn archive_entries(
    root: &Path,
    excludes: &[String],
    archive_name: &str,
) -> Result<Vec<PathBuf>> {
    let exclude_set = compile_glob_set(excludes)?;
    let pruned: Vec<&str> = excludes
        .iter()
        .filter_map(|pattern| pattern.strip_suffix("/**"))
        .collect();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            match entry.path().strip_prefix(root) {
                Ok(rel) => !pruned.contains(&to_slash(rel).as_str()),
                Err(_) => true,
            }
        });

    let mut entries = Vec::new();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let rel_slash = to_slash(rel);
        if rel_slash == archive_name || exclude_set.is_match(&rel_slash) {
            continue;
        }
        entries.push(rel.to_path_buf());
    }

    entries.sort_by_key(|p| to_slash(p));
    Ok(entries)
}

/// Write `entries` (relative to `root`) into a deflated zip at `dest`
pub fn write_archive(root: &Path, entries: &[PathBuf], dest: &Path) -> anyhow::Result<()> {
    let file = File::create(dest).with_context(|| format!("creating {}", dest.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in entries {
        let name = to_slash(entry);
        zip.start_file(name.as_str(), options)
            .with_context(|| format!("adding {}", name))?;
        let mut source = File::open(root.join(entry))
            .with_context(|| format!("reading {}", entry.display()))?;
        io::copy(&mut source, &mut zip).with_context(|| format!("compressing {}", name))?;
    }

    zip.finish().context("finalizing archive")?;
    Ok(())
}

/// Package the project tree into the archive at the project root
pub async fn package(task: &str, ctx: &Context) -> TaskResult<TaskOutput> {
    let root = ctx.root.clone();
    let archive_name = ctx.config.paths.archive.clone();
    let excludes = ctx.config.paths.archive_exclude.clone();
    let dest = ctx.resolve(&archive_name);

    let written = dest.clone();
    let count = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
        let entries = archive_entries(&root, &excludes, &archive_name)?;
        write_archive(&root, &entries, &dest)?;
        Ok(entries.len())
    })
    .await
    .map_err(|e| TaskError::transform(task, "zip", e))?
    .map_err(|e| TaskError::transform(task, "zip", format!("{:#}", e)))?;

    tracing::info!(task, entries = count, archive = %written.display(), "packaged");
    Ok(TaskOutput::new(vec![written]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn default_excludes() -> Vec<String> {
        PipelineConfig::default().paths.archive_exclude
    }

    fn project() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        for dir in [".git/objects", "build/css", "node_modules/sass", "scss", "images"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::write(root.join(".git/objects/ab"), "obj").unwrap();
        fs::write(root.join("build/css/styles.css"), "css").unwrap();
        fs::write(root.join("node_modules/sass/index.js"), "js").unwrap();
        fs::write(root.join("scss/styles.scss"), "scss").unwrap();
        fs::write(root.join("images/logo.png"), "png").unwrap();
        fs::write(root.join("index.html"), "html").unwrap();
        fs::write(root.join(".env"), "S3_BUCKET=x").unwrap();
        temp_dir
    }

    #[test]
    fn test_archive_entries_exclusions() {
        let temp_dir = project();
        fs::write(temp_dir.path().join("archive.zip"), "old").unwrap();

        let entries = archive_entries(temp_dir.path(), &default_excludes(), "archive.zip").unwrap();
        let names: Vec<String> = entries.iter().map(|p| to_slash(p)).collect();
        assert_eq!(
            names,
            vec![".env", "images/logo.png", "index.html", "scss/styles.scss"]
        );
    }

    #[test]
    fn test_archive_entries_file_glob_exclude() {
        let temp_dir = project();
        let mut excludes = default_excludes();
        excludes.push("**/*.png".to_string());

        let entries = archive_entries(temp_dir.path(), &excludes, "archive.zip").unwrap();
        assert!(!entries.iter().any(|p| p.ends_with("logo.png")));
    }

    #[tokio::test]
    async fn test_package_writes_zip() {
        let temp_dir = project();
        let ctx = Context::new(temp_dir.path().to_path_buf(), PipelineConfig::default());

        let output = package("zip", &ctx).await.unwrap();
        let archive = temp_dir.path().join("archive.zip");
        assert_eq!(output.files, vec![archive.clone()]);

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let names: Vec<String> = zip.file_names().map(String::from).collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"scss/styles.scss".to_string()));
        assert!(!names.iter().any(|n| n.starts_with("build/")));

        let mut contents = String::new();
        zip.by_name("index.html")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "html");
    }

    #[tokio::test]
    async fn test_package_twice_skips_previous_archive() {
        let temp_dir = project();
        let ctx = Context::new(temp_dir.path().to_path_buf(), PipelineConfig::default());

        package("zip", &ctx).await.unwrap();
        package("zip", &ctx).await.unwrap();

        let archive = temp_dir.path().join("archive.zip");
        let zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert!(!zip.file_names().any(|n| n == "archive.zip"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_package_fails_on_symlink_loop() {
        let temp_dir = project();
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("scss/root")).unwrap();
        let ctx = Context::new(temp_dir.path().to_path_buf(), PipelineConfig::default());

        let err = package("zip", &ctx).await.unwrap_err();
        assert_eq!(err.stage(), Some("zip"));
        assert!(!temp_dir.path().join("archive.zip").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_excluded_symlink_loop_is_not_walked() {
        let temp_dir = project();
        std::os::unix::fs::symlink(temp_dir.path(), temp_dir.path().join("node_modules/root"))
            .unwrap();

        assert!(archive_entries(temp_dir.path(), &default_excludes(), "archive.zip").is_ok());
    }
}
