use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::repository::default_m2_repository;

pub const REPO_ENV: &str = "POM_CLASS_FINDER_REPO";
pub const DB_ENV: &str = "POM_CLASS_FINDER_DB";

/// `--m2`, then `POM_CLASS_FINDER_REPO`, then settings.xml / `~/.m2/repository`.
pub fn resolve_m2_repo(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.m2.clone() {
        return Ok(p);
    }
    if let Some(p) = env_path(REPO_ENV) {
        return Ok(p);
    }
    default_m2_repository()
}

pub fn resolve_db_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(p) = cli.db.clone() {
        return Ok(p);
    }
    if let Some(p) = env_path(DB_ENV) {
        return Ok(p);
    }

    Ok(finder_home()?.join("db.lmdb"))
}

pub fn clear_db(db_path: &Path) -> Result<()> {
    remove_file_if_exists(db_path, "db")?;
    remove_file_if_exists(&lmdb_lock_path(db_path), "db lock")?;
    Ok(())
}

fn env_path(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn finder_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("pom-class-finder"))
}

fn lmdb_lock_path(db_path: &Path) -> PathBuf {
    let mut os = db_path.as_os_str().to_os_string();
    os.push("-lock");
    PathBuf::from(os)
}

fn remove_file_if_exists(path: &Path, kind: &str) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove {kind} file: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Commands;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn cli(m2: Option<&str>, db: Option<&str>) -> Cli {
        Cli {
            command: Commands::Stats,
            m2: m2.map(PathBuf::from),
            db: db.map(PathBuf::from),
            no_store: false,
        }
    }

    #[test]
    fn flags_win_over_everything() -> Result<()> {
        let cli = cli(Some("/opt/m2"), Some("/tmp/finder.lmdb"));
        assert_eq!(resolve_m2_repo(&cli)?, PathBuf::from("/opt/m2"));
        assert_eq!(resolve_db_path(&cli)?, PathBuf::from("/tmp/finder.lmdb"));
        Ok(())
    }

    #[test]
    fn default_db_lives_under_the_data_home() -> Result<()> {
        if env::var_os(DB_ENV).is_some() {
            return Ok(());
        }
        let path = resolve_db_path(&cli(None, None))?;
        assert!(path.ends_with("pom-class-finder/db.lmdb"));
        Ok(())
    }

    #[test]
    fn clear_removes_db_and_lock() -> Result<()> {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let dir = env::temp_dir().join(format!(
            "pom_class_finder_config_{}_{}",
            std::process::id(),
            nanos
        ));
        std::fs::create_dir_all(&dir)?;
        let db = dir.join("db.lmdb");
        std::fs::write(&db, b"data")?;
        std::fs::write(lmdb_lock_path(&db), b"lock")?;

        clear_db(&db)?;
        assert!(!db.exists());
        assert!(!lmdb_lock_path(&db).exists());
        // Clearing twice is fine.
        clear_db(&db)?;

        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}
