use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kdb_runner::{Config, Runner};
use kdb_tree::RetentionTree;

const EXIT_USAGE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_BACKUP_DIR: u8 = 3;
const EXIT_PARTIAL: u8 = 4;

/// Backup libvirt domains to local XML files
#[derive(Parser, Debug)]
#[command(name = "kvm-domain-backup", version)]
struct Cli {
    /// Backup directory
    #[arg(value_name = "backup-dir", default_value = ".")]
    backup_dir: PathBuf,

    /// Configuration file
    #[arg(short, long, value_name = "config-file")]
    config: PathBuf,

    /// Log every file moved, discarded and written
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn open_tree(dir: &Path) -> Result<RetentionTree> {
    std::fs::create_dir_all(dir).with_context(|| format!("create backup dir {}", dir.display()))?;
    let tree = RetentionTree::initialize(dir).context("cannot create backup tree")?;
    Ok(tree)
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version come through here too
            let code = if e.use_stderr() { ExitCode::from(EXIT_USAGE) } else { ExitCode::SUCCESS };
            let _ = e.print();
            return code;
        }
    };
    init_tracing(cli.verbose);

    let cfg = match Config::load_from(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let hosts = match cfg.hosts() {
        Ok(hosts) => hosts,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let tree = match open_tree(&cli.backup_dir) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::from(EXIT_BACKUP_DIR);
        }
    };

    let runner = Runner::open(tree, &cfg);
    info!("starting backup run {}", runner.run_id);
    let report = runner.run(&hosts);
    if report.has_failures() {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn backup_dir_defaults_to_cwd() {
        let cli = Cli::try_parse_from(["kvm-domain-backup", "-c", "cfg.json"]).unwrap();
        assert_eq!(cli.backup_dir, PathBuf::from("."));
        assert!(!cli.verbose);
    }

    #[test]
    fn config_flag_is_required() {
        let err = Cli::try_parse_from(["kvm-domain-backup", "/srv/backup"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn open_tree_creates_missing_root() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested/backups");
        let tree = open_tree(&root).unwrap();
        assert!(tree.quarantine_dir().is_dir());
    }

    #[test]
    fn open_tree_fails_on_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        assert!(open_tree(&file).is_err());
    }
}
