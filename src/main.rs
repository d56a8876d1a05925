mod archive;
mod metadata;
mod scan;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use walkdir::WalkDir;

use archive::Outcome;

#[derive(Parser)]
#[command(name = "media-archiver")]
#[command(about = "Archive media files into a content-addressed, date-sharded tree")]
struct Cli {
    /// Source directory to scan for media files
    source: PathBuf,
    /// Root of the organized archive
    dest: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli.source, &cli.dest) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Default)]
struct Summary {
    moved: usize,
    duplicates: usize,
    skipped: usize,
    failed: usize,
    pruned: usize,
}

fn run(source: &Path, dest: &Path) -> Result<(), archive::ArchiveError> {
    let mut summary = Summary::default();
    move_files(source, dest, &mut summary)?;
    prune_empty_dirs(source, &mut summary)?;
    println!(
        "{} moved, {} duplicates, {} skipped, {} failed, {} pruned",
        summary.moved, summary.duplicates, summary.skipped, summary.failed, summary.pruned
    );
    Ok(())
}

fn move_files(
    source: &Path,
    dest: &Path,
    summary: &mut Summary,
) -> Result<(), archive::ArchiveError> {
    for entry in WalkDir::new(source) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(media) = scan::classify(entry.path()) else {
            continue;
        };
        match archive::process_file(&media, dest)? {
            Outcome::Moved { dest } => {
                println!("MOVE {} -> {}", media.path.display(), dest.display());
                summary.moved += 1;
            }
            Outcome::NoTimestamp => {
                eprintln!("WARNING: no capture time in {}", media.path.display());
                summary.skipped += 1;
            }
            Outcome::Duplicate { existing } => {
                eprintln!(
                    "DUPLICATE {} (already archived as {})",
                    media.path.display(),
                    existing.display()
                );
                summary.duplicates += 1;
            }
            Outcome::Failed { error } => {
                eprintln!("ERROR: cannot archive {}: {}", media.path.display(), error);
                summary.failed += 1;
            }
        }
    }
    Ok(())
}

fn prune_empty_dirs(source: &Path, summary: &mut Summary) -> Result<(), archive::ArchiveError> {
    // Removal is deferred until the walk is over: deleting a directory the
    // walker has yielded but not yet descended into would fail the walk.
    let mut dirs = Vec::new();
    for entry in WalkDir::new(source) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    for dir in dirs {
        match archive::is_dir_empty(&dir) {
            Ok(true) => match fs::remove_dir(&dir) {
                Ok(()) => {
                    println!("PRUNE {} (empty)", dir.display());
                    summary.pruned += 1;
                }
                Err(err) => {
                    eprintln!("WARNING: cannot remove {}: {}", dir.display(), err);
                }
            },
            Ok(false) => {}
            Err(err) => {
                eprintln!("WARNING: cannot inspect {}: {}", dir.display(), err);
            }
        }
    }
    Ok(())
}
