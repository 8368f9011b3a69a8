//! webarc CLI - inspect and extract WARC (Web ARChive) files.
//!
//! Reads plain and gzip-compressed WARC files; gzip is selected by the
//! `.gz` extension or forced with `--gzip`.

mod utils;

use std::collections::BTreeMap;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use filetime::FileTime;
use serde::Serialize;

use utils::{create_progress_bar, output_name, print_records, record_matches};
use webarc_container::record::{FIELD_DATE, FIELD_TARGET_URI};
use webarc_container::{ContentBlock, Record, WarcContainer};
use webarc_core::source::{ByteRange, HandleCache};

#[derive(Parser)]
#[command(name = "webarc")]
#[command(author, version, about = "Inspect and extract WARC web archives")]
#[command(long_about = "
webarc reads WARC (Web ARChive) files, plain or gzip-compressed.

Examples:
  webarc list crawl.warc
  webarc list crawl.warc.gz --json
  webarc info crawl.warc
  webarc extract crawl.warc -o out
  webarc extract crawl.warc 0 2 -o out
  webarc test crawl.warc.gz
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the records in a WARC file
    #[command(alias = "l")]
    List {
        /// WARC file to list
        archive: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Include only records whose target URI matches pattern (glob syntax)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude records whose target URI matches pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        /// Force gzip decompression regardless of the file extension
        #[arg(short, long)]
        gzip: bool,
    },

    /// Show summary information about a WARC file
    #[command(alias = "i")]
    Info {
        /// WARC file to inspect
        archive: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Force gzip decompression regardless of the file extension
        #[arg(short, long)]
        gzip: bool,
    },

    /// Extract record payloads into files
    #[command(alias = "x")]
    Extract {
        /// WARC file to extract from
        archive: PathBuf,

        /// Record indices to extract (all if empty)
        records: Vec<usize>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Include only records whose target URI matches pattern (glob syntax)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude records whose target URI matches pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        /// Write content blocks exactly as stored instead of splitting off
        /// payloads
        #[arg(long)]
        preserve: bool,

        /// Show progress bar
        #[arg(short = 'P', long, default_value = "true")]
        progress: bool,

        /// Overwrite existing files without asking
        #[arg(short, long)]
        yes: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Force gzip decompression regardless of the file extension
        #[arg(short, long)]
        gzip: bool,
    },

    /// Parse a whole WARC file and report whether it is well formed
    #[command(alias = "t")]
    Test {
        /// WARC file to test
        archive: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Force gzip decompression regardless of the file extension
        #[arg(short, long)]
        gzip: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List {
            archive,
            verbose,
            json,
            include,
            exclude,
            gzip,
        } => cmd_list(&archive, verbose, json, &include, &exclude, gzip),
        Commands::Info {
            archive,
            json,
            gzip,
        } => cmd_info(&archive, json, gzip),
        Commands::Extract {
            archive,
            records,
            output,
            include,
            exclude,
            preserve,
            progress,
            yes,
            verbose,
            gzip,
        } => cmd_extract(
            &archive, &records, &output, &include, &exclude, preserve, progress, yes, verbose,
            gzip,
        ),
        Commands::Test {
            archive,
            verbose,
            gzip,
        } => cmd_test(&archive, verbose, gzip),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Read every record of the archive into a container.
fn load_container(
    archive: &Path,
    force_gzip: bool,
    preserve_block: bool,
) -> Result<WarcContainer, Box<dyn Error>> {
    let mut stream = WarcContainer::open(archive, force_gzip)?;
    let mut container = WarcContainer::new();
    loop {
        let (record, has_more) = WarcContainer::read_record(&mut stream, preserve_block)?;
        container.records.push(record);
        if !has_more {
            break;
        }
    }
    Ok(container)
}

/// One record of `list --json` output.
#[derive(Serialize)]
struct RecordSummary {
    index: usize,
    offset: u64,
    warc_type: Option<String>,
    record_id: Option<String>,
    target_uri: Option<String>,
    date: Option<String>,
    content_length: Option<u64>,
}

impl RecordSummary {
    fn new(index: usize, record: &Record) -> Self {
        Self {
            index,
            offset: record.file_offset,
            warc_type: record.warc_type().map(str::to_owned),
            record_id: record.record_id().map(str::to_owned),
            target_uri: record
                .header
                .fields
                .get(FIELD_TARGET_URI)
                .map(str::to_owned),
            date: record.header.fields.get(FIELD_DATE).map(str::to_owned),
            content_length: record.content_length().ok(),
        }
    }
}

fn cmd_list(
    archive: &Path,
    verbose: bool,
    json: bool,
    include: &[String],
    exclude: &[String],
    gzip: bool,
) -> Result<(), Box<dyn Error>> {
    let container = load_container(archive, gzip, false)?;

    let selected: Vec<(usize, &Record)> = container
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| record_matches(r, include, exclude))
        .collect();

    if json {
        #[derive(Serialize)]
        struct ListOutput {
            archive: String,
            records: Vec<RecordSummary>,
        }

        let output = ListOutput {
            archive: archive.display().to_string(),
            records: selected
                .iter()
                .map(|(i, r)| RecordSummary::new(*i, r))
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Archive: {}", archive.display());
    println!();
    print_records(&selected, verbose);

    Ok(())
}

fn cmd_info(archive: &Path, json: bool, gzip: bool) -> Result<(), Box<dyn Error>> {
    let metadata = std::fs::metadata(archive)?;
    let container = load_container(archive, gzip, false)?;

    let mut types: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_content_length = 0u64;
    for record in &container.records {
        let warc_type = record.warc_type().unwrap_or("(untyped)").to_string();
        *types.entry(warc_type).or_insert(0) += 1;
        total_content_length += record.content_length().unwrap_or(0);
    }

    if json {
        #[derive(Serialize)]
        struct InfoOutput {
            archive: String,
            file_size: u64,
            records: usize,
            types: BTreeMap<String, usize>,
            total_content_length: u64,
        }

        let output = InfoOutput {
            archive: archive.display().to_string(),
            file_size: metadata.len(),
            records: container.len(),
            types,
            total_content_length,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Archive Information");
    println!("===================");
    println!("File: {}", archive.display());
    println!("Size: {} bytes", metadata.len());
    println!();
    println!("Contents:");
    println!("  Records: {}", container.len());
    for (warc_type, count) in &types {
        println!("    {}: {}", warc_type, count);
    }
    println!("  Total content length: {} bytes", total_content_length);

    Ok(())
}

/// The byte range an extraction writes: the payload for blocks that carry
/// one, the whole block otherwise.
fn extraction_range(record: &Record) -> &ByteRange {
    match &record.content_block {
        ContentBlock::Binary(block) => &block.source,
        ContentBlock::WithPayload(block) => &block.payload,
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_extract(
    archive: &Path,
    records: &[usize],
    output: &Path,
    include: &[String],
    exclude: &[String],
    preserve: bool,
    progress: bool,
    yes: bool,
    verbose: bool,
    gzip: bool,
) -> Result<(), Box<dyn Error>> {
    let container = load_container(archive, gzip, preserve)?;

    for &index in records {
        if index >= container.len() {
            return Err(format!(
                "record index {} out of range ({} records)",
                index,
                container.len()
            )
            .into());
        }
    }

    let to_extract: Vec<(usize, &Record)> = container
        .records
        .iter()
        .enumerate()
        .filter(|(i, r)| {
            (records.is_empty() || records.contains(i)) && record_matches(r, include, exclude)
        })
        .collect();

    println!(
        "Extracting {} records from {} to {}",
        to_extract.len(),
        archive.display(),
        output.display()
    );

    std::fs::create_dir_all(output)?;
    let mut cache = HandleCache::default();

    let pb = create_progress_bar(to_extract.len() as u64, progress);
    pb.set_message("records");

    for (index, record) in to_extract {
        let file_path = output.join(output_name(record, index));

        if file_path.exists() && !yes {
            let overwrite = Confirm::new()
                .with_prompt(format!("Overwrite {}?", file_path.display()))
                .default(false)
                .interact()?;
            if !overwrite {
                pb.println(format!("  Skipped: {}", file_path.display()));
                pb.inc(1);
                continue;
            }
        }

        let range = extraction_range(record);
        let mut written = 0u64;
        {
            let mut writer = BufWriter::new(File::create(&file_path)?);
            for chunk in range.chunks(&mut cache)? {
                let chunk = chunk?;
                writer.write_all(&chunk)?;
                written += chunk.len() as u64;
            }
            writer.flush()?;
        }

        // Stamp the capture time onto the extracted file when the record
        // carries one.
        if let Ok(date) = record.date() {
            let mtime = FileTime::from_unix_time(date.timestamp(), date.timestamp_subsec_nanos());
            filetime::set_file_mtime(&file_path, mtime)?;
        }

        if verbose {
            pb.println(format!(
                "  Extracted: {} ({} bytes)",
                file_path.display(),
                written
            ));
        }
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    Ok(())
}

fn cmd_test(archive: &Path, verbose: bool, gzip: bool) -> Result<(), Box<dyn Error>> {
    let mut stream = WarcContainer::open(archive, gzip)?;

    println!("Testing {}", archive.display());

    let mut count = 0usize;
    loop {
        match WarcContainer::read_record(&mut stream, false) {
            Ok((record, has_more)) => {
                count += 1;
                if verbose {
                    println!("  OK: {}", record.record_id().unwrap_or("<no id>"));
                }
                if !has_more {
                    break;
                }
            }
            Err(e) => {
                println!();
                println!("Test results:");
                println!("  Records read: {}", count);
                println!("  FAILED: {}", e);
                std::process::exit(2);
            }
        }
    }

    println!();
    println!("Test results:");
    println!("  Records: {}", count);
    println!();
    println!("All records OK");
    Ok(())
}
