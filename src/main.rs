use clap::{Parser, Subcommand};
use pakfile::{OpenMode, PackageFile, PackageHeader, HEADER_SIZE};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pakfile", about = "Single-file package container CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add files to a package, creating it if needed
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// Store entries relative to this directory instead of by their given path
        #[arg(short = 'C', long)]
        base: Option<PathBuf>,
        /// Skip inputs that are already in the package instead of failing
        #[arg(long)]
        skip_existing: bool,
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// List package contents
    List {
        input: PathBuf,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write one entry to stdout
    Cat {
        input: PathBuf,
        name: String,
    },
    /// Extract every entry
    Extract {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Show header fields
    Info {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, base, skip_existing, input } => {
            let mut pkg = PackageFile::new();
            pkg.open(&output, OpenMode::Write)?;
            for path in &input {
                let name = entry_name(path, base.as_deref())?;
                if skip_existing && pkg.contains(&name) {
                    println!("  skipped {}", path.display());
                    continue;
                }
                pkg.insert_entry_as(&name, path)?;
                println!("  packed  {}", path.display());
            }
            pkg.flush()?;
            println!("Wrote: {} ({} entries)", output.display(), pkg.len());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let pkg = open_read(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&pkg.list())?);
            } else {
                println!("Package: {}", input.display());
                println!("{:>5} {:>12} {:>12}  {:<8} {:<8} {:<8}  Name",
                         "Index", "Size", "Offset", "HashA", "HashB", "HashC");
                for info in pkg.list() {
                    println!("{:>5} {:>12} {:>12}  {:08x} {:08x} {:08x}  {}",
                        info.index, info.size, info.offset,
                        info.hash_a, info.hash_b, info.hash_c, info.name);
                }
            }
        }

        // ── Cat ──────────────────────────────────────────────────────────────
        Commands::Cat { input, name } => {
            let pkg = open_read(&input)?;
            let mut reader = pkg.reader(&name)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            io::copy(&mut reader, &mut out)?;
            out.flush()?;
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, output_dir } => {
            let pkg = open_read(&input)?;
            let n = pkg.extract_all(&output_dir)?;
            println!("Extracted {n} entries to: {}", output_dir.display());
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pkg = open_read(&input)?;
            let header: PackageHeader = *pkg.header()?;
            let payload: u64 = pkg.list().iter().map(|e| e.stored_size).sum();

            println!("── Package ──────────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Magic          {}", hex::encode(header.magic));
            println!("  Version        {}", header.version);
            println!("  Entries        {}", header.entry_count);
            println!("  Header size    {HEADER_SIZE} B");
            println!("  Payload bytes  {payload} B");
            println!("  Table offset   {} B", header.table_offset);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn open_read(path: &Path) -> Result<PackageFile, Box<dyn std::error::Error>> {
    let mut pkg = PackageFile::new();
    pkg.open(path, OpenMode::Read)?;
    Ok(pkg)
}

fn entry_name(path: &Path, base: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    let rel = match base {
        Some(base) => path.strip_prefix(base)?,
        None       => path,
    };
    rel.to_str()
        .map(str::to_owned)
        .ok_or_else(|| format!("not a UTF-8 path: {}", path.display()).into())
}
