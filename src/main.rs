use clap::{Parser, Subcommand};
use plank::archive::{decode, encode, inspect};
use plank::Config;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "plank", about = "Pack files into a single .plank archive")]
struct Cli {
    /// Print per-file diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack one or more files into a .plank archive
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// Compress every file with gzip
        #[arg(short, long)]
        compress: bool,
        /// Encrypt with AES-256 (random key unless -p or -k is given)
        #[arg(short, long)]
        encrypt: bool,
        /// Derive the key from a password (SHA-256)
        #[arg(short, long, conflicts_with = "key")]
        password: Option<String>,
        /// Hex-encoded 32-byte key
        #[arg(short, long)]
        key: Option<String>,
        /// Do not record per-file SHA-256 digests
        #[arg(long)]
        no_digests: bool,
        #[arg(short = 'f', long = "file", required = true, num_args = 1..)]
        files: Vec<PathBuf>,
    },
    /// Unpack a .plank archive
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        #[arg(short, long, conflicts_with = "key")]
        password: Option<String>,
        #[arg(short, long)]
        key: Option<String>,
        /// Check every file against its stored SHA-256 digest
        #[arg(short = 's', long)]
        verify: bool,
    },
    /// List archive contents
    List {
        input: PathBuf,
        /// Print the header and manifest as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Resolve the run configuration for the selected subcommand.
    fn config(&self) -> Config {
        let base = Config { verbose: self.verbose, ..Default::default() };
        match &self.command {
            Commands::Pack { output, compress, encrypt, password, key, no_digests, .. } => Config {
                compress:    *compress,
                encrypt:     *encrypt,
                key:         key.clone(),
                no_digests:  *no_digests,
                output_path: Some(output.clone()),
                ..base
            }
            .with_password(password.as_deref()),
            Commands::Unpack { output_dir, password, key, verify, .. } => Config {
                verify:      *verify,
                key:         key.clone(),
                output_path: Some(output_dir.clone()),
                ..base
            }
            .with_password(password.as_deref()),
            Commands::List { .. } => base,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = cli.config();

    tracing_subscriber::fmt()
        .with_max_level(cfg.log_level())
        .with_writer(std::io::stderr)
        .init();

    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { files, .. } => {
            let output = cfg.output_path.as_deref().ok_or("pack needs an output path")?;

            let mut names = Vec::with_capacity(files.len());
            let mut contents = Vec::with_capacity(files.len());
            for path in &files {
                let data = std::fs::read(path)?;
                names.push(base_name(path)?);
                println!("  packed  {} ({} bytes)", path.display(), data.len());
                contents.push(data);
            }

            let packed = encode(&contents, &names, &cfg.encode_options()?)?;
            if let Some(key) = &packed.generated_key {
                println!("Generated key (required to unpack): {}", key.to_hex());
            }

            println!("Writing to {}", output.display());
            std::fs::write(output, &packed.bytes)?;
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, .. } => {
            let output_dir = cfg.output_path.as_deref().unwrap_or(Path::new("."));

            let bytes = std::fs::read(&input)?;
            let out = decode(&bytes, &cfg.decode_options()?)?;

            if !output_dir.exists() { std::fs::create_dir_all(output_dir)?; }
            for (name, data) in out.into_pairs() {
                let target = output_dir.join(base_name(Path::new(&name))?);
                println!("Writing to {}", target.display());
                std::fs::write(&target, &data)?;
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let info = inspect(&std::fs::read(&input)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
                return Ok(());
            }
            let flags = info.header.flags;
            println!("Archive: {}", input.display());
            println!("  Version {}  compressed={} encrypted={} verifiable={}",
                info.header.version, flags.compressed(), flags.encrypted(), flags.verifiable());
            println!("{:<26} {:>12} {:>12}  Digest", "Name", "Size", "Stored");
            for (i, rec) in info.manifest.records.iter().enumerate() {
                let name = rec.filename.clone().unwrap_or_else(|| i.to_string());
                let digest = rec.digest
                    .map(|d| hex::encode(&d[..6]))
                    .unwrap_or_else(|| "—".into());
                println!("{:<26} {:>12} {:>12}  {}", name, rec.original_size, rec.stored_size, digest);
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// Final path component only; stored names never escape the output directory.
fn base_name(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("no file name in {}", path.display()).into())
}
