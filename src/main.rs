//! boc CLI - inspect, hash and re-encode bags of cells

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use boc::{deserialize_boc, parse_header, text, Config, Error, IoResultExt};

#[derive(Parser)]
#[command(name = "boc")]
#[command(about = "bag of cells codec - inspect, hash and re-encode cell trees")]
#[command(version)]
struct Cli {
    /// input encoding: binary, hex, base64
    #[arg(short = 'f', long, default_value = "binary", global = true)]
    input_format: String,

    /// log codec internals to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// show header fields
    Inspect {
        /// input file, `-` for stdin
        input: PathBuf,
    },

    /// print every root as an indented cell tree
    Tree {
        /// input file, `-` for stdin
        input: PathBuf,
    },

    /// print the hash of every root
    Hash {
        /// input file, `-` for stdin
        input: PathBuf,
    },

    /// decode and serialize the first root again
    Convert {
        /// input file, `-` for stdin
        input: PathBuf,

        /// output encoding: binary, hex, base64
        #[arg(short = 't', long, default_value = "hex")]
        output_format: String,

        /// output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// toml config with serialization defaults
        #[arg(short, long, env = "BOC_CONFIG")]
        config: Option<PathBuf>,

        /// omit the offset index
        #[arg(long)]
        no_index: bool,

        /// omit the crc32c trailer
        #[arg(long)]
        no_crc: bool,
    },
}

#[derive(Clone, Copy)]
enum Encoding {
    Binary,
    Hex,
    Base64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "boc=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> boc::Result<()> {
    let encoding = parse_encoding(&cli.input_format)?;

    match cli.command {
        Commands::Inspect { input } => {
            let data = read_input(&input, encoding)?;
            let header = parse_header(&data)?;

            println!("format: {}", header.format);
            println!("has index: {}", header.has_index);
            println!("has crc32c: {}", header.has_crc32);
            println!("has cache bits: {}", header.has_cache_bits);
            println!("flags: {}", header.flags);
            println!("size bytes: {}", header.size_bytes);
            println!("offset bytes: {}", header.offset_bytes);
            println!("cells: {}", header.cells_count);
            println!("roots: {}", header.roots_count);
            println!("absent: {}", header.absent_count);
            println!("cells size: {}", header.total_cells_size);
            let roots: Vec<String> = header.root_list.iter().map(|r| r.to_string()).collect();
            println!("root list: {}", roots.join(" "));
        }

        Commands::Tree { input } => {
            let data = read_input(&input, encoding)?;
            for root in deserialize_boc(&data)? {
                print!("{}", root.to_tree_string());
            }
        }

        Commands::Hash { input } => {
            let data = read_input(&input, encoding)?;
            for root in deserialize_boc(&data)? {
                println!("{}", root.hash());
            }
        }

        Commands::Convert {
            input,
            output_format,
            output,
            config,
            no_index,
            no_crc,
        } => {
            let out_encoding = parse_encoding(&output_format)?;
            let config = match config {
                Some(path) => Config::load(&path)?,
                None => Config::default(),
            };
            let mut opts = config.serialize;
            if no_index {
                opts.index = false;
            }
            if no_crc {
                opts.crc32 = false;
            }

            let data = read_input(&input, encoding)?;
            let roots = deserialize_boc(&data)?;
            let root = roots.first().ok_or(Error::NoRoots)?;
            let bytes = root.to_boc_with(&opts)?;

            let rendered = match out_encoding {
                Encoding::Binary => bytes,
                Encoding::Hex => (text::encode_hex(&bytes) + "\n").into_bytes(),
                Encoding::Base64 => (text::encode_base64(&bytes) + "\n").into_bytes(),
            };
            write_output(output.as_deref(), &rendered)?;
        }
    }

    Ok(())
}

fn parse_encoding(s: &str) -> boc::Result<Encoding> {
    match s.to_lowercase().as_str() {
        "binary" | "bin" => Ok(Encoding::Binary),
        "hex" => Ok(Encoding::Hex),
        "base64" | "b64" => Ok(Encoding::Base64),
        _ => Err(Error::InvalidEncoding(s.to_string())),
    }
}

fn read_input(path: &Path, encoding: Encoding) -> boc::Result<Vec<u8>> {
    let raw = if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).with_path("<stdin>")?;
        buf
    } else {
        fs::read(path).with_path(path)?
    };

    match encoding {
        Encoding::Binary => Ok(raw),
        Encoding::Hex => text::decode_hex(&String::from_utf8_lossy(&raw)),
        Encoding::Base64 => text::decode_base64(&String::from_utf8_lossy(&raw)),
    }
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> boc::Result<()> {
    match path {
        Some(path) => fs::write(path, bytes).with_path(path),
        None => io::stdout().write_all(bytes).with_path("<stdout>"),
    }
}
