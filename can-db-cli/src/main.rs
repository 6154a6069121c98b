//! CAN DB CLI Application
//!
//! Command-line front end for the can-db-core library:
//! - Import a DBC file into per-message YAML files
//! - Generate C parsing code from YAML message definitions
//! - Decode a raw frame against a message definition
//! - Show messages/signals with bit tokens in either numbering mode

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use can_db_core::bitrange::{encode_bits, NumberingMode};
use can_db_core::codegen::{export_c, CodegenConfig};
use can_db_core::formatter::format_signal;
use can_db_core::io::{dbc, yaml};
use can_db_core::MessageDatabase;

/// CAN DB - manage CAN signal databases and generate parsing code
#[derive(Parser, Debug)]
#[command(name = "can-db-cli")]
#[command(about = "Import, convert and export CAN message databases", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a DBC file into per-message YAML files
    ImportDbc {
        /// Path to the DBC file
        dbc: PathBuf,

        /// Output directory for the YAML files
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Source tag recorded in exported comments
        #[arg(long, value_name = "TAG")]
        comment_src: Option<String>,
    },

    /// Generate C structs and parse functions from YAML messages
    ExportC {
        /// YAML message files
        #[arg(required = true)]
        yml: Vec<PathBuf>,

        /// Base name for the generated files
        #[arg(short, long, value_name = "NAME")]
        name: String,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Code generation settings (config.toml)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Decode raw frame bytes against a message definition
    Decode {
        /// YAML message files
        #[arg(required = true)]
        yml: Vec<PathBuf>,

        /// Frame ID of the message, hex (e.g. 0x0F6)
        #[arg(long, value_name = "ID")]
        id: String,

        /// Frame data bytes as hex (e.g. AB12FF00)
        #[arg(long, value_name = "HEX")]
        data: String,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List messages and signals
    Show {
        /// YAML message files
        #[arg(required = true)]
        yml: Vec<PathBuf>,

        /// Bit numbering mode for the displayed tokens
        #[arg(long, value_enum, default_value_t = Mode::Native)]
        mode: Mode,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Native,
    Logical,
}

impl From<Mode> for NumberingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Native => NumberingMode::Native,
            Mode::Logical => NumberingMode::Logical,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    log::info!("CAN DB CLI v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::ImportDbc {
            dbc,
            out,
            comment_src,
        } => import_dbc(&dbc, &out, comment_src.as_deref()),
        Command::ExportC {
            yml,
            name,
            out,
            config,
        } => export_code(&yml, &name, &out, config.as_deref()),
        Command::Decode { yml, id, data, json } => decode(&yml, &id, &data, json),
        Command::Show { yml, mode } => show(&yml, mode.into()),
    }
}

/// Load YAML message files into a database, skipping unreadable files
fn load_database(paths: &[PathBuf]) -> Result<MessageDatabase> {
    let mut db = MessageDatabase::new();

    for path in paths {
        let message = yaml::read_message_file(path)
            .with_context(|| format!("failed to load {:?}", path))?;
        if !db.add_message(message) {
            log::warn!("Duplicate frame ID in {:?}, keeping the first definition", path);
        }
    }

    let stats = db.stats();
    log::info!(
        "Loaded {} messages, {} signals",
        stats.num_messages,
        stats.num_signals
    );
    Ok(db)
}

fn import_dbc(dbc_path: &PathBuf, out: &PathBuf, comment_src: Option<&str>) -> Result<()> {
    let messages = dbc::parse_dbc_file(dbc_path)?;
    std::fs::create_dir_all(out)?;

    let mut db = MessageDatabase::new();
    let outcome = db.merge(messages);

    for message in db.iter() {
        yaml::write_message_file(out, message, comment_src)?;
    }

    println!(
        "Imported {} messages ({} duplicates skipped) into {:?}",
        outcome.added, outcome.skipped, out
    );
    Ok(())
}

fn export_code(
    yml: &[PathBuf],
    name: &str,
    out: &PathBuf,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {:?}", path))?;
            toml::from_str(&text).with_context(|| format!("bad codegen config {:?}", path))?
        }
        None => CodegenConfig::default(),
    };

    let db = load_database(yml)?;
    let messages: Vec<_> = db.iter().collect();
    let files = export_c(&messages, name, &config);

    std::fs::create_dir_all(out)?;
    std::fs::write(out.join(format!("{}_messages.h", name)), files.messages_header)?;
    std::fs::write(out.join(format!("{}.h", name)), files.header)?;
    std::fs::write(out.join(format!("{}.c", name)), files.source)?;

    println!("Generated {}.c, {}.h and {}_messages.h in {:?}", name, name, name, out);
    Ok(())
}

fn decode(yml: &[PathBuf], id: &str, data: &str, json: bool) -> Result<()> {
    let db = load_database(yml)?;

    let frame_id = u32::from_str_radix(id.trim().trim_start_matches("0x"), 16)
        .with_context(|| format!("bad frame ID '{}'", id))?;
    let bytes = parse_hex_bytes(data)?;

    let Some(message) = db.get(frame_id) else {
        bail!("no message with frame ID 0x{:X} loaded", frame_id);
    };

    if json {
        let decoded: serde_json::Map<String, serde_json::Value> = message
            .signals
            .iter()
            .map(|signal| {
                (
                    signal.name.clone(),
                    serde_json::Value::String(format_signal(&bytes, signal).to_string()),
                )
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&decoded)?);
    } else {
        println!("{} (0x{:X})", message.name, message.frame_id);
        for signal in &message.signals {
            let value = format_signal(&bytes, signal);
            let unit = signal.unit.as_deref().unwrap_or("");
            println!("  {:<24} {} {}", signal.name, value, unit);
        }
    }

    Ok(())
}

fn show(yml: &[PathBuf], mode: NumberingMode) -> Result<()> {
    let db = load_database(yml)?;

    for message in db.iter() {
        println!(
            "0x{:03X} {} ({} bytes, {} signals)",
            message.frame_id,
            message.name,
            message.length,
            message.signals.len()
        );
        for signal in &message.signals {
            println!(
                "  {:<10} {:<24} x{} {:+}",
                encode_bits(signal.start, signal.length, mode),
                signal.name,
                signal.scale,
                signal.offset
            );
        }
    }

    Ok(())
}

fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !cleaned.is_ascii() {
        bail!("bad hex byte in '{}'", text);
    }
    if cleaned.len() % 2 != 0 {
        bail!("odd number of hex digits in '{}'", text);
    }

    (0..cleaned.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&cleaned[i..i + 2], 16)
                .with_context(|| format!("bad hex byte in '{}'", text))
        })
        .collect()
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("AB12ff00").unwrap(), vec![0xAB, 0x12, 0xFF, 0x00]);
        assert_eq!(parse_hex_bytes("AB 12").unwrap(), vec![0xAB, 0x12]);
        assert!(parse_hex_bytes("ABC").is_err());
        assert!(parse_hex_bytes("ZZ").is_err());
        // multi-byte characters must error, not split mid-character
        assert!(parse_hex_bytes("\u{20ac}\u{20ac}").is_err());
    }
}
