use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use log::LevelFilter;
use sandstone::{CompileConfig, Compiler};
use serde_json::json;
use simple_logger::SimpleLogger;

/// Compile a Python-subset source tree into Minecraft datapack functions.
#[derive(Parser)]
#[command(name = "sandstone", version, about)]
struct Cli {
    /// Directory containing the Python sources.
    #[arg(long, short = 's', default_value = "./src")]
    source: PathBuf,

    /// Template root probed after the source root.
    #[arg(long, default_value = "./template")]
    templates: PathBuf,

    /// Entry module: a dotted name under the source root.
    #[arg(long, short = 'e')]
    entry: String,

    /// Directory the generated function tree is written under.
    #[arg(long, short = 'o', default_value = "./out")]
    output: PathBuf,

    /// Base namespace prefix for compiled units.
    #[arg(long, default_value = "source_code:")]
    namespace: String,

    /// Emit comment and tellraw debug instrumentation.
    #[arg(long)]
    debug: bool,

    /// Also write a pack.mcmeta with this pack format at the output root.
    #[arg(long)]
    pack_format: Option<u32>,

    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.parse().unwrap_or(LevelFilter::Warn);
    if let Err(err) = SimpleLogger::new().with_level(level).init() {
        eprintln!("failed to initialise logging: {err}");
    }

    let config = CompileConfig::new(&cli.source, &cli.templates, &cli.output, &cli.namespace).with_debug(cli.debug);
    let mut compiler = Compiler::new(config);

    if let Err(err) = compiler.compile(&cli.entry).and_then(|()| compiler.finish()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    if let Some(pack_format) = cli.pack_format
        && let Err(err) = write_pack_mcmeta(&cli.output, pack_format)
    {
        eprintln!("error: failed to write pack.mcmeta: {err}");
        return ExitCode::FAILURE;
    }

    let written = compiler.files().files().count();
    println!("compiled {} -> {} ({written} files)", cli.entry, cli.output.display());
    ExitCode::SUCCESS
}

fn write_pack_mcmeta(output: &Path, pack_format: u32) -> std::io::Result<()> {
    let meta = json!({
        "pack": {
            "pack_format": pack_format,
            "description": "compiled by sandstone",
        }
    });
    let mut text = serde_json::to_string_pretty(&meta)?;
    text.push('\n');
    fs::write(output.join("pack.mcmeta"), text)
}
