use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};

use ctv_clkutils::{index_clkutils, ITUFF_LIMIT};
use ctv_indexer::{index_ctv, IndexMode};
use ctv_mtpl::{mtpl_to_csv, mtpl_verification};
use ctv_query::{uber_request, QuerySpec};
use ctv_reshape::{reshape_output, stack_file};
use ctv_smartctv::process_smart_ctv;

use crate::bridge_cmd::CommandBridge;
use crate::driver::{spawn_run, RunSettings};

mod bridge_cmd;
mod driver;
mod material;

#[derive(Parser)]
#[command(name = "ctvlist")]
#[command(about = "CTV list data processing pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for every test in a material file
    Run(RunArgs),
    /// Parse an MTPL into its test and port CSVs
    ParseMtpl(ParseMtplArgs),
    /// Index a raw CTV decoder CSV
    Index(IndexArgs),
    /// Expand a SmartCTV JSON into decoded CSV templates
    Smartctv(SmartctvArgs),
    /// Index a ClkUtils DCM configuration JSON
    Clkutils(ClkutilsArgs),
    /// Pull string results for an indexed decoder
    Query(QueryArgs),
    /// Stack a wide dataoutput CSV into long format
    Stack(StackArgs),
    /// Check MTPL flow result ports against decoder exit ports
    VerifyPorts(VerifyPortsArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Material qualifier CSV (Test plus optional Lot/Wafer/Program/
    /// Prefetch/Database/MTPL columns)
    #[arg(long)]
    material: PathBuf,

    /// ClkUtils DCM configuration JSON
    #[arg(long, default_value = "configFile_DMR.json")]
    clkutils_config: PathBuf,

    /// Root folder for per-program outputs
    #[arg(long)]
    output: Option<PathBuf>,

    /// Delete intermediary files, keeping only mapped and stacked data
    #[arg(long)]
    delete_intermediates: bool,

    /// Stack every mapped output file
    #[arg(long)]
    stack: bool,

    /// Frequency corner for derived ClkUtils names
    #[arg(long, default_value = "NOM")]
    corner: String,

    /// Database bridge helper command (defaults to $CTV_UBER_CMD)
    #[arg(long)]
    bridge_cmd: Option<String>,
}

#[derive(Args)]
struct ParseMtplArgs {
    #[arg(long)]
    mtpl: PathBuf,

    /// Output directory (defaults to the MTPL's directory)
    #[arg(long)]
    place_in: Option<PathBuf>,
}

#[derive(Args)]
struct IndexArgs {
    /// Raw decoder CSV
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    test: String,

    #[arg(long, default_value = "")]
    module: String,

    #[arg(long)]
    place_in: PathBuf,

    /// Index in CtvTag mode
    #[arg(long)]
    ctvtag: bool,

    /// Configuration id qualifying the output name
    #[arg(long, default_value = "")]
    config: String,
}

#[derive(Args)]
struct SmartctvArgs {
    /// Test program base directory (the part above Modules)
    #[arg(long)]
    base_dir: PathBuf,

    /// SmartCTV configuration JSON
    #[arg(long)]
    json: PathBuf,

    /// Expand only this configuration id
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    place_in: PathBuf,
}

#[derive(Args)]
struct ClkutilsArgs {
    /// ClkUtils DCM configuration JSON
    #[arg(long)]
    json: PathBuf,

    /// Test name filter (substring-selects die regions)
    #[arg(long)]
    test: Option<String>,

    #[arg(long)]
    place_in: Option<PathBuf>,

    #[arg(long, default_value_t = ITUFF_LIMIT)]
    limit: usize,

    #[arg(long, default_value = "NOM")]
    corner: String,
}

#[derive(Args)]
struct QueryArgs {
    /// Indexed decoder CSV
    #[arg(long)]
    indexed: PathBuf,

    #[arg(long)]
    test: String,

    #[arg(long, default_value = "")]
    test_type: String,

    /// Token names already carry their status suffix
    #[arg(long)]
    needed_suffix: bool,

    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = "DAC%")]
    program: String,

    #[arg(long, value_delimiter = ',', default_value = "Not Null")]
    lot: Vec<String>,

    #[arg(long, value_delimiter = ',', default_value = "Not Null")]
    wafer: Vec<String>,

    /// Days of history to pull
    #[arg(long, default_value_t = 3)]
    prefetch: u32,

    #[arg(long, value_delimiter = ',', default_value = "D1D_PROD_XEUS,F24_PROD_XEUS")]
    database: Vec<String>,

    /// Reshape the pull into the wide dataoutput file as well
    #[arg(long)]
    reshape: bool,

    /// Database bridge helper command (defaults to $CTV_UBER_CMD)
    #[arg(long)]
    bridge_cmd: Option<String>,
}

#[derive(Args)]
struct StackArgs {
    /// Wide dataoutput CSV
    #[arg(long)]
    input: PathBuf,

    /// Tag column names for the split label, comma separated
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,
}

#[derive(Args)]
struct VerifyPortsArgs {
    #[arg(long)]
    mtpl: PathBuf,

    /// Test program base directory
    #[arg(long)]
    base_dir: PathBuf,

    #[arg(long)]
    place_in: PathBuf,
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run(args) => run_driver(args),
        Commands::ParseMtpl(args) => {
            let place_in = args
                .place_in
                .or_else(|| args.mtpl.parent().map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            let tests_csv = mtpl_to_csv(&args.mtpl, &place_in)?;
            let ports_csv = ctv_mtpl::mtpl_ports_to_csv(&args.mtpl, &place_in)?;
            println!("{}", tests_csv.display());
            println!("{}", ports_csv.display());
            Ok(())
        }
        Commands::Index(args) => {
            let mode = if args.ctvtag {
                IndexMode::CtvTag
            } else {
                IndexMode::Standard
            };
            let indexed = index_ctv(
                &args.input,
                &args.test,
                &args.module,
                &args.place_in,
                mode,
                &args.config,
            )?;
            println!("{}", indexed.out_file.display());
            Ok(())
        }
        Commands::Smartctv(args) => {
            let outputs = process_smart_ctv(
                &args.base_dir,
                &args.json,
                args.config.as_deref(),
                &args.place_in,
            )?;
            for output in outputs {
                println!("{}", output.out_file.display());
            }
            Ok(())
        }
        Commands::Clkutils(args) => {
            let default_dir = args
                .json
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let place_in = args.place_in.unwrap_or(default_dir);
            let index = index_clkutils(
                &args.json,
                args.test.as_deref(),
                Some(&place_in),
                args.limit,
                &args.corner,
            )?;
            for file in index.out_files {
                println!("{}", file.display());
            }
            Ok(())
        }
        Commands::Query(args) => {
            let bridge = CommandBridge::acquire(args.bridge_cmd.as_deref())?;
            let spec = QuerySpec {
                lot: args.lot,
                wafer_id: args.wafer,
                program: args.program,
                prefetch: args.prefetch,
                databases: args.database,
            };
            let pulled = uber_request(
                &bridge,
                &args.indexed,
                &args.test,
                &args.test_type,
                args.needed_suffix,
                args.output.as_deref(),
                &spec,
            )?;
            println!("{}", pulled.pulled_file.display());
            if args.reshape {
                let out = reshape_output(
                    &pulled.pulled_file,
                    &args.indexed,
                    &args.test,
                    "",
                    args.output.as_deref(),
                )?;
                println!("{}", out.display());
            }
            Ok(())
        }
        Commands::Stack(args) => {
            let stacked = stack_file(&args.input, &args.labels)?;
            println!("{}", stacked.display());
            Ok(())
        }
        Commands::VerifyPorts(args) => {
            match mtpl_verification(&args.mtpl, &args.base_dir, &args.place_in)? {
                Some(report) => {
                    println!("{}", report.display());
                    Err(anyhow!("port mismatches found"))
                }
                None => {
                    println!("no port mismatches");
                    Ok(())
                }
            }
        }
    }
}

fn run_driver(args: RunArgs) -> Result<()> {
    let bridge = CommandBridge::acquire(args.bridge_cmd.as_deref())
        .context("the run subcommand needs a database bridge")?;
    let settings = RunSettings {
        material_file: args.material,
        clkutils_config: args.clkutils_config,
        output_root: args.output,
        delete_intermediates: args.delete_intermediates,
        stack_outputs: args.stack,
        corner: args.corner,
    };

    let handle = spawn_run(bridge, settings);
    while !handle.is_finished() {
        std::thread::sleep(Duration::from_secs(2));
        let progress = handle.snapshot();
        if !progress.current.is_empty() {
            log::debug!(
                "progress: {} ({} done, {} skipped)",
                progress.current,
                progress.completed,
                progress.skipped
            );
        }
    }
    let progress = handle.snapshot();
    handle.join()?;
    log::info!(
        "run complete: {} tests done, {} skipped, {} outputs, {} stacked",
        progress.completed,
        progress.skipped,
        progress.outputs.len(),
        progress.stacked.len()
    );
    Ok(())
}
