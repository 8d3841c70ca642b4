use clap::Parser;
use d3pd_tools::engine::grl::{GoodRunList, expand_grl_sources};
use d3pd_tools::engine::merge::{ColumnSelection, MergeOptions, MergeSession};
use d3pd_tools::engine::reorder::{ReorderMode, fragments_for, reorder};
use d3pd_tools::engine::table::TableWriter;
use d3pd_tools::logging;
use d3pd_tools::shared::config::CONFIG;
use d3pd_tools::shared::path::parent_dir;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "filter_and_merge_d3pd")]
#[command(about = "Filter and merge flat ntuple tables", long_about = None)]
struct Args {
    /// Text file listing one input table file per line
    #[arg(short = 'i', long = "in")]
    input_list: PathBuf,

    /// Output file name; extra fragments get a `_<n>` suffix
    #[arg(short = 'o', long = "out")]
    output: PathBuf,

    /// Name of the table to merge
    #[arg(short = 't', long = "tree")]
    tree: String,

    /// File listing the columns (or glob patterns) to keep
    #[arg(long = "var")]
    vars: Option<PathBuf>,

    /// Good run list file(s), comma separated, globs allowed
    #[arg(long = "grl")]
    grl: Option<String>,

    /// Maximum size of one output fragment, in MiB
    #[arg(short = 'm', long = "maxsize")]
    maxsize: Option<u64>,

    /// Memory budget for all output baskets, in KiB
    #[arg(long = "memory")]
    memory: Option<u64>,

    /// Basket layout pass: by-entry, by-branch or none
    #[arg(long = "reorder")]
    reorder: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if !e.use_stderr() => {
            e.print()?;
            std::process::exit(0);
        }
        Err(e) => {
            e.print()?;
            std::process::exit(1);
        }
    };

    logging::init()?;
    let code = run(args)?;
    std::process::exit(code);
}

fn run(args: Args) -> anyhow::Result<i32> {
    let merge_cfg = &CONFIG.merge;
    let max_fragment_bytes = args
        .maxsize
        .map(|mib| mib * 1024 * 1024)
        .unwrap_or_else(|| merge_cfg.max_fragment_bytes());
    let memory_budget_bytes = args
        .memory
        .map(|kib| kib * 1024)
        .unwrap_or_else(|| merge_cfg.memory_budget_bytes());
    let reorder_mode = parse_reorder_mode(args.reorder.as_deref().unwrap_or(&merge_cfg.reorder_mode))?;

    info!(target: "filter_and_merge", "filter'n'merge d3pds");
    info!(
        target: "filter_and_merge",
        input_list = %args.input_list.display(),
        output = %args.output.display(),
        vars = ?args.vars,
        tree = %args.tree,
        grl = ?args.grl,
        max_fragment_bytes,
        "Options"
    );

    let workdir = parent_dir(&args.output);
    fs::create_dir_all(&workdir)?;

    let grl = match &args.grl {
        Some(sources) => {
            let paths = expand_grl_sources(sources)?;
            let grl = GoodRunList::load(&paths)?;
            info!(target: "filter_and_merge", files = paths.len(), ranges = grl.len(), "Loaded GRL");
            Some(grl)
        }
        None => None,
    };
    let selection = match &args.vars {
        Some(path) => ColumnSelection::from_file(path)?,
        None => ColumnSelection::All,
    };

    let session = match MergeSession::open(&args.input_list, &args.tree) {
        Ok(session) => session,
        Err(e) => {
            e.log_error();
            return Err(e.into());
        }
    };
    if session.usable_inputs() == 0 {
        warn!(target: "filter_and_merge", "no input files found");
        return Ok(2);
    }

    let mut options = MergeOptions::new(selection, memory_budget_bytes)
        .with_grl_columns(&merge_cfg.run_column, &merge_cfg.lumi_block_column);
    if let Some(grl) = grl {
        options = options.with_grl(grl);
    }

    let started = Instant::now();
    let report = session.merge(options, |schema| {
        TableWriter::create(&args.output, &args.tree, schema, max_fragment_bytes)
    });
    drop(session);
    let report = match report {
        Ok(report) => report,
        Err(e) => {
            e.log_error();
            return Err(e.into());
        }
    };
    info!(
        target: "filter_and_merge",
        elapsed_ms = started.elapsed().as_millis() as u64,
        fragments = report.fragments.len(),
        bytes = report.bytes_written,
        "merging done"
    );

    if let Some(mode) = reorder_mode {
        reorder_outputs(&args.output, &args.tree, mode)?;
    }

    info!(target: "filter_and_merge", "bye.");
    Ok(0)
}

fn parse_reorder_mode(value: &str) -> anyhow::Result<Option<ReorderMode>> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse::<ReorderMode>()
        .map(Some)
        .map_err(anyhow::Error::msg)
}

fn reorder_outputs(output: &Path, tree: &str, mode: ReorderMode) -> anyhow::Result<()> {
    info!(target: "filter_and_merge", %mode, "performing re-ordering...");
    let started = Instant::now();
    let fragments = fragments_for(output)?;
    let summary = reorder(&fragments, tree, mode);
    info!(
        target: "filter_and_merge",
        reordered = summary.reordered.len(),
        failed = summary.failed.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "performing re-ordering... [done]"
    );
    Ok(())
}
