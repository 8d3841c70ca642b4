use clap::Parser;
use d3pd_tools::engine::inspect::{EntryRange, dump_table};
use d3pd_tools::engine::table::TableFile;
use d3pd_tools::logging;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dump_table")]
#[command(about = "Print the content of a table file as text", long_about = None)]
struct Args {
    /// File to dump
    file: PathBuf,

    /// Comma separated table names (default: all tables)
    #[arg(short = 't', long = "tree-name")]
    tree_name: Option<String>,

    /// Entries to dump: `N`, `a:b` or `a:b:step` (default: all)
    #[arg(short = 'r', long = "range")]
    range: Option<EntryRange>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init()?;

    info!(target: "dump_table", "fname: [{}]", args.file.display());
    let file = match TableFile::open(&args.file) {
        Ok(file) => file,
        Err(e) => {
            error!(target: "dump_table", error = %e, "could not open [{}]", args.file.display());
            std::process::exit(1);
        }
    };

    let names: Vec<String> = match &args.tree_name {
        Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
        None => file.table_names(),
    };
    info!(target: "dump_table", "dumping trees: {:?}", names);

    let range = args.range.unwrap_or_default();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for name in &names {
        let Some(table) = file.table(name)? else {
            error!(target: "dump_table", "no tree [{}] in file", name);
            continue;
        };
        for line in dump_table(&table, &range)? {
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}
