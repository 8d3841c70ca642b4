use clap::Parser;
use d3pd_tools::engine::inspect::{DiffOptions, diff_tables};
use d3pd_tools::engine::table::{Table, TableFile};
use d3pd_tools::logging;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "diff_tables")]
#[command(about = "Check that two table files hold the same content", long_about = None)]
struct Args {
    /// Reference file
    old: PathBuf,

    /// File compared to the reference
    new: PathBuf,

    /// Name of the table to compare
    #[arg(short = 't', long = "tree-name", default_value = "CollectionTree")]
    tree_name: String,

    /// Columns left out of the comparison
    #[arg(long = "ignore-leaves", num_args = 0.., default_values_t = ["Token".to_string()])]
    ignore_leaves: Vec<String>,

    /// Columns whose difference stops the comparison of an entry
    #[arg(long = "enforce-leaves", num_args = 0.., default_values_t = ["BCID".to_string()])]
    enforce_leaves: Vec<String>,
}

fn open(path: &Path, tree: &str) -> Option<Table> {
    let file = match TableFile::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!(target: "diff_tables", path = %path.display(), error = %e, "could not open file");
            return None;
        }
    };
    match file.table(tree) {
        Ok(Some(table)) => Some(table),
        Ok(None) => {
            error!(target: "diff_tables", "no tree [{}] in file [{}]", tree, path.display());
            None
        }
        Err(e) => {
            error!(target: "diff_tables", path = %path.display(), error = %e, "could not read tree");
            None
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init()?;

    info!(target: "diff_tables", "comparing tree [{}] in files:", args.tree_name);
    info!(target: "diff_tables", " old: [{}]", args.old.display());
    info!(target: "diff_tables", " new: [{}]", args.new.display());
    info!(target: "diff_tables", "ignore  leaves: {:?}", args.ignore_leaves);
    info!(target: "diff_tables", "enforce leaves: {:?}", args.enforce_leaves);

    let (Some(old), Some(new)) = (open(&args.old, &args.tree_name), open(&args.new, &args.tree_name))
    else {
        std::process::exit(1);
    };

    let options = DiffOptions {
        ignore: args.ignore_leaves,
        enforce: args.enforce_leaves,
    };
    let report = diff_tables(&old, &new, &options);
    std::process::exit(report.exit_code());
}
