use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "imgshard: image-folder datasets to training shards", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a dataset (.zip or extracted directory) into shards + metadata.json
    Convert {
        /// dataset archive or directory
        source: PathBuf,
        /// output directory for shards and manifest
        out: PathBuf,

        /// read the request from a JSON document instead of flags
        #[arg(long)]
        request: Option<PathBuf>,

        #[arg(long, default_value = "local")]
        project_id: String,

        /// logical dataset path; its parent decides the upload prefix
        #[arg(long)]
        dataset_path: Option<String>,

        #[arg(long = "shard-size-mb", default_value_t = 50.0)]
        shard_size_mb: f64,

        /// fraction of train samples held out when there is no test folder
        #[arg(long, default_value_t = 0.2)]
        val_split: f64,

        #[arg(long, default_value_t = 4)]
        max_depth: usize,

        /// zero the manifest timestamp
        #[arg(long)]
        deterministic: bool,

        /// copy outputs under this directory, keyed by the remote prefix
        #[arg(long)]
        upload_dir: Option<PathBuf>,

        /// keep a JSON status document here instead of logging progress
        #[arg(long)]
        status_file: Option<PathBuf>,

        /// cancel the conversion after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Report the detected layout, classes and tree statistics
    Inspect {
        root: PathBuf,

        #[arg(long, default_value_t = 4)]
        max_depth: usize,

        /// print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Re-hash every shard listed in metadata.json and decode all records
    Verify { dir: PathBuf },

    /// List the records of one shard
    List { shard: PathBuf },
}
