pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use imgshard_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert {
            source,
            out,
            request,
            project_id,
            dataset_path,
            shard_size_mb,
            val_split,
            max_depth,
            deterministic,
            upload_dir,
            status_file,
            timeout,
        } => {
            let req = match request {
                Some(path) => handlers::load_request(&path)?,
                None => handlers::request_from_flags(
                    &source,
                    project_id,
                    dataset_path,
                    shard_size_mb,
                    val_split,
                    max_depth,
                    deterministic,
                ),
            };
            let sides = handlers::SideChannels {
                upload_dir,
                status_file,
                timeout,
            };
            handlers::handle_convert(source, out, req, sides)
        }
        Commands::Inspect {
            root,
            max_depth,
            json,
        } => handlers::handle_inspect(root, max_depth, json),
        Commands::Verify { dir } => handlers::handle_verify(dir),
        Commands::List { shard } => handlers::handle_list(shard),
    }
}
