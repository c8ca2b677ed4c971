use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use imgshard_core::error::{Result, ShardError};
use imgshard_core::sink::store::{Backend, BlobStore, open_store};
use imgshard_core::sink::{JsonFileSink, LogSink, ProgressSink};
use imgshard_core::{CancelToken, ConversionReport, ConvertRequest, Converter};

/// Optional outward channels of a conversion.
#[derive(Default)]
pub struct SideChannels {
    pub upload_dir: Option<PathBuf>,
    pub status_file: Option<PathBuf>,
    pub timeout: Option<u64>,
}

pub fn load_request(path: &Path) -> Result<ConvertRequest> {
    ConvertRequest::from_json_file(path)
}

pub fn request_from_flags(
    source: &Path,
    project_id: String,
    dataset_path: Option<String>,
    shard_size_mb: f64,
    val_split: f64,
    max_depth: usize,
    deterministic: bool,
) -> ConvertRequest {
    let dataset_path = dataset_path.unwrap_or_else(|| source.display().to_string());
    ConvertRequest {
        shard_size_mb,
        val_split,
        max_depth,
        deterministic,
        ..ConvertRequest::new(project_id, dataset_path)
    }
}

fn is_archive(source: &Path) -> bool {
    source.is_file()
        || source
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

fn arm_timeout(cancel: &CancelToken, secs: u64) {
    let cancel = cancel.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(secs));
        tracing::warn!(secs, "timeout reached, cancelling");
        cancel.cancel();
    });
}

pub fn convert(
    source: &Path,
    out: &Path,
    req: &ConvertRequest,
    sides: &SideChannels,
) -> Result<ConversionReport> {
    let sink: Box<dyn ProgressSink> = match &sides.status_file {
        Some(path) => Box::new(JsonFileSink::new(path)),
        None => Box::new(LogSink),
    };
    let store: Option<Box<dyn BlobStore>> = sides
        .upload_dir
        .clone()
        .map(|dir| open_store(Backend::Fs(dir)));

    let cancel = CancelToken::new();
    if let Some(secs) = sides.timeout {
        arm_timeout(&cancel, secs);
    }

    let mut converter = Converter::new(sink.as_ref()).with_cancel(cancel);
    if let Some(store) = store.as_deref() {
        converter = converter.with_store(store);
    }

    if is_archive(source) {
        converter.convert_archive(source, out, req)
    } else {
        converter.convert_dir(source, out, req)
    }
}

fn summary_line(report: &ConversionReport) -> String {
    let m = &report.manifest;
    let skipped = &m.skipped_samples;
    format!(
        "{} classes, train={} val={} test={} skipped={}/{}/{}",
        m.num_classes,
        m.train_samples,
        m.val_samples,
        m.test_samples,
        skipped.train,
        skipped.val,
        skipped.test
    )
}

pub fn handle_convert(
    source: PathBuf,
    out: PathBuf,
    req: ConvertRequest,
    sides: SideChannels,
) -> Result<()> {
    let report = convert(&source, &out, &req, &sides)?;
    println!("{}", summary_line(&report));
    for name in &report.files {
        println!("{}", report.out_dir.join(name).display());
    }
    for key in &report.uploaded {
        println!("uploaded {key}");
    }
    Ok(())
}

pub fn handle_inspect(root: PathBuf, max_depth: usize, json: bool) -> Result<()> {
    let info = imgshard_core::inspect(&root, max_depth)?;
    if json {
        let text = serde_json::to_string_pretty(&info)
            .map_err(|e| ShardError::Format(format!("encode inspection: {e}")))?;
        println!("{text}");
        return Ok(());
    }

    println!("train: {}", info.train_root);
    if let Some(test) = &info.test_root {
        println!("test:  {test}");
    }
    println!("probe: {}x{}", info.original_width, info.original_height);
    for c in &info.classes {
        println!("{:>4}  {:<24} train={:<6} test={}", c.label, c.name, c.train, c.test);
    }
    println!(
        "tree:  files={} dirs={} images={} bytes={}",
        info.tree.files, info.tree.dirs, info.tree.images, info.tree.image_bytes
    );
    Ok(())
}

pub fn handle_verify(dir: PathBuf) -> Result<()> {
    let checks = imgshard_core::verify(&dir)?;
    for c in &checks {
        println!("{:<5} {:<24} records={}", c.split.as_str(), c.name, c.records);
    }
    eprintln!("verify: OK");
    Ok(())
}

pub fn handle_list(shard: PathBuf) -> Result<()> {
    for row in imgshard_core::list(&shard)? {
        println!("{:>4}  {:>10}  {}", row.label, row.image_bytes, row.filename);
    }
    Ok(())
}
