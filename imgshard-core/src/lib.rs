#![forbid(unsafe_code)]

pub mod error;
pub mod policy;

pub mod util {
    pub mod cancel;
    pub mod hash_forward;
    pub mod listing;
    pub mod varint;
}

pub mod layout {
    pub mod resolver;
}

pub mod index {
    pub mod classes;
}

pub mod split {
    pub mod planner;
}

pub mod container {
    pub mod header;
    pub mod manifest;
    pub mod record;
}

pub mod pack {
    pub mod writer;
}

pub mod read {
    pub mod extract;
    pub mod reader;
    pub mod verify;
}

pub mod sink;

pub mod list;
pub mod pipeline;
pub mod stats;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports: stable API surface
pub use container::manifest::{Manifest, ManifestSummary};
pub use list::list;
pub use pipeline::{ConversionReport, Converter};
pub use policy::{ConvertOptions, ConvertRequest};
pub use read::extract::extract_zip;
pub use read::verify::verify;
pub use stats::inspect;
pub use util::cancel::CancelToken;
