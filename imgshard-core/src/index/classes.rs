use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::util::listing::{has_image_extension, sorted_names, subdirs};

/// One image and the label of the class it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sample {
    pub path: PathBuf,
    pub label: u32,
}

/// Class name -> label, fixed for every split of one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassIndex {
    names: Vec<String>,
    by_name: BTreeMap<String, u32>,
}

impl ClassIndex {
    /// Labels follow lexicographic order of the names, whatever order they came in.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i as u32))
            .collect();
        Self { names, by_name }
    }

    /// Class folders directly under `train_root`.
    pub fn scan(train_root: &Path) -> Result<Self> {
        Ok(Self::from_names(
            subdirs(train_root)?.into_iter().map(|(name, _)| name),
        ))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn label(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Image files directly inside `class_dir`, sorted by file name.
pub fn collect_images(class_dir: &Path, label: u32) -> Result<Vec<Sample>> {
    let mut out = Vec::new();
    for name in sorted_names(class_dir)? {
        if !has_image_extension(&name) {
            continue;
        }
        let path = class_dir.join(&name);
        // dangling links are kept; the shard writer skips what it cannot read
        if fs::symlink_metadata(&path).map(|m| m.is_dir())? {
            continue;
        }
        out.push(Sample { path, label });
    }
    Ok(out)
}

/// Result of indexing a resolved layout.
#[derive(Clone, Debug, Default)]
pub struct IndexedDataset {
    pub classes: ClassIndex,
    /// Train-folder samples in class order, then file-name order.
    pub train: Vec<Sample>,
    /// Test-folder samples, labelled with the train index.
    pub test: Vec<Sample>,
    /// First image of the first non-empty class.
    pub probe: Option<PathBuf>,
}

pub fn index_dataset(train_root: &Path, test_root: Option<&Path>) -> Result<IndexedDataset> {
    let classes = ClassIndex::scan(train_root)?;
    let mut train = Vec::new();
    let mut probe = None;
    for (label, name) in classes.names().iter().enumerate() {
        let imgs = collect_images(&train_root.join(name), label as u32)?;
        if probe.is_none() {
            probe = imgs.first().map(|s| s.path.clone());
        }
        train.extend(imgs);
    }

    let mut test = Vec::new();
    if let Some(test_root) = test_root {
        for (label, name) in classes.names().iter().enumerate() {
            let dir = test_root.join(name);
            if dir.is_dir() {
                test.extend(collect_images(&dir, label as u32)?);
            }
        }
    }

    tracing::info!(
        classes = classes.len(),
        train = train.len(),
        test = test.len(),
        "indexed dataset"
    );
    Ok(IndexedDataset {
        classes,
        train,
        test,
        probe,
    })
}

/// Pixel size of one image; `(0, 0)` when it cannot be decoded.
pub fn probe_dimensions(path: &Path) -> (u32, u32) {
    match imagesize::size(path) {
        Ok(sz) => (
            u32::try_from(sz.width).unwrap_or(0),
            u32::try_from(sz.height).unwrap_or(0),
        ),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "dimension probe failed");
            (0, 0)
        }
    }
}
