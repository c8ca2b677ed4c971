use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Result, ShardError};
use crate::index::classes::{index_dataset, probe_dimensions};
use crate::layout::resolver::{Resolution, resolve};
use crate::util::listing::{has_image_extension, is_noise};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub files: u64,
    pub dirs: u64,
    pub images: u64,
    pub image_bytes: u64,
}

/// Walk the whole tree, skipping noise folders.
pub fn tree_stats(root: &Path) -> Result<TreeStats> {
    let mut st = TreeStats::default();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_noise(&e.file_name().to_string_lossy()));
    for e in walker {
        let e = e.map_err(|e| ShardError::Io(std::io::Error::other(e)))?;
        if e.file_type().is_dir() {
            st.dirs += 1;
        } else if e.file_type().is_file() {
            st.files += 1;
            if has_image_extension(&e.file_name().to_string_lossy()) {
                st.images += 1;
                st.image_bytes += e.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }
    Ok(st)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub name: String,
    pub label: u32,
    pub train: u64,
    pub test: u64,
}

/// Dry run of discovery and indexing: what a conversion would see.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    pub train_root: String,
    pub test_root: Option<String>,
    pub classes: Vec<ClassCount>,
    pub original_width: u32,
    pub original_height: u32,
    pub tree: TreeStats,
}

pub fn inspect(root: &Path, max_depth: usize) -> Result<Inspection> {
    let layout = match resolve(root, max_depth)? {
        Resolution::Found(l) => l,
        Resolution::NotFound => {
            return Err(ShardError::StructureNotFound {
                root: root.to_path_buf(),
                max_depth,
            });
        }
    };
    let ds = index_dataset(&layout.train_root, layout.test_root.as_deref())?;
    let mut classes: Vec<ClassCount> = ds
        .classes
        .names()
        .iter()
        .enumerate()
        .map(|(i, n)| ClassCount {
            name: n.clone(),
            label: i as u32,
            train: 0,
            test: 0,
        })
        .collect();
    for s in &ds.train {
        classes[s.label as usize].train += 1;
    }
    for s in &ds.test {
        classes[s.label as usize].test += 1;
    }
    let (w, h) = ds.probe.as_deref().map(probe_dimensions).unwrap_or((0, 0));
    Ok(Inspection {
        train_root: layout.train_root.display().to_string(),
        test_root: layout.test_root.map(|p| p.display().to_string()),
        classes,
        original_width: w,
        original_height: h,
        tree: tree_stats(root)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn counts_per_class_and_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        for (p, n) in [("train/a", 3), ("train/b", 1), ("test/b", 2)] {
            fs::create_dir_all(root.join(p)).unwrap();
            for i in 0..n {
                fs::write(root.join(p).join(format!("{i}.jpg")), b"1234").unwrap();
            }
        }
        fs::create_dir_all(root.join("__MACOSX/train")).unwrap();
        fs::write(root.join("__MACOSX/train/._0.jpg"), b"xx").unwrap();
        fs::write(root.join("README.txt"), b"hi").unwrap();

        let ins = inspect(root, 4).unwrap();
        assert_eq!(ins.classes.len(), 2);
        assert_eq!((ins.classes[0].train, ins.classes[0].test), (3, 0));
        assert_eq!((ins.classes[1].train, ins.classes[1].test), (1, 2));
        assert_eq!(ins.tree.images, 6);
        assert_eq!(ins.tree.files, 7);
        assert_eq!(ins.tree.image_bytes, 24);
    }

    #[test]
    fn missing_structure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            inspect(tmp.path(), 4),
            Err(ShardError::StructureNotFound { .. })
        ));
    }
}
