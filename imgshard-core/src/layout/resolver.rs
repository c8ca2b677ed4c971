//! Locate the class-partitioned training root inside an extracted archive.
//!
//! Uploaded archives come in a few shapes: bare `class/` folders, a
//! `train/` + `test/` pair, or either of those wrapped in one or more
//! project folders. The search classifies one directory at a time and only
//! descends when the directory itself is not a match.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::util::listing::{has_images, subdirs};

const TRAIN_NAMES: &[&str] = &["train", "training"];
const TEST_NAMES: &[&str] = &["test", "val", "validation"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLayout {
    /// Folder whose subfolders are the classes.
    pub train_root: PathBuf,
    /// Sibling `test`/`val`/`validation` folder, when the archive has one.
    pub test_root: Option<PathBuf>,
    /// Directory in which the match was made.
    pub base: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedLayout),
    NotFound,
}

impl Resolution {
    pub fn found(self) -> Option<ResolvedLayout> {
        match self {
            Resolution::Found(l) => Some(l),
            Resolution::NotFound => None,
        }
    }
}

/// Verdict for a single directory, before any recursion.
#[derive(Debug)]
enum DirClass {
    Match(ResolvedLayout),
    Descend(Vec<PathBuf>),
}

fn find_named<'a>(dirs: &'a [(String, PathBuf)], wanted: &[&str]) -> Option<&'a PathBuf> {
    wanted.iter().find_map(|w| {
        dirs.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(w))
            .map(|(_, p)| p)
    })
}

fn classify(dir: &Path) -> Result<DirClass> {
    let dirs = subdirs(dir)?;

    for want in TRAIN_NAMES {
        let Some(train) = find_named(&dirs, &[want]) else {
            continue;
        };
        let classes = subdirs(train)?;
        if let Some((_, first)) = classes.first() {
            if has_images(first) {
                return Ok(DirClass::Match(ResolvedLayout {
                    train_root: train.clone(),
                    test_root: find_named(&dirs, TEST_NAMES).cloned(),
                    base: dir.to_path_buf(),
                }));
            }
        }
    }

    if dirs.len() > 1 && has_images(&dirs[0].1) {
        return Ok(DirClass::Match(ResolvedLayout {
            train_root: dir.to_path_buf(),
            test_root: None,
            base: dir.to_path_buf(),
        }));
    }

    Ok(DirClass::Descend(dirs.into_iter().map(|(_, p)| p).collect()))
}

fn search(dir: &Path, depth: usize, max_depth: usize) -> Result<Resolution> {
    if depth > max_depth {
        return Ok(Resolution::NotFound);
    }
    match classify(dir)? {
        DirClass::Match(layout) => Ok(Resolution::Found(layout)),
        DirClass::Descend(children) => {
            for child in children {
                if let Resolution::Found(layout) = search(&child, depth + 1, max_depth)? {
                    return Ok(Resolution::Found(layout));
                }
            }
            Ok(Resolution::NotFound)
        }
    }
}

/// Depth-first search from `root` (depth 0) down to `max_depth` levels.
pub fn resolve(root: &Path, max_depth: usize) -> Result<Resolution> {
    let res = search(root, 0, max_depth)?;
    if let Resolution::Found(ref l) = res {
        tracing::debug!(
            train = %l.train_root.display(),
            test = ?l.test_root,
            "resolved dataset layout"
        );
    }
    Ok(res)
}
