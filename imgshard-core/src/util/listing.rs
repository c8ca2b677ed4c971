use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Extensions (lowercase, without the dot) treated as images.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "bmp"];

/// Entries archivers and tooling leave behind; never classes, never layout hints.
pub const NOISE_NAMES: &[&str] = &["__pycache__", ".git", "__MACOSX", ".DS_Store"];

/// How many entries of a folder are sniffed when deciding if it holds images.
pub const IMAGE_SNIFF_LIMIT: usize = 20;

pub fn is_noise(name: &str) -> bool {
    NOISE_NAMES.iter().any(|n| n.eq_ignore_ascii_case(name))
}

pub fn has_image_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| {
        lower.len() > ext.len()
            && lower.ends_with(ext)
            && lower.as_bytes()[lower.len() - ext.len() - 1] == b'.'
    })
}

/// All entry names of `dir`, sorted so "first" means the same thing everywhere.
pub fn sorted_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for e in fs::read_dir(dir)? {
        let e = e?;
        names.push(e.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Immediate subdirectories of `dir` (noise excluded), sorted by name.
pub fn subdirs(dir: &Path) -> io::Result<Vec<(String, PathBuf)>> {
    let mut out = Vec::new();
    for name in sorted_names(dir)? {
        if is_noise(&name) {
            continue;
        }
        let p = dir.join(&name);
        if p.is_dir() {
            out.push((name, p));
        }
    }
    Ok(out)
}

/// True when one of the first few entries of `dir` looks like an image.
/// Unreadable folders count as image-free.
pub fn has_images(dir: &Path) -> bool {
    match sorted_names(dir) {
        Ok(names) => names
            .iter()
            .take(IMAGE_SNIFF_LIMIT)
            .any(|n| has_image_extension(n)),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_match_case_insensitively() {
        assert!(has_image_extension("a.PNG"));
        assert!(has_image_extension("photo.Jpeg"));
        assert!(has_image_extension("x.webp"));
        assert!(!has_image_extension("notes.txt"));
        assert!(!has_image_extension("png"));
        assert!(!has_image_extension("archive.xpng"));
    }

    #[test]
    fn noise_is_case_insensitive() {
        assert!(is_noise("__MACOSX"));
        assert!(is_noise("__macosx"));
        assert!(is_noise(".ds_store"));
        assert!(!is_noise("cats"));
    }

    #[test]
    fn subdirs_are_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        for d in ["zebra", "Apple", "__MACOSX", "mango"] {
            fs::create_dir(tmp.path().join(d)).unwrap();
        }
        fs::write(tmp.path().join("readme.md"), b"hi").unwrap();
        let names: Vec<_> = subdirs(tmp.path())
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["Apple", "mango", "zebra"]);
    }

    #[test]
    fn image_sniff_only_looks_at_first_entries() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..25 {
            fs::write(tmp.path().join(format!("a{i:02}.txt")), b"").unwrap();
        }
        fs::write(tmp.path().join("z.png"), b"").unwrap();
        assert!(!has_images(tmp.path()));
        fs::write(tmp.path().join("0.png"), b"").unwrap();
        assert!(has_images(tmp.path()));
        assert!(!has_images(&tmp.path().join("missing")));
    }
}
