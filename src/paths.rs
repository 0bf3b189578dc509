use std::path::PathBuf;
use std::sync::OnceLock;

/// Platform directories, resolved once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dirs {
    pub document: String,
    pub cache: String,
    pub temp: String,
    pub download: String,
}

impl Dirs {
    pub fn get() -> &'static Dirs {
        static DIRS: OnceLock<Dirs> = OnceLock::new();
        DIRS.get_or_init(Dirs::resolve)
    }

    fn resolve() -> Dirs {
        let temp = std::env::temp_dir();
        let or_temp = |dir: Option<PathBuf>| dir.unwrap_or_else(|| temp.clone()).display().to_string();
        let dirs = Dirs {
            document: or_temp(dirs::document_dir().or_else(dirs::data_dir)),
            cache: or_temp(dirs::cache_dir()),
            temp: temp.display().to_string(),
            download: or_temp(dirs::download_dir()),
        };
        tracing::debug!(?dirs, "directories resolved");
        dirs
    }
}

/// Joins parts with `/`, collapsing repeated separators and dropping a
/// trailing one unless the result is the root.
pub fn join<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(|part| part.as_ref())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    let mut result = String::with_capacity(joined.len());
    for ch in joined.chars() {
        if ch == '/' && result.ends_with('/') {
            continue;
        }
        result.push(ch);
    }

    if result.len() > 1 && result.ends_with('/') {
        result.pop();
    }
    result
}

pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => ".",
    }
}

/// Last path component, minus `ext` when it ends with it.
pub fn basename<'a>(path: &'a str, ext: Option<&str>) -> &'a str {
    let name = match path.rfind('/') {
        Some(index) => &path[index + 1..],
        None => path,
    };
    match ext {
        Some(ext) if !ext.is_empty() => name.strip_suffix(ext).unwrap_or(name),
        _ => name,
    }
}

/// Extension including the dot, empty for dotfiles and names without one.
pub fn extname(path: &str) -> &str {
    let name = basename(path, None);
    match name.rfind('.') {
        Some(index) if index > 0 => &name[index..],
        _ => "",
    }
}

#[cfg(test)]
mod test {
    use crate::paths::{basename, dirname, extname, join, Dirs};

    #[test]
    fn test_join() {
        assert_eq!(join(&["/base/", "/sub/", "/file.txt"]), "/base/sub/file.txt");
        assert_eq!(join(&["a", "", "b"]), "a/b");
        assert_eq!(join(&["/", "/"]), "/");
        assert_eq!(join(&["dir/"]), "dir");
        assert_eq!(join::<&str>(&[]), "");
    }

    #[test]
    fn test_components() {
        assert_eq!(dirname("/a/b/c.txt"), "/a/b");
        assert_eq!(dirname("c.txt"), ".");
        assert_eq!(basename("/a/b/c.txt", None), "c.txt");
        assert_eq!(basename("/a/b/c.txt", Some(".txt")), "c");
        assert_eq!(extname("/a/b/c.tar.gz"), ".gz");
        assert_eq!(extname("/a/.hidden"), "");
        assert_eq!(extname("noext"), "");
    }

    #[test]
    fn test_dirs_resolve_once() {
        let dirs = Dirs::get();
        assert!(!dirs.temp.is_empty());
        assert!(!dirs.document.is_empty());
        assert!(std::ptr::eq(dirs, Dirs::get()));
    }
}
