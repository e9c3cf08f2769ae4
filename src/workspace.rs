//! Workspace lookup for documents

use std::path::{Path, PathBuf};

/// File marking the root of a Django project.
pub const MANAGE_PY: &str = "manage.py";

/// Workspace folder containing `path`. Nested folders win over their parents.
pub fn workspace_root_for(path: &Path, folders: &[PathBuf]) -> Option<PathBuf> {
    folders
        .iter()
        .filter(|folder| path.starts_with(folder))
        .max_by_key(|folder| folder.components().count())
        .cloned()
}

/// Nearest ancestor directory of `path` that holds a `manage.py`.
pub fn find_project_root(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .skip_while(|dir| !dir.is_dir())
        .find(|dir| dir.join(MANAGE_PY).is_file())
        .map(Path::to_path_buf)
}

/// Files that get "run this" lenses: `test_*.py`.
pub fn is_test_module(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("test_") && name.ends_with(".py"))
}

/// Editor language id guessed from the file extension.
pub fn language_id_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("py") | Some("pyi") => "python",
        _ => "plaintext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_workspace_root_prefers_nested_folder() {
        let folders = vec![PathBuf::from("/work"), PathBuf::from("/work/site")];
        let root = workspace_root_for(Path::new("/work/site/app/tests.py"), &folders);
        assert_eq!(root, Some(PathBuf::from("/work/site")));
    }

    #[test]
    fn test_workspace_root_matches_whole_components() {
        let folders = vec![PathBuf::from("/work/site")];
        assert_eq!(workspace_root_for(Path::new("/work/site2/tests.py"), &folders), None);
    }

    #[test]
    fn test_workspace_root_without_folders() {
        assert_eq!(workspace_root_for(Path::new("/work/tests.py"), &[]), None);
    }

    #[test]
    fn test_find_project_root() {
        let dir = tempfile::tempdir().unwrap();
        let tests_dir = dir.path().join("blog").join("tests");
        fs::create_dir_all(&tests_dir).unwrap();
        fs::write(dir.path().join(MANAGE_PY), "").unwrap();
        let file = tests_dir.join("test_views.py");
        fs::write(&file, "").unwrap();

        assert_eq!(find_project_root(&file), Some(dir.path().to_path_buf()));
        assert_eq!(find_project_root(&tests_dir), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_find_project_root_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANAGE_PY), "").unwrap();
        let file = dir.path().join("app").join("test_new.py");
        assert_eq!(find_project_root(&file), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn test_is_test_module() {
        assert!(is_test_module(Path::new("app/tests/test_models.py")));
        assert!(!is_test_module(Path::new("app/tests/models.py")));
        assert!(!is_test_module(Path::new("app/tests/test_models.txt")));
        assert!(!is_test_module(Path::new("app/tests.py")));
    }

    #[test]
    fn test_language_id_for() {
        assert_eq!(language_id_for(Path::new("a/test_x.py")), "python");
        assert_eq!(language_id_for(Path::new("a/README.md")), "plaintext");
        assert_eq!(language_id_for(Path::new("Makefile")), "plaintext");
    }
}
