use clap::Parser;
use std::path::{Path, PathBuf};

/// Default file name of the per-course gradebook snapshot.
pub const GRADES_FILE_NAME: &str = "all_grades.json";
/// Default file name of the class/teacher snapshot.
pub const SCHOOL_FILE_NAME: &str = "new_grades.json";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Shared options for the gradebook reporting engine.
///
/// Dataset paths are resolved per invocation; there is no persisted or
/// ambient configuration state.
#[derive(Parser, Debug, Clone)]
pub struct Settings {
    /// Path to the per-course gradebook snapshot
    #[arg(long, env = "COACH_GRADES_PATH")]
    pub grades_path: Option<PathBuf>,

    /// Path to the class/teacher snapshot
    #[arg(long, env = "COACH_SCHOOL_PATH")]
    pub school_path: Option<PathBuf>,

    /// Weak/strong threshold in percent for section classification
    #[arg(long, default_value = "70.0")]
    pub threshold: f64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,
}

impl Settings {
    /// Resolve the per-course snapshot path: the explicit setting wins,
    /// otherwise the conventional file name under `data_dir`.
    pub fn resolve_grades_path(&self, data_dir: Option<&Path>) -> Option<PathBuf> {
        self.grades_path
            .clone()
            .or_else(|| data_dir.map(|dir| dir.join(GRADES_FILE_NAME)))
    }

    /// Resolve the class/teacher snapshot path, same precedence as
    /// [`resolve_grades_path`](Self::resolve_grades_path).
    pub fn resolve_school_path(&self, data_dir: Option<&Path>) -> Option<PathBuf> {
        self.school_path
            .clone()
            .or_else(|| data_dir.map(|dir| dir.join(SCHOOL_FILE_NAME)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_from(args: &[&str]) -> Settings {
        // Prepend a binary name so clap accepts the argument list.
        let full: Vec<&str> = std::iter::once("coach-report")
            .chain(args.iter().copied())
            .collect();
        Settings::parse_from(full)
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]);
        assert_eq!(settings.grades_path, None);
        assert_eq!(settings.school_path, None);
        assert_eq!(settings.threshold, 70.0);
        assert_eq!(settings.log_level, "INFO");
    }

    #[test]
    fn test_explicit_paths_win_over_data_dir() {
        let settings = settings_from(&["--grades-path", "/tmp/custom.json"]);
        let resolved = settings.resolve_grades_path(Some(Path::new("/data")));
        assert_eq!(resolved, Some(PathBuf::from("/tmp/custom.json")));
    }

    #[test]
    fn test_data_dir_fallback_uses_conventional_names() {
        let settings = settings_from(&[]);
        assert_eq!(
            settings.resolve_grades_path(Some(Path::new("/data"))),
            Some(PathBuf::from("/data/all_grades.json"))
        );
        assert_eq!(
            settings.resolve_school_path(Some(Path::new("/data"))),
            Some(PathBuf::from("/data/new_grades.json"))
        );
    }

    #[test]
    fn test_no_path_and_no_data_dir_resolves_to_none() {
        let settings = settings_from(&[]);
        assert_eq!(settings.resolve_grades_path(None), None);
        assert_eq!(settings.resolve_school_path(None), None);
    }

    #[test]
    fn test_threshold_override() {
        let settings = settings_from(&["--threshold", "60"]);
        assert_eq!(settings.threshold, 60.0);
    }
}
