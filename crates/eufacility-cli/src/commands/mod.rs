//! CLI command implementations.

pub mod harmonise;
pub mod template;
pub mod validate;

use eufacility::CategoryConfig;

use crate::cli::CategoryArgs;

/// Category configuration from the command line options.
pub fn load_config(args: &CategoryArgs) -> Result<CategoryConfig, Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => CategoryConfig::load(args.category, path)?,
        None => CategoryConfig::default_for(args.category),
    };
    Ok(match &args.output_dir {
        Some(dir) => config.with_path(dir),
        None => config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use eufacility::FacilityCategory;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn args(config: Option<PathBuf>, output_dir: Option<PathBuf>) -> CategoryArgs {
        CategoryArgs {
            category: FacilityCategory::Education,
            config,
            output_dir,
        }
    }

    #[test]
    fn test_output_dir_overrides_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"path": "from-config"}}"#).unwrap();

        let config = load_config(&args(Some(file.path().to_path_buf()), None)).unwrap();
        assert_eq!(config.path, PathBuf::from("from-config"));

        let config = load_config(&args(
            Some(file.path().to_path_buf()),
            Some(PathBuf::from("elsewhere")),
        ))
        .unwrap();
        assert_eq!(config.path, PathBuf::from("elsewhere"));
        assert_eq!(config.category, FacilityCategory::Education);
    }

    #[test]
    fn test_missing_config_file() {
        assert!(load_config(&args(Some(PathBuf::from("/nonexistent.json")), None)).is_err());
    }
}
