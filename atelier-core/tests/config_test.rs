use std::io::Write;

use atelier_core::config::{AtelierConfig, ConfigLoadError};
use atelier_core::hooks::HookConfig;
use atelier_core::services::StatusWorkflow;
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

mod file_loading_tests {
    use super::*;

    #[test]
    fn test_load_sections_from_file() {
        let file = toml_file(
            r#"
            [workflow]
            enforce_transitions = false

            [hooks]
            timeout_ms = 1500
            webhook_url = "https://hooks.example.com/atelier"

            [inbox]
            preview_chars = 40
            "#,
        );

        let config = AtelierConfig::load_from_paths(vec![file.path().to_path_buf()]).unwrap();

        assert!(!config.workflow.enforce_transitions);
        assert!(!StatusWorkflow::from_config(&config.workflow).is_enforced());
        assert_eq!(config.hooks.timeout_ms, 1500);
        assert_eq!(HookConfig::from(&config.hooks).timeout_ms, 1500);
        assert_eq!(config.hooks.webhook_url, "https://hooks.example.com/atelier");
        assert_eq!(config.inbox.preview_chars, 40);
    }

    #[test]
    fn test_later_files_override_earlier_ones() {
        let base = toml_file(
            r#"
            [inbox]
            preview_chars = 40

            [hooks]
            timeout_ms = 900
            "#,
        );
        let local = toml_file(
            r#"
            [inbox]
            preview_chars = 120
            "#,
        );

        let config = AtelierConfig::load_from_paths(vec![
            base.path().to_path_buf(),
            local.path().to_path_buf(),
        ])
        .unwrap();

        assert_eq!(config.inbox.preview_chars, 120);
        assert_eq!(config.hooks.timeout_ms, 900);
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AtelierConfig::load_from_paths(vec![dir.path().join("absent.toml")]).unwrap();

        assert!(config.workflow.enforce_transitions);
        assert_eq!(config.inbox.preview_chars, 80);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = toml_file(
            r#"
            [hooks]
            timeout_ms = 0
            "#,
        );

        let err = AtelierConfig::load_from_paths(vec![file.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, ConfigLoadError::InvalidValue { ref key, .. } if key == "hooks.timeout_ms"));
    }

    #[test]
    fn test_bad_webhook_scheme_is_rejected() {
        let file = toml_file(
            r#"
            [hooks]
            webhook_url = "ftp://example.com/drop"
            "#,
        );

        assert!(AtelierConfig::load_from_paths(vec![file.path().to_path_buf()]).is_err());
    }
}
