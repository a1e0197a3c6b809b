//! Client environment detection.
//!
//! Sessions carry a label identifying the environment the driver runs in
//! (Colab, Workbench, VS Code, plain Jupyter, ...). Detection is purely
//! environmental so it never fails; unknown setups fall back to
//! [`LABEL_VALUE_UNKNOWN`].

use std::path::Path;

/// Label key identifying the client environment on a session.
pub const CLIENT_LABEL_KEY: &str = "dataproc-session-client";

pub const LABEL_VALUE_UNKNOWN: &str = "unknown";
pub const LABEL_VALUE_COLAB: &str = "colab";
pub const LABEL_VALUE_COLAB_ENTERPRISE: &str = "colab-enterprise";
pub const LABEL_VALUE_WORKBENCH: &str = "workbench-jupyter";
pub const LABEL_VALUE_VSCODE: &str = "vscode";
pub const LABEL_VALUE_JUPYTER: &str = "jupyter";

/// The identifier for the GCP VS Code extension.
/// https://cloud.google.com/code/docs/vscode/install
pub const GOOGLE_CLOUD_CODE_EXTENSION: &str = "googlecloudtools.cloudcode";

/// Checks if the current environment is Google Colab.
pub fn is_colab(env: &dyn Fn(&str) -> Option<String>) -> bool {
    env("COLAB_RELEASE_TAG").is_some()
}

/// Checks if the current environment is Colab Enterprise.
pub fn is_colab_enterprise(env: &dyn Fn(&str) -> Option<String>) -> bool {
    deploy_source(env).as_deref() == Some("notebook_colab_enterprise")
}

/// Checks if the current environment is a Workbench instance.
pub fn is_workbench_instance(env: &dyn Fn(&str) -> Option<String>) -> bool {
    deploy_source(env).as_deref() == Some("notebook_workbench")
}

/// Checks if the current environment is VS Code.
pub fn is_vscode(env: &dyn Fn(&str) -> Option<String>) -> bool {
    env("VSCODE_PID").is_some()
}

/// Checks if the current environment is a Jupyter environment.
pub fn is_jupyter(env: &dyn Fn(&str) -> Option<String>) -> bool {
    env("JPY_PARENT_PID").is_some()
}

/// The deployment source recorded by the notebook launcher, if any.
pub fn deploy_source(env: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    env("CLOUD_SDK_COMMAND_NAME")
}

/// Determines the client environment and returns the corresponding label
/// value.
///
/// The generic Jupyter check is last in the order; more specific
/// environments all run inside a Jupyter kernel too.
pub fn client_environment_label(env: &dyn Fn(&str) -> Option<String>) -> &'static str {
    if is_colab_enterprise(env) {
        LABEL_VALUE_COLAB_ENTERPRISE
    } else if is_colab(env) {
        LABEL_VALUE_COLAB
    } else if is_workbench_instance(env) {
        LABEL_VALUE_WORKBENCH
    } else if is_vscode(env) {
        LABEL_VALUE_VSCODE
    } else if is_jupyter(env) {
        LABEL_VALUE_JUPYTER
    } else {
        LABEL_VALUE_UNKNOWN
    }
}

/// Checks if a given VS Code extension is installed under `home`.
///
/// Extension directories are named `<id>-<version>`; a directory counts
/// only if it carries a parseable `package.json` manifest, which filters
/// out corrupted or half-removed installs.
pub fn is_vscode_extension_installed(home: &Path, extension_id: &str) -> bool {
    let extensions_dir = home.join(".vscode").join("extensions");
    let entries = match std::fs::read_dir(&extensions_dir) {
        Ok(entries) => entries,
        Err(_) => return false,
    };

    let prefix = format!("{extension_id}-");
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(&prefix) {
            continue;
        }
        let manifest = path.join("package.json");
        if let Ok(content) = std::fs::read_to_string(&manifest) {
            if serde_json::from_str::<serde_json::Value>(&content).is_ok() {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_unknown_environment() {
        let env = lookup(&[]);
        assert_eq!(client_environment_label(&env), LABEL_VALUE_UNKNOWN);
    }

    #[test]
    fn test_colab() {
        let env = lookup(&[("COLAB_RELEASE_TAG", "release-colab-20250801")]);
        assert!(is_colab(&env));
        assert_eq!(client_environment_label(&env), LABEL_VALUE_COLAB);
    }

    #[test]
    fn test_colab_enterprise_wins_over_colab() {
        let env = lookup(&[
            ("COLAB_RELEASE_TAG", "release"),
            ("CLOUD_SDK_COMMAND_NAME", "notebook_colab_enterprise"),
        ]);
        assert_eq!(
            client_environment_label(&env),
            LABEL_VALUE_COLAB_ENTERPRISE
        );
    }

    #[test]
    fn test_workbench() {
        let env = lookup(&[("CLOUD_SDK_COMMAND_NAME", "notebook_workbench")]);
        assert!(is_workbench_instance(&env));
        assert_eq!(client_environment_label(&env), LABEL_VALUE_WORKBENCH);
    }

    #[test]
    fn test_vscode_wins_over_jupyter() {
        let env = lookup(&[("VSCODE_PID", "4242"), ("JPY_PARENT_PID", "17")]);
        assert_eq!(client_environment_label(&env), LABEL_VALUE_VSCODE);
    }

    #[test]
    fn test_jupyter_is_last() {
        let env = lookup(&[("JPY_PARENT_PID", "17")]);
        assert_eq!(client_environment_label(&env), LABEL_VALUE_JUPYTER);
    }

    #[test]
    fn test_vscode_extension_missing_dir() {
        let home = tempfile::tempdir().unwrap();
        assert!(!is_vscode_extension_installed(
            home.path(),
            GOOGLE_CLOUD_CODE_EXTENSION
        ));
    }

    #[test]
    fn test_vscode_extension_installed() {
        let home = tempfile::tempdir().unwrap();
        let ext_dir = home
            .path()
            .join(".vscode")
            .join("extensions")
            .join(format!("{GOOGLE_CLOUD_CODE_EXTENSION}-2.1.0"));
        std::fs::create_dir_all(&ext_dir).unwrap();
        std::fs::write(ext_dir.join("package.json"), "{\"name\": \"cloudcode\"}").unwrap();

        assert!(is_vscode_extension_installed(
            home.path(),
            GOOGLE_CLOUD_CODE_EXTENSION
        ));
    }

    #[test]
    fn test_vscode_extension_corrupt_manifest() {
        let home = tempfile::tempdir().unwrap();
        let ext_dir = home
            .path()
            .join(".vscode")
            .join("extensions")
            .join(format!("{GOOGLE_CLOUD_CODE_EXTENSION}-2.1.0"));
        std::fs::create_dir_all(&ext_dir).unwrap();
        std::fs::write(ext_dir.join("package.json"), "{not json").unwrap();

        assert!(!is_vscode_extension_installed(
            home.path(),
            GOOGLE_CLOUD_CODE_EXTENSION
        ));
    }
}
