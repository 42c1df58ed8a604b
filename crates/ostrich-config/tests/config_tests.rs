//! Site configuration loading and layering tests

use ostrich_config::{ConfigError, ConfigLoader, SiteConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_site(dir: &Path, content: &str) -> PathBuf {
    let config_path = dir.join("site.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

const OSTRICH_SITE: &str = r##"
[site]
modules = ["AddressBook", "Writer", "Reader"]

[common]
cc = "clang"
cxx = "clang++"
flags = ["-std=c++11", "-Wall", "-fvectorize", "-fslp-vectorize"]
include_paths = ["#$BUILDROOT"]

[flavors.debug]
flags = ["-g"]
defines = ["DEBUG"]

[flavors.release]
flags = ["-O2"]
defines = ["NDEBUG"]

[ext_libs.protobuf]
libs = ["protobuf"]
"##;

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_from_file_sets_project_root() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_site(temp_dir.path(), OSTRICH_SITE);

    let config = ConfigLoader::new().ignore_env(true).load_from_file(&path).unwrap();

    assert_eq!(config.project_root(), temp_dir.path());
    assert_eq!(
        config.site.site.modules,
        vec!["AddressBook".to_string(), "Writer".to_string(), "Reader".to_string()]
    );
    assert_eq!(config.site.common.include_paths, vec!["#$BUILDROOT"]);
}

#[test]
fn test_load_from_nested_module_directory() {
    let temp_dir = TempDir::new().unwrap();
    create_site(temp_dir.path(), OSTRICH_SITE);
    let module_dir = temp_dir.path().join("Writer");
    fs::create_dir(&module_dir).unwrap();

    let config = ConfigLoader::new()
        .ignore_env(true)
        .load_from_directory(&module_dir)
        .unwrap();

    assert_eq!(config.project_root(), temp_dir.path());
}

#[test]
fn test_invalid_toml_reports_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_site(temp_dir.path(), "[site\nmodules = [");

    let err = ConfigLoader::new().load_from_file(&path).unwrap_err();
    match err {
        ConfigError::TomlParseError { file, .. } => assert_eq!(file, path),
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Flavor layering
// ============================================================================

#[rstest]
#[case("debug", vec!["-std=c++11", "-Wall", "-fvectorize", "-fslp-vectorize", "-g"], vec!["DEBUG"])]
#[case("release", vec!["-std=c++11", "-Wall", "-fvectorize", "-fslp-vectorize", "-O2"], vec!["NDEBUG"])]
fn test_flavor_settings_extend_common(
    #[case] flavor: &str,
    #[case] flags: Vec<&str>,
    #[case] defines: Vec<&str>,
) {
    let config = SiteConfig::parse(OSTRICH_SITE, Path::new("site.toml")).unwrap();
    let settings = config.flavor_settings(flavor).unwrap();

    assert_eq!(settings.flags, flags);
    assert_eq!(settings.defines, defines);
    assert_eq!(settings.cxx.as_deref(), Some("clang++"));
}

#[rstest]
#[case("debug", true)]
#[case("release", true)]
#[case("profile", false)]
#[case("", false)]
fn test_has_flavor(#[case] name: &str, #[case] expected: bool) {
    let config = SiteConfig::parse(OSTRICH_SITE, Path::new("site.toml")).unwrap();
    assert_eq!(config.has_flavor(name), expected);
}

#[test]
fn test_header_only_ext_lib_with_libs_is_rejected() {
    let content = r#"
[flavors.debug]

[ext_libs.boost_any]
header_only = true
libs = ["boost_any"]
"#;
    let result = SiteConfig::parse(content, Path::new("site.toml"));
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}
