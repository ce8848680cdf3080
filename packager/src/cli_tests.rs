//! Tests for CLI parsing.

use super::*;
use clap::CommandFactory;
use rstest::rstest;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn analyze_parses_root_and_json() {
    let cli = Cli::parse_from(["s32ds-packager", "analyze", "/opt/s32ds", "--json", "a.json"]);
    let Command::Analyze(args) = cli.command else {
        panic!("expected analyze");
    };
    assert_eq!(args.installer_root, Utf8PathBuf::from("/opt/s32ds"));
    assert_eq!(args.json, Some(Utf8PathBuf::from("a.json")));
}

#[test]
fn build_defaults_to_packages_dir_and_all_components() {
    let cli = Cli::parse_from(["s32ds-packager", "build", "/opt/s32ds"]);
    let Command::Build(args) = cli.command else {
        panic!("expected build");
    };
    assert_eq!(args.output, Utf8PathBuf::from("packages"));
    assert!(args.platform_root.is_none());
    assert_eq!(args.components(), ComponentKind::BUILD_ORDER.to_vec());
}

#[rstest]
#[case::toolchain("--toolchain-only", ComponentKind::Toolchain)]
#[case::pegdbserver("--pegdbserver-only", ComponentKind::DebuggerServer)]
#[case::ewl("--ewl-only", ComponentKind::RuntimeLibrary)]
#[case::drivers("--drivers-only", ComponentKind::Drivers)]
fn build_only_flags_select_one_component(#[case] flag: &str, #[case] kind: ComponentKind) {
    let cli = Cli::parse_from(["s32ds-packager", "build", "/opt/s32ds", flag]);
    let Command::Build(args) = cli.command else {
        panic!("expected build");
    };
    assert_eq!(args.components(), vec![kind]);
}

#[test]
fn build_only_flags_are_exclusive() {
    let result = Cli::try_parse_from([
        "s32ds-packager",
        "build",
        "/opt/s32ds",
        "--toolchain-only",
        "--ewl-only",
    ]);
    assert!(result.is_err());
}

#[rstest]
#[case::key("pegdbserver", ComponentKind::DebuggerServer)]
#[case::alias("ewl", ComponentKind::RuntimeLibrary)]
fn package_parses_component(#[case] value: &str, #[case] kind: ComponentKind) {
    let cli = Cli::parse_from([
        "s32ds-packager",
        "package",
        "/opt/s32ds",
        "dist",
        "--component",
        value,
    ]);
    let Command::Package(args) = cli.command else {
        panic!("expected package");
    };
    assert_eq!(args.component, kind);
    assert!(!args.keep_remote_url);
}

#[test]
fn package_rejects_unknown_component() {
    let result = Cli::try_parse_from([
        "s32ds-packager",
        "package",
        "/opt/s32ds",
        "dist",
        "--component",
        "openocd",
    ]);
    assert!(result.is_err());
}

#[test]
fn keep_remote_url_requires_a_manifest() {
    let result = Cli::try_parse_from([
        "s32ds-packager",
        "package",
        "/opt/s32ds",
        "dist",
        "--component",
        "toolchain",
        "--keep-remote-url",
    ]);
    assert!(result.is_err());
}

#[test]
fn link_local_collects_search_dirs() {
    let cli = Cli::parse_from([
        "s32ds-packager",
        "link-local",
        "package.json",
        "--search",
        "/a",
        "--search",
        "/b",
    ]);
    let Command::LinkLocal(args) = cli.command else {
        panic!("expected link-local");
    };
    assert_eq!(args.search, vec![Utf8PathBuf::from("/a"), Utf8PathBuf::from("/b")]);
}

#[test]
fn framework_defaults() {
    let cli = Cli::parse_from(["s32ds-packager", "framework"]);
    let Command::Framework(args) = cli.command else {
        panic!("expected framework");
    };
    assert_eq!(args.output, Utf8PathBuf::from("packages/framework"));
    assert!(!args.skip_download);
    assert!(args.url.is_none());
}

#[rstest]
#[case::default(&["s32ds-packager", "analyze", "x"], "info")]
#[case::verbose(&["s32ds-packager", "-v", "analyze", "x"], "debug")]
#[case::very_verbose(&["s32ds-packager", "analyze", "x", "-vv"], "trace")]
#[case::quiet(&["s32ds-packager", "--quiet", "analyze", "x"], "error")]
fn verbosity_flags_pick_log_filter(#[case] argv: &[&str], #[case] expected: &str) {
    let cli = Cli::parse_from(argv.iter().copied());
    assert_eq!(cli.log_filter_directive(), expected);
}

#[test]
fn verbose_and_quiet_conflict() {
    assert!(Cli::try_parse_from(["s32ds-packager", "-v", "-q", "analyze", "x"]).is_err());
}

#[test]
fn config_flag_is_global() {
    let cli = Cli::parse_from(["s32ds-packager", "analyze", "x", "--config", "p.toml"]);
    assert_eq!(cli.config, Some(Utf8PathBuf::from("p.toml")));
}
