use assert_cmd::cargo::cargo_bin_cmd;

fn help_output(args: &[&str]) -> String {
    let assert = cargo_bin_cmd!("wheelhouse").args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 help")
}

#[test]
fn top_level_help_lists_commands() {
    let output = help_output(&["--help"]);
    assert!(
        output.contains("offline wheel mirror builder"),
        "tagline missing: {output}"
    );
    assert!(output.contains("resolve"), "resolve missing: {output}");
    assert!(output.contains("mirror"), "mirror missing: {output}");
    assert!(output.contains("--json"), "global flags missing: {output}");
}

#[test]
fn mirror_help_shows_target_flags_and_install_example() {
    let output = help_output(&["mirror", "--help"]);
    for flag in [
        "--platform",
        "--python",
        "--implementation",
        "--wishlist",
        "--output",
        "--dry-run",
    ] {
        assert!(output.contains(flag), "{flag} missing: {output}");
    }
    assert!(
        output.contains("WHEELHOUSE_OUTPUT"),
        "env fallback missing: {output}"
    );
    assert!(
        output.contains("pip install --index-url file://$PWD/offline_mirror/"),
        "install example missing: {output}"
    );
}

#[test]
fn resolve_help_mentions_defaults() {
    let output = help_output(&["resolve", "--help"]);
    assert!(
        output.contains("manylinux_2_17_x86_64"),
        "default platform missing: {output}"
    );
    assert!(output.contains("wishlist.txt"), "default wishlist missing: {output}");
}
