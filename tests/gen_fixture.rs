//! Integration test driving `gen` end-to-end over a small fixture tree, in
//! the style of the teacher's `tests/testsuite` crate — scaled down, since
//! quarry's "gen" runs in-process rather than needing a process-spawning
//! `cargo_test_support`-style harness.

use quarry::core::label_pattern::LabelPattern;
use quarry::ops;
use quarry::util::shell::{ColorConfig, Shell, Verbosity};
use quarry_platform::{Label, SourceDir};

fn write(dir: &std::path::Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();

    write(
        tmp.path(),
        ".quarry",
        concat!(
            "default_toolchain = \"//build/toolchain:host\"\n",
            "default_args = {\n",
            "  is_debug = true\n",
            "}\n",
        ),
    );

    write(
        tmp.path(),
        "build/toolchain/BUILD.quarry",
        concat!(
            "toolchain(\"host\") {\n",
            "  tool(\"link\") {\n",
            "    command = \"ld -o {{output}} {{inputs}}\"\n",
            "  }\n",
            "  tool(\"alink\") {\n",
            "    command = \"ar rcs {{output}} {{inputs}}\"\n",
            "  }\n",
            "}\n",
        ),
    );

    write(
        tmp.path(),
        "base/BUILD.quarry",
        concat!(
            "config(\"base_config\") {\n",
            "  defines = [ \"BASE_IMPLEMENTATION\" ]\n",
            "}\n",
            "\n",
            "source_set(\"base\") {\n",
            "  sources = [ \"base.cc\" ]\n",
            "  public_configs = [ \":base_config\" ]\n",
            "  libs = [ \"pthread\" ]\n",
            "}\n",
        ),
    );

    write(
        tmp.path(),
        "app/BUILD.quarry",
        concat!(
            "executable(\"app\") {\n",
            "  sources = [ \"main.cc\" ]\n",
            "  deps = [ \"//base:base\" ]\n",
            "  if (is_debug) {\n",
            "    defines = [ \"DEBUG\" ]\n",
            "  }\n",
            "}\n",
        ),
    );

    tmp
}

#[test]
fn gen_resolves_every_target_in_the_fixture_tree() {
    let tmp = fixture();
    let mut shell = Shell::new(ColorConfig::Never, Verbosity::Quiet);

    let result = ops::gen(tmp.path(), SourceDir::new("//out/Debug/"), &[], 2, &mut shell)
        .expect("fixture tree should generate cleanly");

    assert!(result.registry.len() >= 4, "expected at least app, base, base_config and the toolchain");

    let app = Label::parse(&SourceDir::root(), Some(&result.default_toolchain), "//app:app").unwrap();
    let desc = ops::desc::describe(&result.registry, &app).expect("app should describe");
    assert_eq!(desc.output_type, "executable");
    assert_eq!(desc.deps, vec!["//base:base(//build/toolchain:host)".to_string()]);
    assert!(desc.all_libs.contains(&"pthread".to_string()));

    ops::check::check(&result.registry).expect("fixture tree has no visibility violations");

    let pattern = LabelPattern::parse(&SourceDir::root(), Some(&result.default_toolchain), "//base:base").unwrap();
    let dependents = ops::refs::refs(&result.registry, &[pattern]);
    let names: Vec<_> = dependents.iter().map(|l| l.display_name(false)).collect();
    assert_eq!(names, vec!["//app:app".to_string()]);
}

#[test]
fn cli_args_override_the_dotfiles_default_args() {
    let tmp = fixture();
    let mut shell = Shell::new(ColorConfig::Never, Verbosity::Quiet);

    let result = ops::gen(
        tmp.path(),
        SourceDir::new("//out/Release/"),
        &[("is_debug".to_string(), "false".to_string())],
        1,
        &mut shell,
    )
    .expect("fixture tree should generate cleanly with overridden args");

    let app = Label::parse(&SourceDir::root(), Some(&result.default_toolchain), "//app:app").unwrap();
    let desc = ops::desc::describe(&result.registry, &app).expect("app should describe");
    assert!(!desc.sources.is_empty());
}
