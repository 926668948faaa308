use test_generator::test_resources;

use tracelang_cli::{Config, RunResult};

#[test_resources("tracelang-cli/tests/samples/good/**/*.tl")]
fn good_script_compiles(path: &str) {
    assert_eq!(check(path), RunResult::Ok)
}

#[test_resources("tracelang-cli/tests/samples/compile_error/**/*.tl")]
fn bad_script_is_rejected(path: &str) {
    assert_eq!(check(path), RunResult::CompilerError)
}

fn check(path: &str) -> RunResult {
    tracelang_cli::run(Config {
        source_path: Some(relative_to_crate(path)),
        ..Config::default()
    })
}

// Resource paths are relative to the workspace, while tests run from the crate directory.
fn relative_to_crate(path: &str) -> String {
    path.splitn(2, '/').nth(1).unwrap_or(path).to_string()
}
