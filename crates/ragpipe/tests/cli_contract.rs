use predicates::prelude::*;

#[test]
fn version_flag_prints_name_and_version() {
    assert_cmd::Command::cargo_bin("ragpipe")
        .unwrap()
        .arg("--version")
        .env("RAGPIPE_DOTENV", "0")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ragpipe "));
}

#[test]
fn help_documents_the_query_and_tool_flags() {
    assert_cmd::Command::cargo_bin("ragpipe")
        .unwrap()
        .arg("--help")
        .env("RAGPIPE_DOTENV", "0")
        .assert()
        .success()
        .stdout(predicate::str::contains("--tool"))
        .stdout(predicate::str::contains("--top-k"))
        .stdout(predicate::str::contains("--save-history"));
}

#[test]
fn missing_search_credentials_fail_fast_with_a_short_message() {
    assert_cmd::Command::cargo_bin("ragpipe")
        .unwrap()
        .args(["what", "is", "rust"])
        .env_clear()
        .env("RAGPIPE_DOTENV", "0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no search tool configured"));
}

#[test]
fn missing_embedding_credentials_fail_fast_after_tool_selection() {
    assert_cmd::Command::cargo_bin("ragpipe")
        .unwrap()
        .args(["what", "is", "rust"])
        .env_clear()
        .env("RAGPIPE_DOTENV", "0")
        .env("RAGPIPE_EXA_API_KEY", "test")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("RAGPIPE_EMBED_API_KEY"));
}

#[test]
fn invalid_chunk_geometry_is_rejected_before_any_network_use() {
    assert_cmd::Command::cargo_bin("ragpipe")
        .unwrap()
        .args([
            "what",
            "is",
            "rust",
            "--chunk-size",
            "100",
            "--chunk-overlap",
            "100",
        ])
        .env_clear()
        .env("RAGPIPE_DOTENV", "0")
        .env("RAGPIPE_EXA_API_KEY", "test")
        .env("RAGPIPE_EMBED_API_KEY", "test")
        .env("RAGPIPE_FIRECRAWL_API_KEY", "test")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("chunk_overlap"));
}
