//! End-to-end tests for the tx2genome binary

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const TRANSCRIPTS: &str = "TR1\tCHR1\t3\t8M7D6X2I2M11D7M\nTR2\tCHR2\t10\t20M\n";
const QUERIES: &str = "TR1\t4\nTR2\t0\nTR1\t13\nTR2\t10\n";
const EXPECTED: &str = "TR1\t4\tCHR1\t7\nTR2\t0\tCHR2\t10\nTR1\t13\tCHR1\t23\nTR2\t10\tCHR2\t20\n";

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn run_tool(transcripts: &Path, queries: &Path, output: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tx2genome"))
        .arg("-t")
        .arg(transcripts)
        .arg("-q")
        .arg(queries)
        .arg("-o")
        .arg(output)
        .args(extra)
        .output()
        .expect("failed to run tx2genome")
}

struct Fixture {
    dir: TempDir,
    transcripts: PathBuf,
    queries: PathBuf,
    output: PathBuf,
}

fn fixture(transcripts: &str, queries: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let transcripts = write_file(dir.path(), "transcripts.tsv", transcripts);
    let queries = write_file(dir.path(), "queries.tsv", queries);
    let output = dir.path().join("out.tsv");
    Fixture {
        dir,
        transcripts,
        queries,
        output,
    }
}

#[test]
fn test_maps_reference_example() {
    let f = fixture(TRANSCRIPTS, QUERIES);
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read_to_string(&f.output).unwrap(), EXPECTED);
    assert!(String::from_utf8_lossy(&out.stderr).contains("Chromosomes:     2"));
}

#[test]
fn test_unaligned_offset_written_as_minus_one() {
    let f = fixture(TRANSCRIPTS, "TR2\t20\nTR2\t19\n");
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(out.status.success());
    assert_eq!(
        fs::read_to_string(&f.output).unwrap(),
        "TR2\t20\tCHR2\t-1\nTR2\t19\tCHR2\t29\n"
    );
}

#[test]
fn test_duplicate_transcript_produces_no_output() {
    let f = fixture("TR1\tCHR1\t3\t4M\nTR1\tCHR1\t9\t4M\n", "TR1\t0\n");
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Duplicate transcript ID 'TR1'"));
    assert!(!f.output.exists());
}

#[test]
fn test_unknown_transcript_produces_no_output() {
    let f = fixture(TRANSCRIPTS, "TR1\t0\nTR3\t1\n");
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Unknown transcript ID 'TR3'"));
    assert!(!f.output.exists());
}

#[test]
fn test_malformed_alignment_rejected_before_queries() {
    let f = fixture("TR1\tCHR1\t3\t4M2S\n", "TR1\t0\n");
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid alignment '4M2S'"), "{}", stderr);
    assert!(!f.output.exists());
}

#[test]
fn test_unaligned_offset_logged_at_debug() {
    let f = fixture(TRANSCRIPTS, "TR2\t20\n");
    let out = Command::new(env!("CARGO_BIN_EXE_tx2genome"))
        .args(["-t", f.transcripts.to_str().unwrap()])
        .args(["-q", f.queries.to_str().unwrap()])
        .args(["-o", f.output.to_str().unwrap()])
        .env("RUST_LOG", "debug")
        .output()
        .expect("failed to run tx2genome");
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Offset 20 is past the aligned span of TR2"), "{}", stderr);
}

#[test]
fn test_skip_mode_rejects_undecodable_query() {
    let f = fixture(TRANSCRIPTS, "");
    fs::write(&f.queries, b"TR1\t4\n\xff\t1\nTR2\t0\n").unwrap();

    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(!out.status.success());
    assert!(!f.output.exists());
    assert!(String::from_utf8_lossy(&out.stderr).contains("line 2: line is not valid UTF-8"));

    let out = run_tool(&f.transcripts, &f.queries, &f.output, &["--on-error", "skip"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        fs::read_to_string(&f.output).unwrap(),
        "TR1\t4\tCHR1\t7\nTR2\t0\tCHR2\t10\n"
    );
    let unmap = fs::read_to_string(f.dir.path().join("out.tsv.unmap")).unwrap();
    assert!(unmap.contains("not valid UTF-8"), "{}", unmap);
}

#[test]
fn test_skip_mode_writes_unmap_file() {
    let f = fixture(TRANSCRIPTS, "TR1\t4\nTR3\t1\nTR2\tx\nTR2\t0\n");
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &["--on-error", "skip"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        fs::read_to_string(&f.output).unwrap(),
        "TR1\t4\tCHR1\t7\nTR2\t0\tCHR2\t10\n"
    );

    let unmap = fs::read_to_string(f.dir.path().join("out.tsv.unmap")).unwrap();
    let lines: Vec<&str> = unmap.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("TR3\t1\tFail\t"));
    assert!(lines[1].starts_with("TR2\tx\tFail\t"));
}

#[test]
fn test_strict_compat_mode() {
    let f = fixture("TR1\tCHR1\t0\t2MDI3M\n", "TR1\t2\n");

    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(!out.status.success());

    // 2MDI3M reads as 2M1DI3M; the bare I is dropped
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &["--compat-mode", "strict"]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&f.output).unwrap(), "TR1\t2\tCHR1\t3\n");
}

#[test]
fn test_parallel_threads_preserve_order() {
    let mut queries = String::new();
    let mut expected = String::new();
    for i in 0..30_000u64 {
        let offset = i % 25;
        queries.push_str(&format!("TR2\t{}\n", offset));
        let pos = if offset < 20 { (10 + offset) as i64 } else { -1 };
        expected.push_str(&format!("TR2\t{}\tCHR2\t{}\n", offset, pos));
    }
    let f = fixture(TRANSCRIPTS, &queries);
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &["-j", "4", "--quiet"]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&f.output).unwrap(), expected);
}

#[test]
fn test_gzip_inputs() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let dir = tempfile::tempdir().unwrap();
    let gz = |name: &str, content: &str| {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        let path = dir.path().join(name);
        fs::write(&path, encoder.finish().unwrap()).unwrap();
        path
    };
    let transcripts = gz("transcripts.tsv.gz", TRANSCRIPTS);
    let queries = gz("queries.tsv.gz", QUERIES);
    let output = dir.path().join("out.tsv");

    let out = run_tool(&transcripts, &queries, &output, &[]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), EXPECTED);
}

#[test]
fn test_custom_chrom_prefix() {
    let f = fixture("TR1\tchr1\t3\t4M\n", "TR1\t1\n");
    let out = run_tool(&f.transcripts, &f.queries, &f.output, &[]);
    assert!(!out.status.success());

    let out = run_tool(&f.transcripts, &f.queries, &f.output, &["--chrom-prefix", "chr"]);
    assert!(out.status.success());
    assert_eq!(fs::read_to_string(&f.output).unwrap(), "TR1\t1\tchr1\t4\n");
}
