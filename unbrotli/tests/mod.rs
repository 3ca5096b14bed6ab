//! Asset test suite for unbrotli.
//!
//! Run `python generate_test_inputs.py` to regenerate the streams and their
//! expected output with the reference implementation.

use std::any::Any;
use std::fs;
use std::panic::{AssertUnwindSafe, PanicHookInfo, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Deserialize;
use unbrotli::{DecodeError, Decompressor, ErrorCode, Status};

const REPLACE: Option<&str> = option_env!("REPLACE");

static WORKSPACE_PATH: LazyLock<PathBuf> =
    LazyLock::new(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));

static SNAPSHOTS_PATH: LazyLock<PathBuf> = LazyLock::new(|| WORKSPACE_PATH.join("snapshots"));
static TEST_INPUTS_PATH: LazyLock<PathBuf> = LazyLock::new(|| WORKSPACE_PATH.join("test-inputs"));

const INPUT_MANIFESTS: &[(&str, &str)] = &[("reference", "manifest_reference.json")];

/// Chunk sizes used when feeding a stream piecemeal.
const CHUNK_SIZES: &[usize] = &[1, 13, 4096];

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ManifestEntry {
    Decodes {
        id: String,
        /// Name of the snapshot holding the decoded bytes.
        expected: String,
    },
    Fails {
        id: String,
        error: String,
    },
}

impl ManifestEntry {
    fn id(&self) -> &str {
        match self {
            Self::Decodes { id, .. } | Self::Fails { id, .. } => id,
        }
    }
}

enum Expectation {
    Output { snapshot: PathBuf },
    Error(ErrorCode),
}

struct AssetEntry {
    input_relative_path: PathBuf,
    display_name: String,
    expectation: Expectation,
}

impl AssetEntry {
    fn new(namespace: &str, entry: &ManifestEntry) -> Result<Self, String> {
        let id = entry.id();
        let expectation = match entry {
            ManifestEntry::Decodes { expected, .. } => Expectation::Output {
                snapshot: Path::new(namespace).join(expected).with_extension("bin"),
            },
            ManifestEntry::Fails { error, .. } => Expectation::Error(parse_error_code(error)?),
        };

        Ok(Self {
            input_relative_path: Path::new(namespace).join(id).with_extension("br"),
            display_name: format!("{namespace}/{id}"),
            expectation,
        })
    }
}

fn parse_error_code(name: &str) -> Result<ErrorCode, String> {
    match name {
        "NeedMoreInput" => Ok(ErrorCode::NeedMoreInput),
        "SyntaxError" => Ok(ErrorCode::SyntaxError),
        "HuffmanLengthError" => Ok(ErrorCode::HuffmanLengthError),
        _ => Err(format!("unknown error code `{name}` in manifest")),
    }
}

struct TestReport {
    name: String,
    duration: Duration,
    outcome: Result<(), String>,
}

fn main() {
    let _panic_hook_guard = PanicHookGuard::install();
    if !run_harness() {
        std::process::exit(1);
    }
}

fn run_harness() -> bool {
    let asset_files = match collect_asset_files() {
        Ok(files) => files,
        Err(err) => {
            eprintln!("Failed to read asset directory: {err}");
            return false;
        }
    };

    if asset_files.is_empty() {
        eprintln!("No test inputs were found. Run `python generate_test_inputs.py` to create them.");
        return false;
    }

    let progress_bar = ProgressBar::new(asset_files.len() as u64);
    progress_bar.set_style(
        ProgressStyle::with_template("{spinner} {pos}/{len} [{elapsed_precise}] [{wide_bar}] {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );

    let reports: Vec<TestReport> = asset_files
        .par_iter()
        .map(|asset| {
            let name = asset.display_name.clone();
            progress_bar.set_message(name.clone());
            let start = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| run_asset_test(asset))).unwrap_or_else(
                |payload| {
                    let panic_msg = describe_panic(payload.as_ref());
                    Err(format!("panic: {panic_msg}"))
                },
            );
            progress_bar.inc(1);
            TestReport {
                name,
                duration: start.elapsed(),
                outcome,
            }
        })
        .collect();

    progress_bar.finish_with_message("asset tests complete");

    println!("\nDetailed results:");
    for report in &reports {
        match &report.outcome {
            Ok(_) => println!("[PASS] {:<40} ({:.2?})", report.name, report.duration),
            Err(err) => {
                println!("[FAIL] {:<40} ({:.2?})", report.name, report.duration);
                println!("       {err}");
            }
        }
    }

    let failures: Vec<_> = reports
        .iter()
        .filter_map(|report| report.outcome.as_ref().err().map(|err| (&report.name, err)))
        .collect();

    if failures.is_empty() {
        true
    } else {
        println!(
            "\n{} of {} asset tests failed:",
            failures.len(),
            reports.len()
        );

        for (name, err) in failures {
            println!(" - {name}: {err}");
        }

        false
    }
}

fn describe_panic(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_owned()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[allow(clippy::type_complexity)]
struct PanicHookGuard(Option<Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>>);

impl PanicHookGuard {
    fn install() -> Self {
        let previous = std::panic::take_hook();
        // Panics are reported per asset instead.
        std::panic::set_hook(Box::new(|_| {}));
        Self(Some(previous))
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            std::panic::set_hook(previous);
        }
    }
}

fn collect_asset_files() -> Result<Vec<AssetEntry>, String> {
    let mut files = vec![];

    for (namespace, manifest_rel_path) in INPUT_MANIFESTS {
        let manifest_path = WORKSPACE_PATH.join(manifest_rel_path);

        if !manifest_path.exists() {
            continue;
        }

        let content = fs::read_to_string(&manifest_path)
            .map_err(|err| format!("failed to read manifest {}: {err}", manifest_path.display()))?;
        let entries: Vec<ManifestEntry> = serde_json::from_str(&content).map_err(|err| {
            format!(
                "failed to parse manifest {}: {err}",
                manifest_path.display()
            )
        })?;

        for entry in &entries {
            let asset_entry = AssetEntry::new(namespace, entry)?;

            if !TEST_INPUTS_PATH
                .join(&asset_entry.input_relative_path)
                .exists()
            {
                continue;
            }

            files.push(asset_entry);
        }
    }

    files.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(files)
}

/// Feed `data` in chunks of `chunk_size`, draining the output after every
/// chunk. Returns the output and the final status code.
fn decompress_chunked(data: &[u8], chunk_size: usize) -> (Vec<u8>, ErrorCode) {
    let mut decompressor = Decompressor::new();
    let mut output = Vec::new();
    let mut code = ErrorCode::NeedMoreInput;

    for chunk in data.chunks(chunk_size) {
        let result = decompressor.decompress_chunk(chunk);
        output.extend(decompressor.take_output());

        match result {
            Ok(status) => code = status.code(),
            Err(err) => return (output, err.code()),
        }

        if code != ErrorCode::NeedMoreInput {
            break;
        }
    }

    assert_eq!(decompressor.bytes_written(), output.len());

    (output, code)
}

fn run_asset_test(asset: &AssetEntry) -> Result<(), String> {
    let asset_path = TEST_INPUTS_PATH.join(&asset.input_relative_path);
    let asset_name = &asset.display_name;

    let data = fs::read(&asset_path).map_err(|err| format!("failed to read {asset_name}: {err}"))?;
    let one_shot = unbrotli::decompress(&data);

    match &asset.expectation {
        Expectation::Error(expected) => {
            let code = one_shot.as_ref().map_err(DecodeError::code).err();

            if code != Some(*expected) {
                return Err(format!("expected {expected}, got {one_shot:?}"));
            }

            for &chunk_size in CHUNK_SIZES {
                let (_, code) = decompress_chunked(&data, chunk_size);

                if code != *expected {
                    return Err(format!(
                        "expected {expected} with chunks of {chunk_size}, got {code}"
                    ));
                }
            }

            Ok(())
        }
        Expectation::Output { snapshot } => {
            let output = one_shot.map_err(|err| format!("decode failed: {err}"))?;
            let snapshot_path = SNAPSHOTS_PATH.join(snapshot);

            if !snapshot_path.exists() || REPLACE.is_some() {
                fs::write(&snapshot_path, &output)
                    .map_err(|err| format!("failed to write snapshot for {asset_name}: {err}"))?;
                return Err(format!("snapshot was written for {asset_name}"));
            }

            let expected = fs::read(&snapshot_path)
                .map_err(|err| format!("failed to load snapshot for {asset_name}: {err}"))?;

            if let Some(pos) = first_difference(&expected, &output) {
                return Err(format!(
                    "output differs at byte {pos} ({} bytes expected, {} decoded)",
                    expected.len(),
                    output.len()
                ));
            }

            for &chunk_size in CHUNK_SIZES {
                let (chunked, code) = decompress_chunked(&data, chunk_size);

                if !matches!(code, ErrorCode::Ok | ErrorCode::End) {
                    return Err(format!("chunks of {chunk_size} ended with {code}"));
                }

                if let Some(pos) = first_difference(&expected, &chunked) {
                    return Err(format!(
                        "output with chunks of {chunk_size} differs at byte {pos}"
                    ));
                }
            }

            let mut decompressor = Decompressor::new();
            let status = decompressor
                .decompress_chunk(&data)
                .map_err(|err| format!("decode failed: {err}"))?;

            if status == Status::NeedMoreInput {
                return Err("stream is incomplete".to_owned());
            }

            Ok(())
        }
    }
}

fn first_difference(expected: &[u8], actual: &[u8]) -> Option<usize> {
    expected
        .iter()
        .zip(actual)
        .position(|(a, b)| a != b)
        .or_else(|| (expected.len() != actual.len()).then(|| expected.len().min(actual.len())))
}
