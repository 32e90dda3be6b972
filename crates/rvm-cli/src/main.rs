use std::{env, fs, process::ExitCode, time::Instant};

use rvm::{decode, program::PoolEntry, resolve_type};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let file_path = if args.len() > 1 { &args[1] } else { "example.json" };
    let json = match read_file(file_path) {
        Ok(json) => json,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let raw: Vec<serde_json::Value> = match serde_json::from_str(&json) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("error: malformed Packed Program JSON: {err}");
            return ExitCode::FAILURE;
        }
    };

    let entries = match raw.into_iter().map(pool_entry_from_json).collect::<Result<Vec<_>, _>>() {
        Ok(entries) => entries,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let program = decode(entries);

    let start = Instant::now();
    let result = resolve_type(&program, Vec::new());
    let elapsed = start.elapsed();

    match result {
        Ok(node) => {
            eprintln!("success after: {elapsed:?}");
            match serde_json::to_string_pretty(&node) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: failed to serialize resolved type: {err}");
                    ExitCode::FAILURE
                }
            }
        }
        Err(err) => {
            eprintln!("error after: {elapsed:?}\n{err}");
            ExitCode::FAILURE
        }
    }
}

/// The CLI only accepts the JSON-representable pool entries (string,
/// number, bool). `ClassThunk`/`ProgramThunk`/`ValueThunk` entries are
/// closures over host-language values and have no JSON form; a Packed
/// Program that needs them has to be driven through the library directly.
fn pool_entry_from_json(value: serde_json::Value) -> Result<PoolEntry, String> {
    match value {
        serde_json::Value::String(s) => Ok(PoolEntry::String(s)),
        serde_json::Value::Number(n) => n.as_f64().map(PoolEntry::Number).ok_or_else(|| format!("pool number out of range: {n}")),
        serde_json::Value::Bool(b) => Ok(PoolEntry::Bool(b)),
        other => Err(format!("unsupported pool entry in CLI input: {other}")),
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    eprintln!("Reading file: {file_path}");
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("Error: {file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("Error reading {file_path}: {err}"));
        }
    }
    match fs::read_to_string(file_path) {
        Ok(contents) => Ok(contents),
        Err(err) => Err(format!("Error reading file: {err}")),
    }
}
