//! rigdna CLI - Inspect RDNA containers and transcode them to JSON.

use std::env;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use rigdna::rdna::format::{HEADER_SIZE, TOC_ENTRY_SIZE};
use rigdna::{transcode, BinaryReader, IStream, Layer, LayerMask};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "warn";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "off",
            _ => filtered_args.push(arg),
        }
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rigdna={}", level)));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    if filtered_args.is_empty() {
        print_usage(&args[0]);
        return ExitCode::FAILURE;
    }

    match filtered_args[0] {
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Usage: {} info <file.rdna>", args[0]);
                return ExitCode::FAILURE;
            }
            cmd_info(filtered_args[1])
        }
        "json" | "j" => {
            if filtered_args.len() < 3 {
                eprintln!("Usage: {} json <in.rdna> <out.json> [layers]", args[0]);
                return ExitCode::FAILURE;
            }
            let selection = filtered_args.get(3).copied().unwrap_or("all");
            cmd_json(filtered_args[1], filtered_args[2], selection)
        }
        "help" | "h" | "-h" | "--help" => {
            print_usage(&args[0]);
            ExitCode::SUCCESS
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(&args[0]);
            ExitCode::FAILURE
        }
    }
}

fn print_usage(prog: &str) {
    println!(
        "rigdna CLI - Inspect and transcode RDNA containers (built {} {})",
        env!("RIGDNA_BUILD_DATE"),
        env!("RIGDNA_BUILD_TIME")
    );
    println!();
    println!("Usage: {} [options] <command> ...", prog);
    println!();
    println!("Commands:");
    println!("  i, info <file.rdna>                      Show header and section summary");
    println!("  j, json <in.rdna> <out.json> [layers]    Transcode to JSON");
    println!("  h, help                                  Show this help");
    println!();
    println!("Layer selections:");
    println!("  all (default), descriptor, definition, behavior, geometry,");
    println!("  all-except-blend-shapes");
    println!();
    println!("Options:");
    println!("  -v, --verbose  Debug output");
    println!("  -vv, --trace   Trace output (very verbose)");
    println!("  -q, --quiet    Suppress output");
}

fn cmd_info(path: &str) -> ExitCode {
    let stream = match IStream::open(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let header = stream
        .read_bytes(0, HEADER_SIZE)
        .and_then(|bytes| BinaryReader::parse_header(&bytes));
    let header = match header {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Not a readable RDNA file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Container: {}", path);
    println!("Version:   {}", header.version);
    println!("Size:      {} bytes", stream.size());
    println!();

    match BinaryReader::read_toc(&stream, &header) {
        Ok(toc) => {
            println!("Sections ({}):", toc.len());
            for entry in &toc {
                let name = Layer::from_section_id(entry.layer_id)
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| format!("unknown (id {})", entry.layer_id));
                println!(
                    "  {:<12} offset {:>8}  length {:>10}",
                    name, entry.offset, entry.length
                );
            }
            let toc_end = header.toc_offset + (toc.len() * TOC_ENTRY_SIZE) as u64;
            println!();
            println!("TOC ends at byte {}", toc_end);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to read table of contents: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_json(input: &str, output: &str, selection: &str) -> ExitCode {
    let mask: LayerMask = match selection.parse() {
        Ok(mask) => mask,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match transcode(input, output, mask) {
        Ok(()) => {
            println!("Wrote {} ({})", output, mask);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Transcode failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
