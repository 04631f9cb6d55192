use std::env;
use std::fs;
use std::process;

use chordchart::{cleanup, render, Catalog, ChartDocument, ChartService, MemoryStore, PitchClass};

const USAGE: &str = "Usage: chordchart [--catalog <catalog.yaml>] [--key <tone|pitch>] [--edit] [--cleanup] <chart.yaml> [output.json]
       chordchart [--catalog <catalog.yaml>] --chord-types";

struct Options {
    catalog_path: Option<String>,
    key: Option<String>,
    edit: bool,
    cleanup: bool,
    chord_types: bool,
    input_path: Option<String>,
    output_path: Option<String>,
}

fn usage_error(message: &str) -> ! {
    if !message.is_empty() {
        eprintln!("{}", message);
    }
    eprintln!("{}", USAGE);
    process::exit(1);
}

fn parse_args(args: &[String]) -> Options {
    let mut options = Options {
        catalog_path: None,
        key: None,
        edit: false,
        cleanup: false,
        chord_types: false,
        input_path: None,
        output_path: None,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--catalog" => match iter.next() {
                Some(path) => options.catalog_path = Some(path.clone()),
                None => usage_error("--catalog needs a file"),
            },
            "--key" => match iter.next() {
                Some(key) => options.key = Some(key.clone()),
                None => usage_error("--key needs a tone or pitch class"),
            },
            "--edit" => options.edit = true,
            "--cleanup" => options.cleanup = true,
            "--chord-types" => options.chord_types = true,
            flag if flag.starts_with("--") => usage_error(&format!("Unknown option '{}'", flag)),
            path if options.input_path.is_none() => options.input_path = Some(path.to_string()),
            path if options.output_path.is_none() => options.output_path = Some(path.to_string()),
            extra => usage_error(&format!("Unexpected argument '{}'", extra)),
        }
    }
    options
}

/// Accept "Bb", "F#", ... or a pitch class number
fn parse_target(key: &str) -> Option<PitchClass> {
    match key.parse::<i32>() {
        Ok(value) => PitchClass::new(value).ok(),
        Err(_) => PitchClass::from_name(key),
    }
}

fn print_chord_types(catalog: &Catalog) {
    let (common, more) = catalog.grouped();
    println!("Common:");
    for chord_type in common {
        println!("  {:<8} {}", chord_type.symbol, chord_type.name);
    }
    println!("More:");
    for chord_type in more {
        println!("  {:<8} {}", chord_type.symbol, chord_type.name);
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage_error("");
    }
    let options = parse_args(&args);

    // Catalog
    let custom_catalog;
    let catalog: &Catalog = match &options.catalog_path {
        Some(path) => match Catalog::from_path(path) {
            Ok(catalog) => {
                custom_catalog = catalog;
                &custom_catalog
            }
            Err(e) => {
                eprintln!("Error loading catalog '{}': {}", path, e);
                process::exit(1);
            }
        },
        None => Catalog::standard(),
    };

    if options.chord_types {
        print_chord_types(catalog);
        return;
    }

    let input_path = match &options.input_path {
        Some(path) => path,
        None => usage_error("Missing chart file"),
    };

    let target = match &options.key {
        Some(key) => match parse_target(key) {
            Some(pitch) => Some(pitch),
            None => {
                eprintln!("Unknown key '{}'", key);
                process::exit(1);
            }
        },
        None => None,
    };

    // Load and render
    let result = ChartDocument::from_path(input_path).and_then(|document| {
        if options.edit {
            let mut service = ChartService::new(MemoryStore::new(), catalog);
            let chart_id = service.import(&document)?;
            service.open_for_edit(chart_id, target)
        } else {
            let mut tree = document.into_tree(catalog)?;
            if options.cleanup {
                cleanup(&mut tree)?;
            }
            render(&tree, catalog, target, false)
        }
    });

    let model = match result {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error with chart '{}': {}", input_path, e);
            process::exit(1);
        }
    };

    let json = match serde_json::to_string_pretty(&model) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing render model: {}", e);
            process::exit(1);
        }
    };

    // Output
    match options.output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                eprintln!("Error writing to '{}': {}", path, e);
                process::exit(1);
            }
            eprintln!("Wrote render model to {}", path);
        }
        None => {
            println!("{}", json);
        }
    }
}
