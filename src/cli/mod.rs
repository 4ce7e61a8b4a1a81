mod def;
include!(concat!(env!("OUT_DIR"), "/rustc_version.rs"));
use clap::Parser;
use std::io::{Read, Write};

pub mod log;

use crate::yaml::{self, Document, Error};

impl From<Error> for String {
    fn from(e: Error) -> Self {
        e.to_string()
    }
}

fn load_document(file: Option<&str>) -> Result<Document, Error> {
    match file {
        Some(path) => Document::load_file(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Document::parse(&text)
        }
    }
}

/// Write the serialized document back to the file or to stdout.
fn emit(doc: &mut Document, file: Option<&str>, in_place: bool) -> Result<(), Error> {
    if in_place {
        // clap guarantees a file when --in-place is set
        if let Some(path) = file {
            return doc.save(path);
        }
    }
    let bytes = doc.to_bytes()?;
    std::io::stdout().write_all(&bytes)?;
    Ok(())
}

/// Missing paths exit quietly with status 1 under `-q`.
fn quiet_miss(e: Error, quiet: bool) -> Result<bool, String> {
    if quiet && matches!(e, Error::Path(_) | Error::Index(_)) {
        ::log::debug!("quiet miss: {}", e);
        return Ok(false);
    }
    Err(e.to_string())
}

pub fn run() -> Result<bool, String> {
    let cli = def::Args::parse();

    // Split log strings upon comma, trim them and flatten all in
    // `logs`, remove empty values
    let logs = cli.log.unwrap_or_else(Vec::new); // Provide an empty Vec if cli.log is None
    let logs = logs
        .iter()
        .flat_map(|log| log.split(',')) // Split each log entry on commas
        .map(str::trim) // Trim whitespace from each resulting entry
        .filter(|s| !s.is_empty()) // Remove empty strings
        .collect::<Vec<&str>>(); // Collect into a Vec<&str>

    // Upon failure, display error message and usage string
    log::setup(cli.verbose, logs, cli.log_time)?;

    if cli.color && cli.no_color {
        return Err("Cannot use both --color and --no-color".to_string());
    }
    if cli.color {
        colored::control::set_override(true);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    if cli.version {
        // use crate version
        println!("version: {}", env!("CARGO_PKG_VERSION"));
        println!("Rust: {}", RUSTC_VERSION);
        return Ok(true);
    }

    let action = match &cli.action {
        Some(action) => action,
        None => return Err("Missing action".to_string()),
    };

    let file = cli.file.as_deref();
    let mut doc = load_document(file)?;
    if cli.no_comments {
        doc.disable_comment_alignment();
    } else if let Some(col) = cli.comment_col {
        doc.set_absolute_comment_alignment(col);
    }

    match action {
        def::Actions::Get { path, yaml } => match path {
            None => {
                let text = doc.to_yaml_string()?;
                print!("{}", text);
            }
            Some(path) => {
                let value = match doc.get(path) {
                    Ok(v) => v,
                    Err(e) => return quiet_miss(e, cli.quiet),
                };
                if *yaml {
                    println!("{}", yaml::yaml_value_string(&value));
                } else {
                    println!("{}", yaml::raw_value_string(&value));
                }
            }
        },
        def::Actions::Set { path, value, yaml } => {
            let value = yaml::parse_value(value, *yaml)?;
            if let Err(e) = doc.set(path, value) {
                return quiet_miss(e, cli.quiet);
            }
            emit(&mut doc, file, cli.in_place)?;
        }
        def::Actions::Del { path } => {
            if let Err(e) = doc.remove(path) {
                return quiet_miss(e, cli.quiet);
            }
            emit(&mut doc, file, cli.in_place)?;
        }
        def::Actions::Append { path, value, yaml } => {
            let value = yaml::parse_value(value, *yaml)?;
            if let Err(e) = doc.append_to_array(path, value) {
                return quiet_miss(e, cli.quiet);
            }
            emit(&mut doc, file, cli.in_place)?;
        }
        def::Actions::Insert {
            path,
            index,
            value,
            yaml,
        } => {
            let value = yaml::parse_value(value, *yaml)?;
            if let Err(e) = doc.insert_into_array(path, *index, value) {
                return quiet_miss(e, cli.quiet);
            }
            emit(&mut doc, file, cli.in_place)?;
        }
        def::Actions::Update {
            path,
            index,
            value,
            yaml,
        } => {
            let value = yaml::parse_value(value, *yaml)?;
            if let Err(e) = doc.update_array_element(path, *index, value) {
                return quiet_miss(e, cli.quiet);
            }
            emit(&mut doc, file, cli.in_place)?;
        }
        def::Actions::Remove { path, index } => {
            if let Err(e) = doc.remove_from_array(path, *index) {
                return quiet_miss(e, cli.quiet);
            }
            emit(&mut doc, file, cli.in_place)?;
        }
        def::Actions::Apply {
            overlays,
            merge_policy,
        } => {
            let specs = merge_policy.clone().unwrap_or_default();
            let policies = yaml::parse_merge_policies(&specs)?;
            for overlay_path in overlays {
                let overlay = Document::load_file(overlay_path)?;
                doc.merge(&overlay, &policies)?;
            }
            emit(&mut doc, file, cli.in_place)?;
        }
    }
    Ok(true)
}
