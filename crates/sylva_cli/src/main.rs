//! CLI smoke entry point.
//!
//! # Responsibility
//! - Build a tree from a JSON data file (and optional options file).
//! - Print the visible rows with state markers for quick local checks.
//!
//! Usage: `sylva_cli [data.json] [options.json]`. Without arguments it
//! prints the core version.

use log::error;
use serde_json::Value;
use std::process::ExitCode;
use sylva_core::{TreeConfig, TreeOptions, TreeStore};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = sylva_core::init_stderr_logging("warn") {
        eprintln!("logging disabled: {err}");
    }

    let Some(data_path) = args.first() else {
        println!("sylva_core version={}", sylva_core::core_version());
        return ExitCode::SUCCESS;
    };

    match run(data_path, args.get(1).map(String::as_str)) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(data_path: &str, options_path: Option<&str>) -> Result<String, String> {
    let data = read_json(data_path)?;
    let items = match data {
        Value::Array(items) => items,
        other => vec![other],
    };
    let options: TreeOptions = match options_path {
        Some(path) => serde_json::from_value(read_json(path)?)
            .map_err(|err| format!("invalid options in `{path}`: {err}"))?,
        None => TreeOptions::default(),
    };

    let store =
        TreeStore::with_data(TreeConfig::new(options), items).map_err(|err| err.to_string())?;
    Ok(render_rows(&store))
}

fn read_json(path: &str) -> Result<Value, String> {
    let text =
        std::fs::read_to_string(path).map_err(|err| format!("cannot read `{path}`: {err}"))?;
    serde_json::from_str(&text).map_err(|err| format!("invalid JSON in `{path}`: {err}"))
}

fn render_rows(store: &TreeStore) -> String {
    let mut out = String::new();
    for key in store.visible_keys() {
        let Some(node) = store.node(key) else {
            continue;
        };
        let flags = node.flags();
        let fold = if flags.is_leaf {
            ' '
        } else if flags.expanded {
            '-'
        } else {
            '+'
        };
        let check = if flags.checked {
            "[x]"
        } else if flags.indeterminate {
            "[~]"
        } else {
            "[ ]"
        };
        let active = if flags.activated { " *" } else { "" };
        out.push_str(&format!(
            "{}{fold} {check} {}{active}\n",
            "  ".repeat(flags.level),
            node.label()
        ));
    }
    out
}
