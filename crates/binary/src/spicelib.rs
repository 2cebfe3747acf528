use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::Context;
use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFiles,
    term::{
        self,
        termcolor::{ColorChoice, StandardStream},
        Config,
    },
};
use serde::Serialize;
use spice_lib_core::{
    ast::{ParsedLibrary, ParsedNetlist},
    parse_library, parse_netlist, ParseError,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "spicelib", about = "Parse SPICE netlists and model libraries")]
struct Opt {
    /// Parse as a library (.MODEL and .SUBCKT only)
    #[structopt(short, long)]
    library: bool,
    /// Output in json format
    #[structopt(short, long)]
    json: bool,
    /// Pretty output
    #[structopt(short, long)]
    pretty: bool,
    /// .cir or .lib file to parse
    #[structopt(parse(from_os_str))]
    file: PathBuf,
}

fn diagnostic(file_id: usize, err: &ParseError) -> Diagnostic<usize> {
    let (start, end) = err.span();
    Diagnostic::error()
        .with_message(err.to_string())
        .with_labels(vec![Label::primary(file_id, start..end)])
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn print_netlist(netlist: &ParsedNetlist) {
    if let Some(title) = &netlist.title {
        println!("title: {title}");
    }
    println!("{} components", netlist.components.len());
    for component in &netlist.components {
        println!("  {:<12} {:<16} {}", component.name, component.kind, component.nodes.join(" "));
    }
    println!("{} models", netlist.models.len());
    for model in &netlist.models {
        println!("  {:<12} {}", model.model_name, model.model_type);
    }
}

fn print_library(library: &ParsedLibrary) {
    println!("{} models", library.models.len());
    for model in &library.models {
        println!(
            "  {:<12} {:<10} {} parameters",
            model.model_name,
            model.model_type,
            model.parameters.len()
        );
    }
    println!("{} subcircuits", library.subcircuits.len());
    for subckt in &library.subcircuits {
        println!("  {:<12} pins: {}", subckt.name, subckt.pins.join(" "));
        for (key, value) in &subckt.ts_parameters {
            println!("    {key} = {value}");
        }
        for (key, value) in &subckt.metadata {
            println!("    {key}: {value}");
        }
    }
}

fn run(opt: Opt) -> anyhow::Result<ExitCode> {
    let content = fs::read_to_string(&opt.file)
        .with_context(|| format!("failed to read {}", opt.file.display()))?;

    if opt.library {
        let library = parse_library(&content);
        if opt.json {
            print_json(&library, opt.pretty)?;
        } else {
            print_library(&library);
        }
        return Ok(ExitCode::SUCCESS);
    }

    match parse_netlist(&content) {
        Ok(netlist) => {
            if opt.json {
                print_json(&netlist, opt.pretty)?;
            } else {
                print_netlist(&netlist);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log::debug!("{e:?}");
            let mut files = SimpleFiles::new();
            let file_id = files.add(opt.file.display().to_string(), content);

            let writer = StandardStream::stderr(ColorChoice::Auto);
            let config = Config::default();
            term::emit(&mut writer.lock(), &config, &files, &diagnostic(file_id, &e))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    run(Opt::from_args())
}
