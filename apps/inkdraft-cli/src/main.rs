//! Command-line surface: converts a markup file plus a stylesheet file (or a
//! JSON request payload) into a scene tree and prints the result.

use std::env;
use std::fs;
use std::process::ExitCode;

use ink_convert::ConversionPipeline;
use ink_convert::ConvertRequest;
use ink_core::ConvertError;
use ink_core::ConvertResult;
use ink_scene::MemoryScene;

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("inkdraft error: {error}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
enum CliMode {
    Files {
        markup_path: String,
        stylesheet_path: String,
    },
    Payload {
        path: String,
    },
}

fn run() -> ConvertResult<()> {
    let mode = mode_from_args(env::args().skip(1))?;
    let mut scene = MemoryScene::new();
    let pipeline = ConversionPipeline::default();

    let conversion = match mode {
        CliMode::Files {
            markup_path,
            stylesheet_path,
        } => {
            let request = ConvertRequest::new(
                read_input(&markup_path)?,
                read_input(&stylesheet_path)?,
            );
            pipeline.convert(&request, &mut scene)?
        }
        CliMode::Payload { path } => pipeline.convert_payload(&read_input(&path)?, &mut scene)?,
    };

    println!("{}", conversion.summary);
    for diagnostic in conversion.diagnostics.entries() {
        println!("warning {}: {}", diagnostic.code, diagnostic.message);
    }
    print!("{}", scene.outline(conversion.root));
    Ok(())
}

fn mode_from_args(mut args: impl Iterator<Item = String>) -> ConvertResult<CliMode> {
    match args.next() {
        Some(flag) if flag == "--payload" => {
            let path = args.next().ok_or_else(|| {
                ConvertError::new("cli.usage", "missing request file after --payload")
            })?;
            Ok(CliMode::Payload { path })
        }
        Some(markup_path) => {
            let stylesheet_path = args.next().ok_or_else(|| {
                ConvertError::new(
                    "cli.usage",
                    "usage: inkdraft-cli <markup-file> <stylesheet-file> | --payload <request-file>",
                )
            })?;
            Ok(CliMode::Files {
                markup_path,
                stylesheet_path,
            })
        }
        None => Err(ConvertError::new(
            "cli.usage",
            "usage: inkdraft-cli <markup-file> <stylesheet-file> | --payload <request-file>",
        )),
    }
}

fn read_input(path: &str) -> ConvertResult<String> {
    fs::read_to_string(path)
        .map_err(|error| ConvertError::new("cli.read_failed", format!("cannot read {path}: {error}")))
}
