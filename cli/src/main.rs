use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use textfsm_core::{
    FsmConfig, OutputFormat, Template, ValueOption, compile_with, format_records, format_result,
};

#[derive(Debug, Parser)]
#[command(name = "textfsm")]
#[command(about = "Parse semi-structured text into tables with TextFSM templates")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse input text with a template.
    Parse(ParseArgs),
    /// Compile and validate a template, then summarise it.
    Check(CheckArgs),
    /// Print a template in canonical form.
    Fmt(FmtArgs),
}

#[derive(Debug, Args)]
struct TemplateArgs {
    /// Path to the template file.
    #[arg(long, short)]
    template: PathBuf,
    /// YAML file with compiler and executor settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ParseArgs {
    #[command(flatten)]
    template: TemplateArgs,
    /// Input files to parse (repeatable). Reads stdin when omitted.
    #[arg(long, short)]
    input: Vec<PathBuf>,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
    /// Emit one object per row keyed by Value name (JSON/YAML).
    #[arg(long)]
    records: bool,
    /// Skip end-of-input processing.
    #[arg(long)]
    no_eof: bool,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    template: TemplateArgs,
    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct FmtArgs {
    #[command(flatten)]
    template: TemplateArgs,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Check(args) => run_check(args),
        Command::Fmt(args) => run_fmt(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let (template, mut config) = load_template(&args.template)?;
    if args.no_eof {
        config.eof = false;
    }

    let render = |text: &str| -> Result<String, String> {
        let result = template
            .parse(text, config.eof)
            .map_err(|err| err.to_string())?;
        if args.records {
            format_records(&result, args.format)
        } else {
            format_result(&result, args.format)
        }
    };

    if args.input.is_empty() {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|err| format!("Failed to read stdin: {err}"))?;
        print_output(&render(&text)?);
        return Ok(());
    }

    // One context per input; the compiled template is shared.
    let outputs: Vec<Result<String, String>> = args
        .input
        .par_iter()
        .map(|path| {
            let text = read_file(path)?;
            render(&text).map_err(|err| format!("{}: {err}", path.display()))
        })
        .collect();

    let multiple = args.input.len() > 1;
    for (path, output) in args.input.iter().zip(outputs) {
        let output = output?;
        if multiple {
            println!("==> {} <==", path.display());
        }
        print_output(&output);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TemplateSummary {
    header: Vec<String>,
    states: Vec<StateSummary>,
    required: Vec<String>,
    filldown: Vec<String>,
    fillup: Vec<String>,
    key: Vec<String>,
    list: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StateSummary {
    name: String,
    rules: usize,
    transitions: Vec<String>,
}

impl TemplateSummary {
    fn new(template: &Template) -> Self {
        let names = |option: ValueOption| -> Vec<String> {
            template
                .values_with_option(option)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        let states = template
            .states()
            .iter()
            .map(|state| {
                let mut transitions: Vec<String> = Vec::new();
                for rule in state.rules() {
                    if let Some(target) = rule.new_state() {
                        if !transitions.iter().any(|t| t == target) {
                            transitions.push(target.to_string());
                        }
                    }
                }
                StateSummary {
                    name: state.name().to_string(),
                    rules: state.rules().len(),
                    transitions,
                }
            })
            .collect();

        Self {
            header: template.header(),
            states,
            required: names(ValueOption::Required),
            filldown: names(ValueOption::Filldown),
            fillup: names(ValueOption::Fillup),
            key: names(ValueOption::Key),
            list: names(ValueOption::List),
        }
    }
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let (template, _) = load_template(&args.template)?;
    let summary = TemplateSummary::new(&template);

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("Failed to serialize summary: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    println!("Template OK: {}", args.template.template.display());
    println!("Values: {}", summary.header.join(", "));
    for (label, names) in [
        ("Required", &summary.required),
        ("Filldown", &summary.filldown),
        ("Fillup", &summary.fillup),
        ("Key", &summary.key),
        ("List", &summary.list),
    ] {
        if !names.is_empty() {
            println!("  {label}: {}", names.join(", "));
        }
    }
    println!("States:");
    for state in &summary.states {
        if state.transitions.is_empty() {
            println!("  {} ({} rules)", state.name, state.rules);
        } else {
            println!(
                "  {} ({} rules) -> {}",
                state.name,
                state.rules,
                state.transitions.join(", ")
            );
        }
    }
    Ok(())
}

fn run_fmt(args: FmtArgs) -> Result<(), String> {
    let (template, _) = load_template(&args.template)?;
    print!("{template}");
    Ok(())
}

/// Reads the optional config, then compiles the template with it.
fn load_template(args: &TemplateArgs) -> Result<(Template, FsmConfig), String> {
    let config = match &args.config {
        Some(path) => FsmConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => FsmConfig::default(),
    };
    let text = read_file(&args.template)?;
    let template = compile_with(&text, &config)
        .map_err(|err| format!("Invalid template '{}': {err}", args.template.display()))?;
    Ok((template, config))
}

fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!("Failed to read '{}': {err}", path.display()))
}

fn print_output(output: &str) {
    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
}
