use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;

use semistack::assembler::AssembleError;
use semistack::ast::{FunctionDef, Listing, Span};
use semistack::diagnostic::ansi::AnsiRenderer;
use semistack::diagnostic::{Diagnostic, json, registry};
use semistack::linker::LinkError;
use semistack::{ExitStatus, Vm, VmConfig, VmError, logging, parser};

#[derive(Parser, Debug)]
#[command(name = "semistack")]
#[command(about = "Assemble, link and run stack machine listings")]
#[command(version)]
struct Cli {
    /// Disable ANSI colour in diagnostics (also honours NO_COLOR)
    #[arg(long, global = true)]
    no_color: bool,

    /// Diagnostic output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Text)]
    diagnostics: Format,

    /// More log output on stderr (-v warn, -vv info, -vvv debug, -vvvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register every function in a listing and run the entry function
    Run {
        /// The listing to run
        file: PathBuf,

        /// Function to start at
        #[arg(long, default_value = "main")]
        entry: String,

        /// Maximum number of live call frames
        #[arg(long)]
        max_call_depth: Option<usize>,

        /// Maximum number of values on the operand stack
        #[arg(long)]
        max_stack: Option<usize>,
    },

    /// Print every function of a listing after assembly and linking
    Dump {
        /// The listing to dump
        file: PathBuf,

        /// Print a JSON document instead of text
        #[arg(long)]
        json: bool,
    },

    /// Explain an error code
    Explain {
        /// The code to explain, e.g. SSM-E001
        #[arg(required_unless_present = "list")]
        code: Option<String>,

        /// List every code with a one-line summary
        #[arg(long)]
        list: bool,
    },
}

/// Writes diagnostics to stderr in the selected format.
struct Reporter {
    format: Format,
    ansi: AnsiRenderer,
}

impl Reporter {
    fn emit(&self, d: &Diagnostic) {
        match self.format {
            Format::Text => eprint!("{}", self.ansi.render(d)),
            Format::Json => eprintln!("{}", json::render(d)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let use_color = !cli.no_color
        && std::env::var_os("NO_COLOR").is_none()
        && std::io::stderr().is_terminal();
    let reporter = Reporter { format: cli.diagnostics, ansi: AnsiRenderer { use_color } };

    let ok = match cli.command {
        Command::Run { file, entry, max_call_depth, max_stack } => {
            let defaults = VmConfig::default();
            let config = VmConfig {
                max_stack: max_stack.unwrap_or(defaults.max_stack),
                max_call_depth: max_call_depth.unwrap_or(defaults.max_call_depth),
            };
            run(&file, &entry, config, &reporter)
        }
        Command::Dump { file, json } => dump(&file, json, &reporter),
        Command::Explain { code, list } => explain(code.as_deref(), list, &reporter),
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn run(path: &Path, entry: &str, config: VmConfig, reporter: &Reporter) -> bool {
    let Some(listing) = load(path, reporter) else {
        return false;
    };
    let mut vm = Vm::with_config(config, |line| println!("{line}"));
    if !register(&listing, &mut vm, reporter) {
        return false;
    }

    match vm.run(entry) {
        Ok(status) => {
            info!(%status, "finished");
            let residual = vm.residual_values();
            if residual > 0 {
                let how = match status {
                    ExitStatus::Exit => "exit",
                    ExitStatus::Return => "return",
                };
                reporter.emit(
                    &Diagnostic::warning(format!("{residual} value(s) left on the operand stack"))
                        .with_note(format!("'{entry}' stopped with {how}")),
                );
            }
            true
        }
        Err(e) => {
            reporter.emit(&vm_diagnostic(&e, &listing));
            false
        }
    }
}

fn dump(path: &Path, as_json: bool, reporter: &Reporter) -> bool {
    let Some(listing) = load(path, reporter) else {
        return false;
    };
    let mut vm = Vm::with_output(|_| {});
    if !register(&listing, &mut vm, reporter) {
        return false;
    }
    if let Err(e) = vm.link() {
        reporter.emit(&vm_diagnostic(&e, &listing));
        return false;
    }

    if as_json {
        let functions: Vec<serde_json::Value> = vm
            .function_names()
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let function = vm.function(index)?;
                Some(serde_json::json!({ "name": name, "instructions": function.instructions }))
            })
            .collect();
        match serde_json::to_string_pretty(&serde_json::json!({ "functions": functions })) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                reporter.emit(&Diagnostic::error(format!("cannot serialise dump: {e}")));
                return false;
            }
        }
    } else {
        for name in vm.function_names() {
            if let Some(text) = vm.dump(name) {
                print!("{text}");
            }
        }
    }
    true
}

fn explain(code: Option<&str>, list: bool, reporter: &Reporter) -> bool {
    if list {
        for entry in registry::REGISTRY {
            println!("{}  {}", entry.code, entry.short);
        }
        return true;
    }
    let code = code.unwrap_or_default();
    match registry::lookup(code) {
        Some(entry) => {
            print!("{}", entry.long);
            true
        }
        None => {
            reporter.emit(
                &Diagnostic::error(format!("unknown error code '{code}'"))
                    .with_suggestion("run `semistack explain --list` to see every code"),
            );
            false
        }
    }
}

/// Read and parse a listing, reporting every problem found.
fn load(path: &Path, reporter: &Reporter) -> Option<Listing> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            reporter.emit(&Diagnostic::error(format!("cannot read {}: {e}", path.display())));
            return None;
        }
    };
    match parser::parse_source(&source) {
        Ok(listing) => {
            info!(path = %path.display(), functions = listing.functions.len(), "parsed listing");
            Some(listing)
        }
        Err(errors) => {
            for e in &errors {
                reporter.emit(&Diagnostic::from(e).with_source(source.as_str()));
            }
            None
        }
    }
}

/// Register functions in listing order, so table index equals listing index.
fn register(listing: &Listing, vm: &mut Vm, reporter: &Reporter) -> bool {
    for def in &listing.functions {
        if let Err(e) = vm.add_function(def.to_function(), def.name.clone()) {
            reporter.emit(&vm_diagnostic(&e, listing));
            return false;
        }
    }
    true
}

/// Attach the listing location an error refers to, when there is one.
fn vm_diagnostic(e: &VmError, listing: &Listing) -> Diagnostic {
    let d = Diagnostic::from(e);
    let (span, label) = match e {
        VmError::Fault { function, pc, .. } => match listing.function(function) {
            Some(def) => assembled(def, *pc)
                .map(|span| (span, "here"))
                .unwrap_or((def.span, "in this function")),
            None => return d,
        },
        VmError::Assemble { name, source } => match listing.function(name) {
            Some(def) => assemble_span(def, source),
            None => return d,
        },
        VmError::Link(LinkError::UndefinedFunction { caller, index, .. })
        | VmError::Link(LinkError::InvalidTarget { caller, index }) => match listing.functions.get(*caller) {
            Some(def) => assembled(def, *index)
                .map(|span| (span, "called here"))
                .unwrap_or((def.span, "in this function")),
            None => return d,
        },
        VmError::DuplicateFunction { name } | VmError::UndefinedFunction { name } => {
            match listing.function(name) {
                Some(def) => (def.span, ""),
                None => return d,
            }
        }
        _ => return d,
    };
    match &listing.source {
        Some(source) => d.with_span(span, label).with_source(source.as_str()),
        None => d,
    }
}

fn assembled(def: &FunctionDef, pc: usize) -> Option<Span> {
    def.assembled_spans().get(pc).copied()
}

fn assemble_span(def: &FunctionDef, e: &AssembleError) -> (Span, &'static str) {
    let span = match e {
        AssembleError::InvalidLabel { index } => def.instructions.get(*index).map(|i| i.span),
        AssembleError::MissingJumpTarget { index, .. } | AssembleError::InvalidJumpTarget { index, .. } => {
            assembled(def, *index)
        }
        AssembleError::DuplicateLabel { label } => def
            .instructions
            .iter()
            .filter(|i| i.opcode == semistack::OpCode::Label)
            .filter(|i| i.immediate.as_ref().and_then(|v| v.as_str().ok()) == Some(label.as_str()))
            .nth(1)
            .map(|i| i.span),
    };
    match span {
        Some(span) => (span, "here"),
        None => (def.span, "in this function"),
    }
}
