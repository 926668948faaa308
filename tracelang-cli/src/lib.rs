use std::fs;
use std::io;

use clap::{value_t, App, AppSettings, Arg, ArgMatches, SubCommand};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use petgraph::dot::Dot;
use tracelang::ast::ToSexp;
use tracelang::errors::Diagnostic;
use tracelang::options::{CompilerOptions, DEFAULT_MAX_AST_NODES};
use tracelang::params::Params;
use tracelang::platform::StaticTypeDatabase;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Config {
    /// Script to compile. Not needed for tools that do not read a program.
    pub source_path: Option<String>,

    /// Values of `$1`, `$2`, ...
    pub params: Vec<String>,

    pub aot: bool,
    pub max_ast_nodes: usize,

    /// The expected compiler behavior.
    pub target: Target,

    /// Number of `-v` flags, used when `RUST_LOG` is not set.
    pub verbosity: u64,

    /// Print diagnostics as plain lines on stdout instead of rendering them with source
    /// snippets. Only set by tests.
    pub plaintext_diagnostics: bool,
}

/// What to do with the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Run all checks and print the resources the program needs.
    Check,

    /// Print the tree produced by the parser.
    DumpAst,

    /// Print the pass dependency graph in DOT format.
    PassGraph,
}

impl Config {
    pub fn new() -> Config {
        let program = || {
            Arg::with_name("PROGRAM")
                .help("Path to the tracing script")
                .required(true)
                .index(1)
        };

        let matches = App::new("tracelang")
            .version(VERSION)
            .about("Front end of the tracing language compiler")
            .setting(AppSettings::SubcommandRequiredElseHelp)
            .arg(
                Arg::with_name("aot")
                    .long("aot")
                    .help("Reject constructs that cannot be compiled ahead of time")
                    .global(true),
            )
            .arg(
                Arg::with_name("max-ast-nodes")
                    .long("max-ast-nodes")
                    .takes_value(true)
                    .env("TRACELANG_MAX_AST_NODES")
                    .help("Maximum number of nodes a program may have")
                    .global(true),
            )
            .arg(
                Arg::with_name("verbose")
                    .short("v")
                    .multiple(true)
                    .help("Log more; repeat for more detail")
                    .global(true),
            )
            .subcommand(
                SubCommand::with_name("check")
                    .about("Checks the script and prints the resources it needs")
                    .arg(program())
                    .arg(
                        Arg::with_name("PARAMS")
                            .help("Values of positional parameters $1, $2, ...")
                            .multiple(true)
                            .index(2),
                    ),
            )
            .subcommand(
                SubCommand::with_name("tools")
                    .about("Inspects compiler internals")
                    .setting(AppSettings::SubcommandRequiredElseHelp)
                    .subcommand(
                        SubCommand::with_name("ast")
                            .about("Prints the syntax tree of a script")
                            .arg(program()),
                    )
                    .subcommand(
                        SubCommand::with_name("passes")
                            .about("Prints the pass dependency graph in DOT format"),
                    ),
            )
            .get_matches();

        let config_from_leaf_matches = |matches: &ArgMatches, target| {
            let max_ast_nodes = if matches.is_present("max-ast-nodes") {
                value_t!(matches, "max-ast-nodes", usize).unwrap_or_else(|error| error.exit())
            } else {
                DEFAULT_MAX_AST_NODES
            };
            Config {
                source_path: matches.value_of("PROGRAM").map(String::from),
                params: matches
                    .values_of("PARAMS")
                    .map(|values| values.map(String::from).collect())
                    .unwrap_or_default(),
                aot: matches.is_present("aot"),
                max_ast_nodes,
                target,
                verbosity: matches.occurrences_of("verbose"),
                plaintext_diagnostics: false,
            }
        };

        match matches.subcommand() {
            ("check", Some(matches)) => config_from_leaf_matches(matches, Target::Check),
            ("tools", Some(matches)) => match matches.subcommand() {
                ("ast", Some(matches)) => config_from_leaf_matches(matches, Target::DumpAst),
                ("passes", Some(matches)) => config_from_leaf_matches(matches, Target::PassGraph),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        }
    }

    fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            aot: self.aot,
            max_ast_nodes: self.max_ast_nodes,
            ..CompilerOptions::default()
        }
    }
}

/// Settings for running in-process, as tests do.
impl Default for Config {
    fn default() -> Self {
        Config {
            source_path: None,
            params: Vec::new(),
            aot: false,
            max_ast_nodes: DEFAULT_MAX_AST_NODES,
            target: Target::Check,
            verbosity: 0,
            plaintext_diagnostics: true,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum RunResult {
    Ok,
    CompilerError,
    IoError,
}

/// Sets up logging to stderr. `RUST_LOG` takes precedence over `verbosity`.
pub fn init_logging(verbosity: u64) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    // A subscriber may already be installed when running in-process from tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Executes the requested tool.
pub fn run(config: Config) -> RunResult {
    let options = config.compiler_options();
    if config.target == Target::PassGraph {
        let manager = tracelang::passes::pipeline(&options);
        let graph = manager.dependency_graph();
        println!("{}", Dot::new(&graph));
        return RunResult::Ok;
    }

    let source_path = match config.source_path {
        Some(ref path) => path.as_str(),
        None => {
            eprintln!("No script given");
            return RunResult::IoError;
        }
    };
    let source_code = match fs::read_to_string(source_path) {
        Ok(source_code) => source_code,
        Err(error) => {
            eprintln!("Error while reading the source file:\n{}", error);
            return RunResult::IoError;
        }
    };
    debug!(path = source_path, bytes = source_code.len(), "read script");

    let params = Params::new(config.params.clone());
    let types = StaticTypeDatabase::new();

    match config.target {
        Target::DumpAst => {
            let mut ast = tracelang::ast::Ast::new();
            let outcome = tracelang::parser::parse(&source_code, &params, &mut ast);
            let (result, warnings) = outcome.into_parts();
            match result {
                Ok(program) => {
                    report_diagnostics(source_path, &source_code, &warnings, &config);
                    println!("{}", program.to_sexp(&ast).pretty_print(100));
                    RunResult::Ok
                }
                Err(errors) => {
                    report_diagnostics(source_path, &source_code, &errors, &config);
                    RunResult::CompilerError
                }
            }
        }
        Target::Check => {
            let outcome = tracelang::compile(&source_code, &params, &options, &types);
            let (result, warnings) = outcome.into_parts();
            report_diagnostics(source_path, &source_code, &warnings, &config);
            match result {
                Ok(compilation) => {
                    info!(maps = compilation.resources.maps.len(), "script checked");
                    println!("{}", compilation.resources);
                    RunResult::Ok
                }
                Err(errors) => {
                    report_diagnostics(source_path, &source_code, &errors, &config);
                    RunResult::CompilerError
                }
            }
        }
        Target::PassGraph => unreachable!(),
    }
}

fn report_diagnostics(
    file_name: &str,
    source_code: &str,
    diagnostics: &[Diagnostic],
    config: &Config,
) {
    if !config.plaintext_diagnostics {
        let mut files = SimpleFiles::new();
        let file_id = files.add(file_name, source_code);

        let writer = StandardStream::stderr(ColorChoice::Auto);
        let term_config = codespan_reporting::term::Config::default();

        for diagnostic in diagnostics {
            if let Err(error) = codespan_reporting::term::emit(
                &mut writer.lock(),
                &term_config,
                &files,
                &diagnostic.to_codespan(file_id),
            ) {
                eprintln!("{}: {}", diagnostic, error);
            }
        }
    } else {
        for diagnostic in diagnostics {
            println!("{}", diagnostic);
        }
    }
}
