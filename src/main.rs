use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use rox_interpreter as lox;

use lox::ast_printer::AstPrinter;
use lox::error::SessionError;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::session::Session;
use lox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about = "Rox language interpreter", long_about = None)]
pub struct Cli {
    /// Without a subcommand an interactive prompt is started
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Print the tokens as one JSON array
        #[arg(long)]
        json: bool,
    },

    /// Parses a program from a file and prints its syntax tree
    Parse { filename: PathBuf },

    /// Runs input from a file as a Rox program
    Run { filename: PathBuf },
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip 'rox_interpreter::' from module path
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("rox_interpreter::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(err: &SessionError) {
    for e in err.errors() {
        eprintln!("{}", e);
    }
}

fn tokenize(source: &str, json: bool) -> Result<bool> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut tokenized = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => {
                if !json {
                    println!("{}", token);
                }
                tokens.push(token);
            }

            Err(e) => {
                tokenized = false;
                debug!("Tokenization debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    if json {
        let rendered =
            serde_json::to_string_pretty(&tokens).context("Failed to serialise tokens")?;
        println!("{}", rendered);
    }

    Ok(tokenized)
}

fn parse(source: &str) -> bool {
    let mut tokens: Vec<Token> = Vec::new();
    let mut parsed = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => tokens.push(token),
            Err(e) => {
                parsed = false;
                eprintln!("{}", e);
            }
        }
    }

    match Parser::new(&tokens).parse() {
        Ok(statements) => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
        }

        Err(errors) => {
            parsed = false;
            for e in errors {
                debug!("Parse debug: {}", e);
                eprintln!("{}", e);
            }
        }
    }

    parsed
}

fn repl() -> Result<()> {
    info!("Starting interactive prompt");

    let stdin = io::stdin();
    let mut session = Session::new(io::stdout());

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;

        if read == 0 {
            println!();
            break;
        }

        if let Err(e) = session.run(&line) {
            debug!("Prompt line failed: {}", e);
            report(&e);
        }
    }

    info!("Interactive prompt closed");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        None => repl()?,

        Some(Commands::Tokenize { filename, json }) => {
            info!("Running Tokenize subcommand");
            let source = read_file(filename)?;

            if !tokenize(&source, json)? {
                debug!("Tokenization failed, exiting with code 65");
                std::process::exit(65);
            }

            info!("Tokenization completed successfully");
        }

        Some(Commands::Parse { filename }) => {
            info!("Running Parse subcommand");
            let source = read_file(filename)?;

            if !parse(&source) {
                std::process::exit(65);
            }

            info!("Parse subcommand completed");
        }

        Some(Commands::Run { filename }) => {
            info!("Running Run subcommand");
            let source = read_file(filename)?;
            debug!("Provided input:\n {}", source);

            let mut session = Session::new(io::stdout());

            if let Err(e) = session.run(&source) {
                debug!("Run failed: {}", e);
                report(&e);
                std::process::exit(e.exit_code());
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
