use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;

use jlang::{dump, parse_program, ExecutionContext, Interpreter, JlangError};

#[derive(Parser)]
#[command(author, version, about = "Jlang language interpreter")]
struct Args {
    /// Script to run; the source is read from stdin when omitted
    script: Option<PathBuf>,
    /// Print the syntax tree instead of running it
    #[arg(short, long)]
    dump_ast: bool,
    /// Deepest permitted nesting of function calls (0 disables the limit)
    #[arg(long, value_name = "N")]
    max_call_depth: Option<usize>,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn run(args: Args) -> Result<(), JlangError> {
    let source = read_source(args.script.as_ref())?;
    let ast = parse_program(&source)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.dump_ast {
        dump::dump(&ast, &mut out)?;
        out.flush()?;
        return Ok(());
    }

    let mut context = ExecutionContext::default();
    if let Some(depth) = args.max_call_depth {
        context.max_call_depth = (depth > 0).then_some(depth);
    }
    let mut interpreter = Interpreter::with_context(&ast, out, context);
    interpreter.run()
}

fn read_source(script: Option<&PathBuf>) -> io::Result<String> {
    match script {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}
