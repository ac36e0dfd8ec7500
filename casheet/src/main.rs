use casheet_lib::{Compiler, CompilerOptions, SpecificityMode};
use clap::Parser;
use std::fs;

#[derive(Parser)]
#[command(name = "casheet")]
#[command(about = "Apply a Cascading Attribute Sheet to an HTML document")]
struct Args {
    /// CAS sheet to apply.
    sheet: String,

    /// Input HTML file name.
    input: String,

    /// Output file name. Writes to stdout when omitted.
    output: Option<String>,

    /// Order rules by (ids, classes, types) instead of the concatenated weight.
    #[arg(long)]
    tuple_specificity: bool,

    /// Print the parsed declarations in cascade order and exit.
    #[arg(long)]
    dump: bool,
}

fn read(path: &str, what: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading {} file {}: {}", what, path, e);
            std::process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();

    // parse the args given in terminal
    let args: Args = Args::parse();

    let options = CompilerOptions {
        specificity: if args.tuple_specificity {
            SpecificityMode::Tuple
        } else {
            SpecificityMode::Legacy
        },
    };
    let compiler = Compiler::with_options(options);
    let sheet = read(&args.sheet, "CAS");

    if args.dump {
        match compiler.parse(&sheet) {
            Some(declarations) => print!("{}", declarations),
            None => std::process::exit(1),
        }
        return;
    }

    let html = read(&args.input, "HTML");
    let compiled = compiler.compile(&sheet, &html);
    log::info!("compiled {} against {}", args.sheet, args.input);

    match args.output {
        Some(output) => {
            if let Err(e) = fs::write(&output, compiled) {
                eprintln!("Error writing {}: {}", output, e);
                std::process::exit(1);
            }
        }
        None => println!("{}", compiled),
    }
}
