#[macro_use]
extern crate clap;

mod logger;
mod toolchain;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Arg;
use neo::symtab::SymbolKind;
use util::{EnumFromStr, ParseEnumError};
use util_derive::EnumFromStr;

/// Pipeline artifacts that can be dumped to stdout with `-d`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumFromStr)]
enum DumpFlag {
    Tok,
    Ast,
    Sym,
    Ir,
}

/// Feature toggles for `-f`. Each occurrence flips the feature.
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumFromStr)]
enum Feature {
    NoFold,
}

#[derive(Debug)]
enum IoErrorContext {
    ReadSource,
}

#[derive(Debug)]
enum Error {
    Io(std::io::Error, IoErrorContext, PathBuf),
    Flag(ParseEnumError),
    Parse(neoparse::Error),
    Compile(neo::Error),
    Toolchain(toolchain::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err, context, path) => writeln!(
                f,
                "{} file \"{}\" failed: {}",
                match context {
                    IoErrorContext::ReadSource => "Reading source",
                },
                path.display(),
                err
            ),
            Error::Flag(err) => writeln!(f, "{}", err),
            Error::Parse(err) => {
                writeln!(f, "Parsing input failed:")?;
                write!(f, "{}", err)
            }
            Error::Compile(err) => writeln!(f, "error: {}", err),
            Error::Toolchain(err) => writeln!(f, "error: {}", err),
        }
    }
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("SOURCES")
                .help("Sets the source files to compile")
                .required(true)
                .multiple(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .default_value("a.out")
                .help("Sets the output binary path"),
        )
        .arg(
            Arg::with_name("dump")
                .short("d")
                .long("dump")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("STAGE")
                .help("Dumps a pipeline artifact (tok, ast, sym, ir)"),
        )
        .arg(
            Arg::with_name("feature")
                .short("f")
                .long("feature")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("FEATURE")
                .help("Toggles a feature flag (no-fold)"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Enables verbose output"),
        )
        .get_matches();

    logger::init(matches.is_present("verbose"));

    if let Err(err) = compile(&matches) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn compile(matches: &clap::ArgMatches) -> Result<(), Error> {
    let sources: Vec<&str> = matches.values_of("SOURCES").unwrap().collect();
    // Only the first source file is compiled today.
    let input_path = Path::new(sources[0]);
    let output = matches.value_of("output").unwrap();

    let mut dumps = Vec::new();
    if let Some(values) = matches.values_of("dump") {
        for value in values {
            dumps.push(value.parse::<DumpFlag>().map_err(Error::Flag)?);
        }
    }

    let mut fold = true;
    if let Some(values) = matches.values_of("feature") {
        for value in values {
            match value.parse::<Feature>().map_err(Error::Flag)? {
                Feature::NoFold => fold = !fold,
            }
        }
    }

    let source = fs::read_to_string(input_path)
        .map_err(|err| Error::Io(err, IoErrorContext::ReadSource, input_path.to_owned()))?;

    let with_path = |err: neoparse::Error| match input_path.to_str() {
        Some(path_str) => err.with_path(path_str),
        None => err,
    };

    if dumps.contains(&DumpFlag::Tok) {
        neoparse::dump_tokens(&source).map_err(|err| Error::Parse(with_path(err)))?;
    }

    let (mut decls, globals) =
        neoparse::parse(&source).map_err(|err| Error::Parse(with_path(err)))?;

    if dumps.contains(&DumpFlag::Ast) {
        neo::ast::dump_nodes(&decls, 0);
    }

    if fold {
        neo::optimize::fold_constants(&mut decls);
    }

    if dumps.contains(&DumpFlag::Sym) {
        globals.dump();
    }

    let entry = globals.find("main").ok_or_else(|| {
        Error::Compile(neo::Error::Resolve("function 'main' is missing!".to_owned()))
    })?;
    if entry.kind != SymbolKind::Func {
        return Err(Error::Compile(neo::Error::Resolve(
            "symbol 'main' is not a function!".to_owned(),
        )));
    }

    let program = neo::ir::lower_to_ir(&mut decls, "main").map_err(Error::Compile)?;

    if dumps.contains(&DumpFlag::Ir) {
        print!("{}", program);
    }

    neo::ast::warn_unused(&decls);

    let target = neo::codegen::generate(&program, &globals).map_err(Error::Compile)?;

    toolchain::build(&target, Path::new(output)).map_err(Error::Toolchain)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dump_flags_parse_from_their_kebab_names() {
        assert_eq!("tok".parse::<DumpFlag>().unwrap(), DumpFlag::Tok);
        assert_eq!("ast".parse::<DumpFlag>().unwrap(), DumpFlag::Ast);
        assert_eq!("sym".parse::<DumpFlag>().unwrap(), DumpFlag::Sym);
        assert_eq!("ir".parse::<DumpFlag>().unwrap(), DumpFlag::Ir);
        assert!("asm".parse::<DumpFlag>().is_err());
    }

    #[test]
    fn feature_flags_parse_from_their_kebab_names() {
        assert_eq!("no-fold".parse::<Feature>().unwrap(), Feature::NoFold);
        assert!("nofold".parse::<Feature>().is_err());
        assert!("NoFold".parse::<Feature>().is_err());
    }
}
