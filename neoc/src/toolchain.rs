//! Staging of the generated assembly and the external assemble/link step.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use neo::codegen::Target;

/// Where the generated assembly is staged for the external assembler.
pub const BUILD_ARTIFACT: &str = "/tmp/neo-build-artifact";

#[derive(Debug)]
pub enum Error {
    Write(io::Error, PathBuf),
    Spawn(&'static str, io::Error),
    Exit(&'static str, ExitStatus),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Write(err, path) => {
                write!(f, "writing \"{}\" failed: {}", path.display(), err)
            }
            Error::Spawn(program, err) => write!(f, "spawning '{}' failed: {}", program, err),
            Error::Exit(program, status) => write!(f, "'{}' exited with {}", program, status),
        }
    }
}

/// Writes the assembly to the build artifact, assembles it with `nasm`,
/// links the object with `ld` into `output`, and removes the artifact.
pub fn build(target: &Target, output: &Path) -> Result<(), Error> {
    fs::write(BUILD_ARTIFACT, &target.code)
        .map_err(|err| Error::Write(err, PathBuf::from(BUILD_ARTIFACT)))?;
    log::info!("created temporary file: '{}'", BUILD_ARTIFACT);

    let object = output.with_extension("o");
    assemble(&object)?;
    log::info!("finished assembling target.");
    log::info!("created object file: {}", object.display());

    link(&object, output)?;
    log::info!("finished linking target.");
    log::info!("created binary: {}", output.display());

    fs::remove_file(BUILD_ARTIFACT)
        .map_err(|err| Error::Write(err, PathBuf::from(BUILD_ARTIFACT)))?;
    Ok(())
}

fn assemble(object: &Path) -> Result<(), Error> {
    run(
        "nasm",
        Command::new("nasm")
            .arg("-felf64")
            .arg("-o")
            .arg(object)
            .arg(BUILD_ARTIFACT),
    )
}

fn link(object: &Path, output: &Path) -> Result<(), Error> {
    run("ld", Command::new("ld").arg("-o").arg(output).arg(object))
}

fn run(program: &'static str, command: &mut Command) -> Result<(), Error> {
    let status = command
        .status()
        .map_err(|err| Error::Spawn(program, err))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Exit(program, status))
    }
}
