#[macro_use]
extern crate clap;

use clap::Arg;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::process;

#[derive(Debug)]
enum Error {
    BadPlacement(String),
    Object(PathBuf, sobj::Error),
    Link(slink::Error),
    Io(std::io::Error, PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::BadPlacement(value) => write!(
                f,
                "bad placement \"{}\": expected <section>@<0xADDRESS>",
                value
            ),
            Error::Object(path, err) => {
                write!(f, "reading object \"{}\" failed: {}", path.display(), err)
            }
            Error::Link(err) => write!(f, "{}", err),
            Error::Io(err, path) => {
                write!(f, "writing image \"{}\" failed: {}", path.display(), err)
            }
        }
    }
}

/// The historic tool spelled its long options with a single dash (`-hex`,
/// `-place=...`); map those onto the conventional spellings before clap runs.
fn normalized_args() -> Vec<String> {
    env::args()
        .map(|arg| {
            if arg == "-hex" {
                "--hex".to_owned()
            } else if arg.starts_with("-place=") {
                format!("-{}", arg)
            } else {
                arg
            }
        })
        .collect()
}

fn parse_placement(value: &str) -> Result<(u32, String), Error> {
    let bad = || Error::BadPlacement(value.to_owned());

    let (section, address) = value.split_once('@').ok_or_else(bad)?;
    let digits = address.strip_prefix("0x").ok_or_else(bad)?;
    let address = u32::from_str_radix(digits, 16).map_err(|_| bad())?;

    Ok((address, section.to_owned()))
}

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("hex")
                .long("hex")
                .required(true)
                .help("Emit a textual hex image (the only supported output)"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("OUTPUT")
                .required(true)
                .help("Sets the image file to write"),
        )
        .arg(
            Arg::with_name("place")
                .long("place")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("SECTION@0xADDRESS")
                .help("Places the named section at an absolute address"),
        )
        .arg(
            Arg::with_name("FILES")
                .help("Object modules to link, in placement order")
                .required(true)
                .multiple(true)
                .index(1),
        )
        .get_matches_from(normalized_args());

    let output = matches.value_of("output").unwrap();
    let placements: Vec<&str> = matches
        .values_of("place")
        .map(|values| values.collect())
        .unwrap_or_default();
    let files: Vec<&str> = matches.values_of("FILES").unwrap().collect();

    if let Err(err) = run(output, &placements, &files) {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn run(output: &str, placements: &[&str], files: &[&str]) -> Result<(), Error> {
    let mut place_options = BTreeMap::new();
    for value in placements {
        let (address, section) = parse_placement(value)?;
        place_options.insert(address, section);
    }

    let mut objects = Vec::new();
    for file in files {
        let object = sobj::read_file(file)
            .map_err(|err| Error::Object(PathBuf::from(file), err))?;
        objects.push(((*file).to_owned(), object));
    }

    let image = slink::link(objects, &place_options).map_err(Error::Link)?;

    let output_path = PathBuf::from(output);
    sobj::image::write_file(&output_path, &image).map_err(|err| Error::Io(err, output_path))
}
