#[macro_use]
extern crate clap;

use clap::Arg;
use std::io;
use std::process;

fn main() {
    let matches = app_from_crate!()
        .arg(
            Arg::with_name("IMAGE")
                .help("Sets the memory image file to execute")
                .required(true)
                .index(1),
        )
        .get_matches();

    let image = matches.value_of("IMAGE").unwrap();

    match semu::run_file(image) {
        Ok(processor) => {
            let stdout = io::stdout();
            if let Err(err) = processor.write_state(&mut stdout.lock()) {
                eprintln!("writing processor state failed: {}", err);
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
