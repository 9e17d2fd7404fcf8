#![cfg(not(test))]

extern crate mapio_map as map;

use datafile as df;
use map::Defaults;
use map::Map;
use std::env;
use std::path::Path;
use std::process;

fn resave(input: &Path, output: &Path, jobs: &mut df::Jobs) -> Result<(), map::Error> {
    let root = input.parent().unwrap_or(Path::new("."));
    let mut defaults = Defaults::new(root);
    let map = Map::load(input, &mut defaults.options())?;
    map.save(output, jobs)?;
    Ok(())
}

fn main() {
    logger::init();

    let mut args = env::args_os();
    let program_name = args.next().unwrap();
    let args: Vec<_> = args.collect();
    if args.is_empty() || args.len() % 2 != 0 {
        println!("USAGE: {} <IN> <OUT> [<IN> <OUT>]...", program_name.to_string_lossy());
        return;
    }
    let mut jobs = df::Jobs::new();
    let mut failed = false;
    for pair in args.chunks(2) {
        let (input, output) = (Path::new(&pair[0]), Path::new(&pair[1]));
        if let Err(e) = resave(input, output, &mut jobs) {
            println!("{}: {}", input.display(), e);
            failed = true;
        }
    }
    if let Err(e) = jobs.wait_all() {
        println!("writing failed: {}", e);
        failed = true;
    }
    if failed {
        process::exit(1);
    }
}
