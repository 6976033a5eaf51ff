//! Print the specifications of a simulation to stdout.
use std::env;

#[macro_use]
extern crate anyhow;

use galacticus::simulations::Simulation;

fn usage() {
    println!("Usage: galsim <name | specification.xml>");
}

fn main() -> Result<(), anyhow::Error> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        usage();
        return Err(anyhow!("Invalid arguments"));
    }

    let target = &args[1];

    let sim = if target.ends_with(".xml") {
        Simulation::from_file(target)?
    } else {
        Simulation::load(target)?
    };

    println!("{sim}");

    Ok(())
}
