use crate::lupin_input::*;
use crate::lupin_output::*;
use clap::Args;
use log::info;
use lupin::common::*;
use lupin::topology::laplacian;

#[derive(Args, Debug)]
pub struct NetworkArgs {
    /// Regulons (`.regulons.json` of `mechinf`)
    #[arg(required = true)]
    regulons: Box<str>,

    #[command(flatten)]
    options: RunOptions,
}

pub fn run_network(args: &NetworkArgs) -> anyhow::Result<()> {
    args.options.init_logger();

    let regulons: RegulonDict = read_json(&args.regulons)?;
    let spectrum = laplacian(&regulons)?;
    info!(
        "{} genes, {} zero eigenvalues",
        spectrum.genes.len(),
        spectrum.zero_multiplicity()
    );
    write_spectrum(&spectrum, &args.options.out)
}
