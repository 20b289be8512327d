mod lupin_input;
mod lupin_output;
mod run_bcmembers;
mod run_coexpr;
mod run_mechinf;
mod run_network;
mod run_pipeline;
mod run_subtypes;

use clap::{Parser, Subcommand};
use log::info;
use run_bcmembers::*;
use run_coexpr::*;
use run_mechinf::*;
use run_network::*;
use run_pipeline::*;
use run_subtypes::*;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LUPIN",
    long_about = "Regulatory network mining and sample stratification\n\
		  from a genes x samples expression matrix (`.tsv`, `.csv`, or gzipped)\n\
		  and a two-column regulator/target table."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Co-expression clustering and revision",
        long_about = "Find co-expression clusters in the two stages: \n\
		      (1) Grow clusters around principal-component seeds\n\
		      (2) Merge clusters with correlated axes and drop incoherent ones.\n"
    )]
    Coexpr(CoexprArgs),

    #[command(
        about = "Regulators enriched in co-expression clusters",
        long_about = "Mechanistic inference in the four stages: \n\
		      (1) Summarise each cluster by its first principal axis\n\
		      (2) Test regulator target enrichment (hypergeometric, BH)\n\
		      (3) Assemble regulons and co-expression modules\n\
		      (4) Score sample membership of the modules.\n"
    )]
    Mechinf(MechinfArgs),

    #[command(
        about = "Sample membership of clusters, modules or regulons",
        long_about = "Label every sample of every cluster as over-expressed,\n\
		      under-expressed, dysregulated or coherent\n\
		      against a tercile background model.\n"
    )]
    Bcmembers(BcmembersArgs),

    #[command(
        about = "Sample subtypes from shared memberships",
        long_about = "Stratify samples in the three stages: \n\
		      (1) Cluster the sample similarity graph\n\
		      (2) Derive a binary centroid per class\n\
		      (3) Map samples to their best centroid by F1.\n"
    )]
    Subtypes(SubtypesArgs),

    /// Laplacian spectrum of the regulon gene network
    Network(NetworkArgs),

    #[command(
        about = "Run every stage end to end",
        visible_alias = "all"
    )]
    Run(RunArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Coexpr(args) => {
            run_coexpr(args)?;
        }
        Commands::Mechinf(args) => {
            run_mechinf(args)?;
        }
        Commands::Bcmembers(args) => {
            run_bcmembers(args)?;
        }
        Commands::Subtypes(args) => {
            run_subtypes(args)?;
        }
        Commands::Network(args) => {
            run_network(args)?;
        }
        Commands::Run(args) => {
            run_all(args)?;
        }
    }

    info!("Done");
    Ok(())
}
