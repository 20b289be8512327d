use crate::lupin_input::*;
use crate::lupin_output::*;
use clap::Args;
use log::info;
use lupin::common::*;
use lupin::membership::membership_to_incidence;
use lupin::pipeline::stratify_samples;

#[derive(Args, Debug)]
pub struct SubtypesArgs {
    #[command(flatten)]
    input: ExpressionInput,

    /// Over-expressed membership (`.overexpressed.json` of `bcmembers`)
    #[arg(long, required = true)]
    membership: Box<str>,

    #[command(flatten)]
    options: RunOptions,

    /// coincidence frequency below which sample pairs are ignored
    #[arg(long)]
    freq_threshold: Option<f64>,

    /// similarity needed to link two samples
    #[arg(long)]
    similarity_threshold: Option<f64>,

    /// minimum F1 between a sample and its centroid
    #[arg(long)]
    f1_threshold: Option<f64>,

    /// connected components instead of high-resolution clusters
    #[arg(long, default_value_t = false)]
    coarse: bool,
}

pub fn run_subtypes(args: &SubtypesArgs) -> anyhow::Result<()> {
    args.options.init_logger();

    let mut config = args.options.load_config()?;
    if let Some(x) = args.freq_threshold {
        config.stratify.freq_threshold = x;
    }
    if let Some(x) = args.similarity_threshold {
        config.stratify.similarity_threshold = x;
    }
    if let Some(x) = args.f1_threshold {
        config.stratify.f1_threshold = x;
    }
    if args.coarse {
        config.stratify.high_resolution = false;
    }
    config.validate()?;
    args.options.build_thread_pool(&config)?;

    let expr = args.input.read()?;
    let over_expressed: MembershipDictionary = read_json(&args.membership)?;
    let incidence = membership_to_incidence(&over_expressed, &expr)?;

    let subtypes = stratify_samples(&over_expressed, &incidence, &config.stratify)?;
    info!(
        "{} classes, {} samples mapped",
        subtypes.classes.len(),
        subtypes.centroids.num_mapped()
    );
    write_subtypes(&subtypes, &args.options.out)
}
