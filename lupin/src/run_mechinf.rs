use crate::lupin_input::*;
use crate::lupin_output::*;
use clap::Args;
use lupin::background::BackgroundModel;
use lupin::common::*;
use lupin::mechanistic::*;
use lupin::membership::MembershipSet;
use lupin::principal::{cluster_median_matrix, principal_axes};
use lupin::regulon::*;

#[derive(Args, Debug)]
pub struct MechinfArgs {
    #[command(flatten)]
    input: ExpressionInput,

    /// Revised clusters (`.clusters.json` of `coexpr`)
    #[arg(long, required = true)]
    clusters: Box<str>,

    /// Regulator/target pairs, two columns
    #[arg(long, short, required = true)]
    regulators: Box<str>,

    #[command(flatten)]
    options: RunOptions,

    /// cut on the BH-adjusted enrichment p-value
    #[arg(long, short = 'p')]
    p_value: Option<f64>,

    /// share of a regulator's clusters a gene must appear in
    #[arg(long)]
    freq_threshold: Option<f64>,

    /// use the values as given, without per-gene standardisation
    #[arg(long, default_value_t = false)]
    no_zscore: bool,
}

pub fn run_mechinf(args: &MechinfArgs) -> anyhow::Result<()> {
    args.options.init_logger();

    let mut config = args.options.load_config()?;
    if let Some(x) = args.p_value {
        config.mechanistic.p_value = x;
    }
    if let Some(x) = args.freq_threshold {
        config.regulon.freq_threshold = x;
    }
    if args.no_zscore {
        config.zscore = false;
    }
    config.validate()?;
    args.options.build_thread_pool(&config)?;

    let expr = args.input.read()?;
    let expr = if config.zscore { expr.zscore() } else { expr };
    let clusters: ClusterDict = read_json(&args.clusters)?;
    let reference = read_regulators(&args.regulators)?;

    // 1. one axis per cluster
    let axes = principal_axes(&clusters, &expr, config.mechanistic.min_number_genes)?;
    write_cluster_matrix(
        &axes.to_cluster_matrix(),
        &args.options.output("eigengenes.tsv.gz"),
    )?;

    // 2. regulator enrichment
    let output = infer(&axes, &clusters, &expr, &reference, &config.mechanistic)?;
    write_json(&output, &args.options.output("mechanistic.json"))?;

    // 3. regulons and modules
    let coregulation = get_coregulation_modules(&output);
    write_json(&coregulation, &args.options.output("coregulation_modules.json"))?;

    let regulons = get_regulons(
        &coregulation,
        config.regulon.min_number_genes,
        config.regulon.freq_threshold,
    )?;
    if regulons.is_empty() {
        anyhow::bail!("no regulon passed the frequency and size filters");
    }
    write_json(&regulons, &args.options.output("regulons.json"))?;

    let modules = get_coexpression_modules(&output);
    write_json(&modules, &args.options.output("coexpression_modules.json"))?;

    // 4. module activity
    let module_clusters = modules_as_clusters(&modules);
    write_cluster_matrix(
        &cluster_median_matrix(&expr, &module_clusters),
        &args.options.output("module_medians.tsv.gz"),
    )?;
    let background = BackgroundModel::build(&expr)?;
    let set = MembershipSet::score(&module_clusters, &background, &config.membership)?;
    write_membership_set(&set, &expr, &args.options.output("modules"))
}
