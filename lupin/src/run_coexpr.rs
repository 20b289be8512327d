use crate::lupin_input::*;
use crate::lupin_output::*;
use clap::Args;
use log::info;
use lupin::coexpression::cluster;
use lupin::principal::cluster_median_matrix;
use lupin::revision::revise;

#[derive(Args, Debug)]
pub struct CoexprArgs {
    #[command(flatten)]
    input: ExpressionInput,

    #[command(flatten)]
    options: RunOptions,

    /// percentile (0-100) of all values that counts as over-expressed
    #[arg(long)]
    over_expression_threshold: Option<f64>,

    /// correlation of principal axes at which revised clusters merge
    #[arg(long)]
    merge_correlation: Option<f64>,

    /// random gene sets per cluster in the coherence test (0: skip)
    #[arg(long)]
    num_permutations: Option<usize>,

    /// random seed of the coherence test
    #[arg(long)]
    seed: Option<u64>,

    /// cluster the values as given, without per-gene standardisation
    #[arg(long, default_value_t = false)]
    no_zscore: bool,
}

pub fn run_coexpr(args: &CoexprArgs) -> anyhow::Result<()> {
    args.options.init_logger();

    let mut config = args.options.load_config()?;
    if let Some(x) = args.over_expression_threshold {
        config.coexpression.over_expression_threshold = x;
    }
    if let Some(x) = args.merge_correlation {
        config.revision.correlation_threshold = x;
    }
    if let Some(x) = args.num_permutations {
        config.revision.num_permutations = x;
    }
    if let Some(x) = args.seed {
        config.revision.seed = x;
    }
    if args.no_zscore {
        config.zscore = false;
    }
    config.validate()?;
    args.options.build_thread_pool(&config)?;

    let expr = args.input.read()?;
    let expr = if config.zscore { expr.zscore() } else { expr };

    // 1. initial clusters
    let initial = cluster(&expr, &config.coexpression)?;
    write_json(&initial, &args.options.output("initial_clusters.json"))?;

    // 2. merge and filter
    let revised = revise(&initial, &expr, &config.revision)?;
    if revised.is_empty() {
        anyhow::bail!("no co-expression cluster survived revision");
    }
    info!("{} clusters after revision", revised.len());
    write_json(&revised, &args.options.output("clusters.json"))?;

    let medians = cluster_median_matrix(&expr, &revised);
    write_cluster_matrix(&medians, &args.options.output("cluster_medians.tsv.gz"))?;

    write_json(&config, &args.options.output("config.json"))?;
    Ok(())
}
