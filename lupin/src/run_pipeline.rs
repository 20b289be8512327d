use crate::lupin_input::*;
use crate::lupin_output::*;
use clap::Args;
use lupin::pipeline::Subtypes;
use lupin::run_pipeline;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    input: ExpressionInput,

    /// Regulator/target pairs, two columns
    #[arg(long, short, required = true)]
    regulators: Box<str>,

    #[command(flatten)]
    options: RunOptions,

    /// use the values as given, without per-gene standardisation
    #[arg(long, default_value_t = false)]
    no_zscore: bool,
}

pub fn run_all(args: &RunArgs) -> anyhow::Result<()> {
    args.options.init_logger();

    let mut config = args.options.load_config()?;
    if args.no_zscore {
        config.zscore = false;
    }

    let expr = args.input.read()?;
    let reference = read_regulators(&args.regulators)?;

    let out = run_pipeline(&expr, &reference, &config)?;
    let output = |suffix: &str| args.options.output(suffix);

    write_json(&config, &output("config.json"))?;

    // clusters
    write_json(&out.initial_clusters, &output("initial_clusters.json"))?;
    write_json(&out.revised_clusters, &output("clusters.json"))?;
    write_membership_set(&out.cluster_membership, &out.expr, &output("clusters"))?;
    write_cluster_matrix(&out.cluster_medians, &output("cluster_medians.tsv.gz"))?;

    // regulators
    write_cluster_matrix(&out.axes.to_cluster_matrix(), &output("eigengenes.tsv.gz"))?;
    write_json(&out.mechanistic, &output("mechanistic.json"))?;
    write_json(&out.coregulation_modules, &output("coregulation_modules.json"))?;
    write_json(&out.regulons, &output("regulons.json"))?;
    write_json(&out.coexpression_modules, &output("coexpression_modules.json"))?;

    // module and regulon activity, sample classes
    write_membership_set(&out.module_membership, &out.expr, &output("modules"))?;
    write_cluster_matrix(&out.module_medians, &output("module_medians.tsv.gz"))?;
    write_json(&out.regulon_names, &output("regulon_names.json"))?;
    write_membership_set(&out.regulon_membership, &out.expr, &output("regulons"))?;
    let subtypes = Subtypes {
        similarity_clusters: out.similarity_clusters,
        classes: out.classes,
        centroids: out.centroids,
        mapping: out.mapping,
        order: out.order,
    };
    write_subtypes(&subtypes, &args.options.out)?;

    write_spectrum(&out.spectrum, &output("network"))
}
