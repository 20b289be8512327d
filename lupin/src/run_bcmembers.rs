use crate::lupin_input::*;
use crate::lupin_output::*;
use clap::Args;
use lupin::background::BackgroundModel;
use lupin::common::*;
use lupin::membership::*;
use lupin::regulon::{modules_as_clusters, regulons_as_clusters, CoexpressionModule};

#[derive(Args, Debug)]
pub struct BcmembersArgs {
    #[command(flatten)]
    input: ExpressionInput,

    /// Gene clusters (JSON: index -> genes)
    #[arg(long, group = "gene_sets")]
    clusters: Option<Box<str>>,

    /// Co-expression modules (`.coexpression_modules.json` of `mechinf`)
    #[arg(long, group = "gene_sets")]
    modules: Option<Box<str>>,

    /// Regulons (JSON: regulator -> genes), scored in regulator order
    #[arg(long, group = "gene_sets")]
    regulons: Option<Box<str>>,

    #[command(flatten)]
    options: RunOptions,

    /// binomial tail probability for a significant majority level
    #[arg(long, short = 'p')]
    p_value: Option<f64>,

    /// use the values as given, without per-gene standardisation
    #[arg(long, default_value_t = false)]
    no_zscore: bool,
}

pub fn run_bcmembers(args: &BcmembersArgs) -> anyhow::Result<()> {
    args.options.init_logger();

    let mut config = args.options.load_config()?;
    if let Some(x) = args.p_value {
        config.membership.p_value = x;
    }
    if args.no_zscore {
        config.zscore = false;
    }
    config.validate()?;
    args.options.build_thread_pool(&config)?;

    let expr = args.input.read()?;
    let expr = if config.zscore { expr.zscore() } else { expr };

    let clusters: ClusterDict = match (
        args.clusters.as_deref(),
        args.modules.as_deref(),
        args.regulons.as_deref(),
    ) {
        (Some(file), _, _) => read_json(file)?,
        (None, Some(file), _) => {
            let modules: BTreeMap<usize, CoexpressionModule> = read_json(file)?;
            modules_as_clusters(&modules)
        }
        (None, None, Some(file)) => {
            let regulons: RegulonDict = read_json(file)?;
            let (clusters, names) = regulons_as_clusters(&regulons);
            write_json(&names, &args.options.output("regulon_names.json"))?;
            clusters
        }
        (None, None, None) => anyhow::bail!("one of --clusters, --modules or --regulons is needed"),
    };

    let background = BackgroundModel::build(&expr)?;
    let set = MembershipSet::score(&clusters, &background, &config.membership)?;
    write_membership_set(&set, &expr, &args.options.out)
}
