//! End-to-end run: clusters, regulators, regulons, sample classes and
//! the network spectrum, every intermediate kept.

use crate::background::BackgroundModel;
use crate::centroid::*;
use crate::coexpression::cluster;
use crate::common::*;
use crate::config::MinerConfig;
use crate::expression::ExpressionMatrix;
use crate::mechanistic::*;
use crate::membership::*;
use crate::principal::{cluster_median_matrix, principal_axes, ClusterAxes, ClusterMatrix};
use crate::reference::RegulatorReference;
use crate::regulon::*;
use crate::revision::revise;
use crate::stratify::*;
use crate::topology::{laplacian, RegulonSpectrum};

pub struct PipelineOutput {
    /// the matrix every stage saw (z-scored if requested)
    pub expr: ExpressionMatrix,
    pub initial_clusters: Vec<GeneSet>,
    pub revised_clusters: ClusterDict,
    pub background: BackgroundModel,
    pub cluster_membership: MembershipSet,
    pub cluster_medians: ClusterMatrix,
    pub axes: ClusterAxes,
    pub mechanistic: MechanisticOutput,
    pub coregulation_modules: CoregulationModules,
    pub regulons: RegulonDict,
    pub coexpression_modules: BTreeMap<usize, CoexpressionModule>,
    /// coexpression modules scored again, keyed by cluster
    pub module_membership: MembershipSet,
    pub module_medians: ClusterMatrix,
    /// regulator of each regulon key used below
    pub regulon_names: Vec<Box<str>>,
    pub regulon_membership: MembershipSet,
    /// over-expressed module incidence; input of the stratification
    pub incidence: IncidenceMatrix,
    pub similarity_clusters: SimilarityClusters,
    pub classes: Vec<SampleSet>,
    pub centroids: CentroidResult,
    pub mapping: NetworkMapping,
    pub order: MembershipOrder,
    pub spectrum: RegulonSpectrum,
}

/// Sample stratification on one membership dictionary and its incidence
pub struct Subtypes {
    pub similarity_clusters: SimilarityClusters,
    pub classes: Vec<SampleSet>,
    pub centroids: CentroidResult,
    pub mapping: NetworkMapping,
    pub order: MembershipOrder,
}

pub fn stratify_samples(
    over_expressed: &MembershipDictionary,
    incidence: &IncidenceMatrix,
    args: &StratifyArgs,
) -> Result<Subtypes> {
    args.validate()?;
    let mut similarity_clusters = similarity_clusters(
        over_expressed,
        args.freq_threshold,
        args.similarity_threshold,
        args.high_resolution,
    )?;
    similarity_clusters.cover(&incidence.samples);
    let classes = classes_from_clusters(&similarity_clusters.clusters);
    let centroids = centroids(&classes, incidence, args.f1_threshold)?;
    let mapping = map_expression_to_network(&centroids.centroids, incidence, args.mapping_threshold)?;
    let order = order_membership(&centroids.centroids, incidence, &mapping)?;
    Ok(Subtypes {
        similarity_clusters,
        classes,
        centroids,
        mapping,
        order,
    })
}

fn run_stages<R>(expr: &ExpressionMatrix, reference: &R, config: &MinerConfig) -> Result<PipelineOutput>
where
    R: RegulatorReference + ?Sized,
{
    let expr = if config.zscore { expr.zscore() } else { expr.clone() };

    info!("co-expression clustering");
    let initial_clusters = cluster(&expr, &config.coexpression)?;

    info!("revising {} clusters", initial_clusters.len());
    let revised_clusters = revise(&initial_clusters, &expr, &config.revision)?;
    if revised_clusters.is_empty() {
        return Err(MinerError::InsufficientData(
            "no co-expression cluster survived revision".to_string(),
        ));
    }

    let background = BackgroundModel::build(&expr)?;
    let cluster_membership = MembershipSet::score(&revised_clusters, &background, &config.membership)?;
    let cluster_medians = cluster_median_matrix(&expr, &revised_clusters);

    info!("mechanistic inference");
    let axes = principal_axes(&revised_clusters, &expr, config.mechanistic.min_number_genes)?;
    let mechanistic = infer(&axes, &revised_clusters, &expr, reference, &config.mechanistic)?;
    let coregulation_modules = get_coregulation_modules(&mechanistic);
    let regulons = get_regulons(
        &coregulation_modules,
        config.regulon.min_number_genes,
        config.regulon.freq_threshold,
    )?;
    if regulons.is_empty() {
        return Err(MinerError::InsufficientData(
            "no regulon passed the frequency and size filters".to_string(),
        ));
    }
    let coexpression_modules = get_coexpression_modules(&mechanistic);

    info!("module activity across {} samples", expr.num_samples());
    let module_clusters = modules_as_clusters(&coexpression_modules);
    let module_membership = MembershipSet::score(&module_clusters, &background, &config.membership)?;
    let module_medians = cluster_median_matrix(&expr, &module_clusters);
    let incidence = membership_to_incidence(&module_membership.over_expressed, &expr)?;

    let (regulon_clusters, regulon_names) = regulons_as_clusters(&regulons);
    let regulon_membership = MembershipSet::score(&regulon_clusters, &background, &config.membership)?;

    info!("sample stratification");
    let Subtypes {
        similarity_clusters,
        classes,
        centroids,
        mapping,
        order,
    } = stratify_samples(&module_membership.over_expressed, &incidence, &config.stratify)?;

    let spectrum = laplacian(&regulons)?;

    Ok(PipelineOutput {
        expr,
        initial_clusters,
        revised_clusters,
        background,
        cluster_membership,
        cluster_medians,
        axes,
        mechanistic,
        coregulation_modules,
        regulons,
        coexpression_modules,
        module_membership,
        module_medians,
        regulon_names,
        regulon_membership,
        incidence,
        similarity_clusters,
        classes,
        centroids,
        mapping,
        order,
        spectrum,
    })
}

/// Run every stage inside a pool of `config.num_threads` workers
pub fn run_pipeline<R>(
    expr: &ExpressionMatrix,
    reference: &R,
    config: &MinerConfig,
) -> Result<PipelineOutput>
where
    R: RegulatorReference + ?Sized,
{
    config.validate()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()
        .map_err(|e| MinerError::invalid(format!("thread pool: {}", e)))?;

    info!(
        "pipeline on {} genes x {} samples with {} threads",
        expr.num_genes(),
        expr.num_samples(),
        pool.current_num_threads()
    );
    pool.install(|| run_stages(expr, reference, config))
}
