use log::info;
use lupin::centroid::CentroidResult;
use lupin::common::*;
use lupin::expression::ExpressionMatrix;
use lupin::membership::{membership_to_incidence, MembershipLabel, MembershipSet};
use lupin::pipeline::Subtypes;
use lupin::principal::ClusterMatrix;
use lupin::topology::RegulonSpectrum;
use matrix_util::common_io::*;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;

pub fn write_json<T: Serialize>(value: &T, file: &str) -> anyhow::Result<()> {
    mkdir(file)?;
    let mut buf = open_buf_writer(file)?;
    serde_json::to_writer_pretty(&mut buf, value)?;
    writeln!(buf)?;
    buf.flush()?;
    info!("wrote {}", file);
    Ok(())
}

/// Delimited matrix with a header of column names and row names in the
/// first column
pub fn write_named_matrix<R, C>(
    mat: &Mat,
    corner: &str,
    row_names: &[R],
    col_names: &[C],
    file: &str,
) -> anyhow::Result<()>
where
    R: Display,
    C: Display,
{
    if mat.nrows() != row_names.len() || mat.ncols() != col_names.len() {
        anyhow::bail!(
            "{}: {} x {} matrix with {} row and {} column names",
            file,
            mat.nrows(),
            mat.ncols(),
            row_names.len(),
            col_names.len()
        );
    }
    let delim = detect_delimiter(file);

    let mut lines: Vec<Box<str>> = Vec::with_capacity(mat.nrows() + 1);
    let header = std::iter::once(corner.to_string())
        .chain(col_names.iter().map(|c| c.to_string()))
        .collect::<Vec<_>>()
        .join(delim);
    lines.push(header.into_boxed_str());

    for (i, name) in row_names.iter().enumerate() {
        let line = std::iter::once(name.to_string())
            .chain(mat.row(i).iter().map(|x| x.to_string()))
            .collect::<Vec<_>>()
            .join(delim);
        lines.push(line.into_boxed_str());
    }

    mkdir(file)?;
    write_lines(&lines, file)?;
    info!("wrote {}", file);
    Ok(())
}

pub fn write_cluster_matrix(cm: &ClusterMatrix, file: &str) -> anyhow::Result<()> {
    write_named_matrix(&cm.mat, "cluster", &cm.clusters, &cm.samples, file)
}

/// Four label dictionaries and their incidence matrices
pub fn write_membership_set(
    set: &MembershipSet,
    expr: &ExpressionMatrix,
    out: &str,
) -> anyhow::Result<()> {
    for label in MembershipLabel::ALL {
        let dict = set.get(label);
        write_json(dict, &format!("{}.{}.json", out, label.name()))?;
        let incidence = membership_to_incidence(dict, expr)?;
        write_named_matrix(
            &incidence.mat,
            "cluster",
            &incidence.clusters,
            &incidence.samples,
            &format!("{}.{}.incidence.tsv.gz", out, label.name()),
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct ClassAssignment<'a> {
    classes: &'a [SampleSet],
    unmapped: &'a SampleSet,
}

pub fn write_subtypes(subtypes: &Subtypes, out: &str) -> anyhow::Result<()> {
    write_json(
        &subtypes.similarity_clusters,
        &format!("{}.similarity_clusters.json", out),
    )?;

    let CentroidResult {
        classes,
        centroids,
        unmapped,
    } = &subtypes.centroids;
    write_json(
        &ClassAssignment { classes, unmapped },
        &format!("{}.classes.json", out),
    )?;

    let centroid_names: Vec<String> = (0..centroids.num_centroids())
        .map(|k| format!("centroid{}", k))
        .collect();
    write_named_matrix(
        &centroids.mat,
        "cluster",
        &centroids.clusters,
        &centroid_names,
        &format!("{}.centroids.tsv.gz", out),
    )?;

    write_json(&subtypes.mapping, &format!("{}.mapping.json", out))?;
    write_json(&subtypes.order, &format!("{}.order.json", out))?;
    Ok(())
}

pub fn write_spectrum(spectrum: &RegulonSpectrum, out: &str) -> anyhow::Result<()> {
    let values: Vec<String> = spectrum.eigenvalues.iter().map(|l| l.to_string()).collect();
    let file = format!("{}.eigenvalues.txt", out);
    mkdir(&file)?;
    write_lines(&values, &file)?;

    let components: Vec<String> = (0..spectrum.eigenvectors.ncols())
        .map(|k| format!("v{}", k))
        .collect();
    write_named_matrix(
        &spectrum.eigenvectors,
        "gene",
        &spectrum.genes,
        &components,
        &format!("{}.eigenvectors.tsv.gz", out),
    )?;
    write_named_matrix(
        &spectrum.laplacian,
        "gene",
        &spectrum.genes,
        &spectrum.genes,
        &format!("{}.laplacian.tsv.gz", out),
    )
}
