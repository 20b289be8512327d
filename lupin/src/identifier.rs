//! Map row identifiers of an expression matrix onto one canonical gene
//! ID space.

use crate::common::*;
use crate::expression::ExpressionMatrix;
use fnv::FnvHashMap as HashMap;

pub trait IdentifierMapper {
    fn map_id(&self, id: &str) -> Option<GeneId>;
}

/// `ENSG00000141510.17` -> `ENSG00000141510`; other IDs are unchanged
pub fn strip_version(id: &str) -> &str {
    match id.rsplit_once('.') {
        Some((base, ver))
            if !base.is_empty() && !ver.is_empty() && ver.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => id,
    }
}

/// Lookup table with exact and version-stripped matching
#[derive(Debug, Clone, Default)]
pub struct IdentifierTable {
    exact: HashMap<Box<str>, GeneId>,
    base: HashMap<Box<str>, GeneId>,
}

impl IdentifierTable {
    /// Build from `(source ID, canonical ID)` pairs; the first entry
    /// for a source ID wins
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Box<str>, GeneId)>) -> Self {
        let mut exact: HashMap<Box<str>, GeneId> = HashMap::default();
        let mut base: HashMap<Box<str>, GeneId> = HashMap::default();
        for (src, dst) in pairs {
            if src.is_empty() || dst.is_empty() {
                continue;
            }
            base.entry(strip_version(&src).into()).or_insert_with(|| dst.clone());
            exact.entry(src).or_insert(dst);
        }
        Self { exact, base }
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

impl IdentifierMapper for IdentifierTable {
    fn map_id(&self, id: &str) -> Option<GeneId> {
        if let Some(dst) = self.exact.get(id) {
            return Some(dst.clone());
        }
        self.base.get(strip_version(id)).cloned()
    }
}

/// Expression matrix in canonical IDs and what was lost on the way
#[derive(Debug, Clone)]
pub struct Converted {
    pub expr: ExpressionMatrix,
    /// rows without a mapping
    pub dropped: Vec<GeneId>,
    /// rows whose canonical ID was already taken by an earlier row
    pub duplicates: Vec<GeneId>,
}

/// Rename the rows of `expr` through `mapper`.
///
/// Unmappable rows and later duplicates are dropped and reported, not
/// treated as errors. Fails only when nothing maps.
pub fn convert(expr: &ExpressionMatrix, mapper: &impl IdentifierMapper) -> Result<Converted> {
    let mut seen: HashMap<GeneId, usize> = HashMap::default();
    let mut rows = vec![];
    let mut names = vec![];
    let mut dropped = vec![];
    let mut duplicates = vec![];

    for (i, id) in expr.genes().iter().enumerate() {
        match mapper.map_id(id) {
            None => dropped.push(id.clone()),
            Some(dst) => {
                if seen.contains_key(&dst) {
                    duplicates.push(id.clone());
                } else {
                    seen.insert(dst.clone(), i);
                    rows.push(i);
                    names.push(dst);
                }
            }
        }
    }

    if rows.is_empty() {
        return Err(MinerError::invalid(format!(
            "none of the {} gene identifiers could be mapped",
            expr.num_genes()
        )));
    }

    Ok(Converted {
        expr: expr.with_rows(&rows, names)?,
        dropped,
        duplicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("ENSG00000141510.17"), "ENSG00000141510");
        assert_eq!(strip_version("TP53"), "TP53");
        assert_eq!(strip_version("HLA.A"), "HLA.A");
    }

    #[test]
    fn test_convert_drops_and_reports() -> Result<()> {
        let table = IdentifierTable::from_pairs(
            [("ENSG1.3", "A"), ("ENSG2", "B"), ("ENSG3", "B")]
                .iter()
                .map(|&(s, d)| (s.into(), d.into())),
        );
        let genes = vec!["ENSG1.4".into(), "ENSG2.1".into(), "ENSG3".into(), "XYZ".into()];
        let samples = vec!["s1".into(), "s2".into()];
        let expr = ExpressionMatrix::from_rows(
            genes,
            samples,
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0], vec![7.0, 8.0]],
        )?;

        let out = convert(&expr, &table)?;
        let names: Vec<&str> = out.expr.genes().iter().map(|g| g.as_ref()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(out.expr.mat()[(1, 1)], 4.0);
        assert_eq!(out.dropped, vec![GeneId::from("XYZ")]);
        assert_eq!(out.duplicates, vec![GeneId::from("ENSG3")]);
        Ok(())
    }
}
