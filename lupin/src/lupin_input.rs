use clap::Args;
use log::{info, warn};
use lupin::common::SampleId;
use lupin::identifier::{convert, IdentifierTable};
use lupin::reference::RegulatorTable;
use lupin::{ExpressionMatrix, MinerConfig};
use matrix_util::common_io::*;
use serde::de::DeserializeOwned;

/// Options shared by every subcommand
#[derive(Args, Debug)]
pub struct RunOptions {
    /// Output file header
    #[arg(long, short, required = true)]
    pub out: Box<str>,

    /// JSON configuration file. Flags given on the command line
    /// override its values.
    #[arg(long, short)]
    pub config: Option<Box<str>>,

    /// number of threads (0: all cores)
    #[arg(long, short = 'j')]
    pub threads: Option<usize>,

    /// minimum genes per cluster and regulon
    #[arg(long, short = 'm')]
    pub min_number_genes: Option<usize>,

    /// verbosity
    #[arg(long, short)]
    pub verbose: bool,
}

impl RunOptions {
    pub fn init_logger(&self) {
        if self.verbose {
            std::env::set_var("RUST_LOG", "info");
        }
        env_logger::init();
    }

    /// Configuration file (or defaults) with command-line overrides
    pub fn load_config(&self) -> anyhow::Result<MinerConfig> {
        let mut config = match self.config.as_deref() {
            Some(file) => MinerConfig::from_json_file(file)?,
            None => MinerConfig::default(),
        };
        if let Some(n) = self.threads {
            config.num_threads = n;
        }
        if let Some(m) = self.min_number_genes {
            config = config.with_min_number_genes(m);
        }
        Ok(config)
    }

    /// Global pool for the stage-by-stage subcommands
    pub fn build_thread_pool(&self, config: &MinerConfig) -> anyhow::Result<()> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()?;
        Ok(())
    }

    pub fn output(&self, suffix: &str) -> String {
        format!("{}.{}", self.out, suffix)
    }
}

/// Expression data with optional identifier conversion
#[derive(Args, Debug)]
pub struct ExpressionInput {
    /// Expression matrix: header row of sample names, gene IDs in the
    /// first column (`.tsv`, `.csv`, optionally `.gz`)
    #[arg(required = true)]
    pub expression: Box<str>,

    /// Two-column table mapping row IDs onto canonical gene IDs
    #[arg(long)]
    pub id_table: Option<Box<str>>,
}

impl ExpressionInput {
    pub fn read(&self) -> anyhow::Result<ExpressionMatrix> {
        let expr = read_expression(&self.expression)?;
        match self.id_table.as_deref() {
            Some(file) => {
                let table = IdentifierTable::from_pairs(read_pairs(file)?);
                info!("{} identifiers in {}", table.len(), file);
                let converted = convert(&expr, &table)?;
                if !converted.dropped.is_empty() {
                    warn!("{} rows without a mapped identifier", converted.dropped.len());
                }
                if !converted.duplicates.is_empty() {
                    warn!("{} duplicated identifiers after mapping", converted.duplicates.len());
                }
                Ok(converted.expr)
            }
            None => Ok(expr),
        }
    }
}

/// Read a genes x samples matrix. The header may or may not carry a
/// label for the gene column.
pub fn read_expression(file: &str) -> anyhow::Result<ExpressionMatrix> {
    let ReadLinesOut { lines, header } = read_lines_of_words_delim(file, detect_delimiter(file), 0)?;

    let ncols = lines.first().map(|l| l.len()).unwrap_or(0);
    if ncols < 2 {
        anyhow::bail!("{}: need a gene column and at least one sample", file);
    }
    let samples: Vec<SampleId> = if header.len() == ncols {
        header[1..].to_vec()
    } else if header.len() + 1 == ncols {
        header
    } else {
        anyhow::bail!(
            "{}: header has {} fields but rows have {}",
            file,
            header.len(),
            ncols
        );
    };

    let mut genes = Vec::with_capacity(lines.len());
    let mut rows = Vec::with_capacity(lines.len());
    for (i, words) in lines.into_iter().enumerate() {
        if words.len() != ncols {
            anyhow::bail!("{}: line {} has {} fields, expected {}", file, i + 2, words.len(), ncols);
        }
        let values = words[1..]
            .iter()
            .map(|w| w.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| anyhow::anyhow!("{}: gene {}: {}", file, words[0], e))?;
        genes.push(words[0].clone());
        rows.push(values);
    }

    let expr = ExpressionMatrix::from_rows(genes, samples, &rows)?;
    info!(
        "read {} genes x {} samples from {}",
        expr.num_genes(),
        expr.num_samples(),
        file
    );
    Ok(expr)
}

/// First two columns of every line; lines with fewer fields are skipped
pub fn read_pairs(file: &str) -> anyhow::Result<Vec<(Box<str>, Box<str>)>> {
    let ReadLinesOut { lines, .. } = read_lines_of_words_delim(file, &['\t', ','], -1)?;
    Ok(lines
        .into_iter()
        .filter(|w| w.len() >= 2)
        .map(|w| (w[0].clone(), w[1].clone()))
        .collect())
}

/// Regulator/target pairs, one per line
pub fn read_regulators(file: &str) -> anyhow::Result<RegulatorTable> {
    let table = RegulatorTable::from_pairs(read_pairs(file)?);
    if table.num_regulators() == 0 {
        anyhow::bail!("no regulator/target pairs in {}", file);
    }
    info!(
        "{} regulators, {} pairs from {}",
        table.num_regulators(),
        table.num_pairs(),
        file
    );
    Ok(table)
}

pub fn read_json<T: DeserializeOwned>(file: &str) -> anyhow::Result<T> {
    let reader = open_buf_reader(file)?;
    serde_json::from_reader(reader).map_err(|e| anyhow::anyhow!("{}: {}", file, e))
}
