use crate::llr::MarginalDensity;
use crate::report::PairReport;
use log::debug;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Consumer of finished pair estimates (a figure renderer, a grid dump, ...).
///
/// The sink gets everything it needs through the report it is handed; no
/// shared drawing state is involved.
pub trait PairSink {
    /// Renders one pair and returns the path of the main artefact.
    fn emit(&mut self, report: &PairReport) -> Result<PathBuf, Box<dyn Error>>;
}

/// Writes the clipped log-ratio surface and both marginals of each pair as TSV grids.
pub struct GridExporter {
    output_dir: PathBuf,
    display_bound: f64,
}

fn fmt_value(v: f64) -> String {
    format!("{:.6}", v)
}

impl GridExporter {
    pub fn new<P: AsRef<Path>>(output_dir: P, display_bound: f64) -> Result<GridExporter, Box<dyn Error>> {
        fs::create_dir_all(output_dir.as_ref())?;
        Ok(GridExporter { output_dir: output_dir.as_ref().to_path_buf(), display_bound })
    }

    /// Surface file: header row holds the protein bin lower edges, first column the RNA ones.
    fn write_surface(&self, report: &PairReport, path: &Path) -> Result<(), Box<dyn Error>> {
        let joint = &report.joint;
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;

        let mut header = vec![format!("{}\\{}", report.rna_feature, report.protein_feature)];
        header.extend(joint.y_edges[..joint.y_edges.len() - 1].iter().map(|&e| fmt_value(e)));
        writer.write_record(&header)?;

        for (edge, row) in joint.x_edges.iter().zip(joint.clipped(self.display_bound).iter()) {
            let mut record = vec![fmt_value(*edge)];
            record.extend(row.iter().map(|&v| fmt_value(v)));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Marginals file: one line per bin with both classes of both features.
    fn write_marginals(&self, report: &PairReport, path: &Path) -> Result<(), Box<dyn Error>> {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_path(path)?;
        writer.write_record(["bin_lo", "bin_hi", "rna_pos", "rna_neg", "pro_pos", "pro_neg"])?;

        let rna: &MarginalDensity = &report.rna_marginal;
        let pro: &MarginalDensity = &report.protein_marginal;
        let edges = &rna.positive.edges;
        for i in 0..rna.positive.values.len() {
            writer.write_record([
                fmt_value(edges[i]),
                fmt_value(edges[i + 1]),
                fmt_value(rna.positive.values[i]),
                fmt_value(rna.negative.values[i]),
                fmt_value(pro.positive.values[i]),
                fmt_value(pro.negative.values[i]),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl PairSink for GridExporter {
    fn emit(&mut self, report: &PairReport) -> Result<PathBuf, Box<dyn Error>> {
        let stem = report.file_stem();
        let surface = self.output_dir.join(format!("{}_llr.tsv", stem));
        let marginals = self.output_dir.join(format!("{}_marginals.tsv", stem));

        self.write_surface(report, &surface)?;
        self.write_marginals(report, &marginals)?;
        debug!("Wrote {} and {}", surface.display(), marginals.display());

        Ok(surface)
    }
}
