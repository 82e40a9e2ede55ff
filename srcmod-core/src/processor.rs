use crate::config::TransformConfig;
use crate::engine::{PipelineOutput, RulePipeline};
use crate::types::TransformReport;
use anyhow::{Context, Result};
use std::fs;

/// Runs the rewrite pipeline against files on disk. The source file is
/// never modified; output always goes to a separate path.
pub struct TransformProcessor {
    pipeline: RulePipeline,
}

impl TransformProcessor {
    pub fn new(config: &TransformConfig) -> Result<Self> {
        Ok(Self {
            pipeline: RulePipeline::from_config(config)?,
        })
    }

    /// Transform a string buffer directly. The file entry points wrap this.
    pub fn process_str(&self, input: &str) -> Result<PipelineOutput> {
        Ok(self.pipeline.run(input)?)
    }

    /// Read `input_path`, run the pipeline, write the result to
    /// `output_path` and return the run report.
    pub fn process_file(&self, input_path: &str, output_path: &str) -> Result<TransformReport> {
        let (report, text) = self.run_file(input_path, output_path)?;
        fs::write(output_path, text)
            .with_context(|| format!("Failed to write output file: {output_path}"))?;
        Ok(report)
    }

    /// Same as `process_file` but nothing is written; the report shows
    /// what a real run would do.
    pub fn dry_run_file(&self, input_path: &str, output_path: &str) -> Result<TransformReport> {
        let (report, _text) = self.run_file(input_path, output_path)?;
        Ok(report)
    }

    fn run_file(&self, input_path: &str, output_path: &str) -> Result<(TransformReport, String)> {
        let source = fs::read_to_string(input_path)
            .with_context(|| format!("Failed to read input file: {input_path}"))?;
        let PipelineOutput { text, outcomes } = self.pipeline.run(&source)?;
        let report = TransformReport::new(input_path, output_path, source.len(), text.len(), outcomes);
        Ok((report, text))
    }
}
