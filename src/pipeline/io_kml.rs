// Line-oriented access to the KML boundary documents.

use std::fs;

use snafu::prelude::*;

use crate::pipeline::*;

/// Reads a boundary file as a vector of lines, without the terminators.
pub fn read_lines(path: &str) -> PipelineResult<Vec<String>> {
    let doc = read_document(path)?;
    Ok(doc.lines().map(|line| line.to_string()).collect())
}

pub fn read_document(path: &str) -> PipelineResult<String> {
    fs::read_to_string(path).context(OpeningKmlSnafu { path })
}

pub fn write_document(path: &str, doc: &str) -> PipelineResult<()> {
    fs::write(path, doc).context(WritingOutputSnafu { path })
}
