use anyhow::Context;
use serde::Serialize;

use crate::align::{render_table, table_rows, Alignment, Correspondence, Gap, OffsetCheck, TableRow};
use crate::config::OutputFormat;

#[derive(Clone, Copy, Debug, Default)]
pub struct ReportOptions {
    pub table: bool,
    pub gaps: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    pair: &'a str,
    source: &'a str,
    translation: &'a str,
    correspondences: &'a [Correspondence],
    #[serde(skip_serializing_if = "Option::is_none")]
    gaps: Option<&'a [Gap]>,
    source_check: OffsetCheck,
    translation_check: OffsetCheck,
    source_subsegments: usize,
    target_candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    table: Option<Vec<TableRow>>,
}

pub fn render(
    alignment: &Alignment,
    pair: &str,
    format: OutputFormat,
    opts: ReportOptions,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(alignment, opts)),
        OutputFormat::Json => render_json(alignment, pair, opts),
    }
}

fn render_text(alignment: &Alignment, opts: ReportOptions) -> String {
    let mut out = String::new();
    for c in &alignment.correspondences {
        out.push_str(&c.to_string());
        out.push('\n');
    }
    if opts.gaps {
        for g in &alignment.gaps {
            out.push_str(&format!(
                "# unmatched {}..={} {:?} ({}: {:?})\n",
                g.source_span.start,
                g.source_span.end,
                g.source_text,
                g.reason.as_str(),
                g.translated_text
            ));
        }
    }
    if opts.table {
        out.push('\n');
        out.push_str(&render_table(&alignment.source_text, &alignment.translation));
        out.push('\n');
    }
    out
}

fn render_json(alignment: &Alignment, pair: &str, opts: ReportOptions) -> anyhow::Result<String> {
    let report = JsonReport {
        pair,
        source: &alignment.source_text,
        translation: &alignment.translation,
        correspondences: &alignment.correspondences,
        gaps: opts.gaps.then_some(alignment.gaps.as_slice()),
        source_check: alignment.source_check,
        translation_check: alignment.translation_check,
        source_subsegments: alignment.source_subsegments,
        target_candidates: alignment.target_candidates,
        table: opts
            .table
            .then(|| table_rows(&alignment.source_text, &alignment.translation)),
    };
    let mut text = serde_json::to_string_pretty(&report).context("serialize report")?;
    text.push('\n');
    Ok(text)
}
