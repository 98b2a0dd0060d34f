use std::collections::HashMap;
use std::fmt;

use anyhow::{anyhow, Context};
use serde::Serialize;

use crate::apertium::{Side, Translator};
use crate::progress::ConsoleProgress;
use crate::stream::{parse_stream, ParsedStream};

use super::offsets::{CharSpan, OffsetCheck, SpanIndex};
use super::subsegment::{enumerate_subsegments, reading_keys, CandidateIndex};
use super::trace::TraceWriter;

pub const DEFAULT_MAX_LENGTH: usize = 5;

const PROGRESS_EVERY: usize = 25;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlignOptions {
    pub max_source_length: usize,
    pub max_translation_length: usize,
    pub memoize: bool,
    pub strict_offsets: bool,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            max_source_length: DEFAULT_MAX_LENGTH,
            max_translation_length: DEFAULT_MAX_LENGTH,
            memoize: true,
            strict_offsets: false,
        }
    }
}

/// A source substring and the target substring it was matched to, with inclusive character
/// offsets into the full source text and the full translation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Correspondence {
    pub source_text: String,
    /// Translation of `source_text` on its own, not a slice of the full translation.
    pub translated_text: String,
    pub source_start: usize,
    pub source_end: usize,
    pub translation_start: usize,
    pub translation_end: usize,
}

impl fmt::Display for Correspondence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={} {:?} => {}..={} {:?}",
            self.source_start,
            self.source_end,
            self.source_text,
            self.translation_start,
            self.translation_end,
            self.translated_text
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    EmptyTranslation,
    NoMatch,
}

impl GapReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyTranslation => "empty_translation",
            Self::NoMatch => "no_match",
        }
    }
}

/// A source subsegment that produced no correspondence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub source_text: String,
    pub source_span: CharSpan,
    pub translated_text: String,
    pub reason: GapReason,
}

#[derive(Clone, Debug, Serialize)]
pub struct Alignment {
    pub source_text: String,
    pub translation: String,
    pub correspondences: Vec<Correspondence>,
    pub gaps: Vec<Gap>,
    pub source_check: OffsetCheck,
    pub translation_check: OffsetCheck,
    pub source_subsegments: usize,
    pub target_candidates: usize,
}

#[derive(Clone)]
struct Isolated {
    text: String,
    keys: Vec<String>,
}

pub struct Aligner<T: Translator> {
    translator: T,
    options: AlignOptions,
    progress: ConsoleProgress,
    trace: TraceWriter,
}

impl<T: Translator> Aligner<T> {
    pub fn new(translator: T, options: AlignOptions) -> Self {
        Self {
            translator,
            options,
            progress: ConsoleProgress::silent(),
            trace: TraceWriter::disabled(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ConsoleProgress) -> Self {
        self.progress = progress;
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: TraceWriter) -> Self {
        self.trace = trace;
        self
    }

    pub fn align(&mut self, text: &str) -> anyhow::Result<Alignment> {
        self.progress.info("Analyze source");
        let source = self.analyze(text, Side::Source)?;
        let source_check = OffsetCheck::verify(text, &source);
        self.enforce(Side::Source, &source_check)?;

        let translation = self.translate(text)?;
        self.progress.info(format!("Translation: {translation}"));
        let target = self.analyze(&translation, Side::Target)?;
        let translation_check = OffsetCheck::verify(&translation, &target);
        self.enforce(Side::Target, &translation_check)?;

        let segments = enumerate_subsegments(&source.units, self.options.max_source_length);
        let candidates =
            CandidateIndex::build(&target.units, self.options.max_translation_length);
        let source_spans = SpanIndex::new(&source.units);
        let target_spans = SpanIndex::new(&target.units);
        self.progress.info(format!(
            "Units: source={} target={}; subsegments={} candidates={}",
            source.units.len(),
            target.units.len(),
            segments.len(),
            candidates.count()
        ));

        let mut memo: HashMap<String, Isolated> = HashMap::new();
        let mut correspondences = Vec::new();
        let mut gaps = Vec::new();
        for (n, seg) in segments.iter().enumerate() {
            self.progress
                .progress("Subsegments", n + 1, segments.len(), PROGRESS_EVERY);

            let literal = seg.literal_text();
            let span = source_spans.span(seg.start, seg.last);
            let isolated = match memo.get(&literal) {
                Some(hit) => hit.clone(),
                None => {
                    let fresh = self
                        .translate_isolated(&literal)
                        .with_context(|| format!("subsegment {}..={}", seg.start, seg.last))?;
                    if self.options.memoize {
                        memo.insert(literal.clone(), fresh.clone());
                    }
                    fresh
                }
            };

            let matched = candidates.first_match(&isolated.keys);
            match matched {
                Some((start, last)) => {
                    let target_span = target_spans.span(start, last);
                    correspondences.push(Correspondence {
                        source_text: literal,
                        translated_text: isolated.text,
                        source_start: span.start,
                        source_end: span.end,
                        translation_start: target_span.start,
                        translation_end: target_span.end,
                    });
                }
                None => {
                    let reason = if isolated.keys.is_empty() {
                        GapReason::EmptyTranslation
                    } else {
                        GapReason::NoMatch
                    };
                    gaps.push(Gap {
                        source_text: literal,
                        source_span: span,
                        translated_text: isolated.text,
                        reason,
                    });
                }
            }
        }

        self.progress.info(format!(
            "Aligned {} of {} subsegments",
            correspondences.len(),
            segments.len()
        ));

        Ok(Alignment {
            source_text: text.to_string(),
            translation,
            correspondences,
            gaps,
            source_check,
            translation_check,
            source_subsegments: segments.len(),
            target_candidates: candidates.count(),
        })
    }

    fn translate_isolated(&mut self, literal: &str) -> anyhow::Result<Isolated> {
        let text = self.translate(literal)?;
        if text.is_empty() {
            return Ok(Isolated {
                text,
                keys: Vec::new(),
            });
        }
        let parsed = self.analyze(&text, Side::Target)?;
        Ok(Isolated {
            keys: reading_keys(&parsed.units),
            text,
        })
    }

    fn translate(&mut self, text: &str) -> anyhow::Result<String> {
        let out = self.translator.translate(text)?;
        self.trace.write_call("translate", text, &out)?;
        Ok(out)
    }

    fn analyze(&mut self, text: &str, side: Side) -> anyhow::Result<ParsedStream> {
        let raw = self.translator.analyze(text, side)?;
        self.trace
            .write_call(&format!("analyze-{}", side.label()), text, &raw)?;
        parse_stream(&raw).with_context(|| format!("parse {} analysis of {text:?}", side.label()))
    }

    fn enforce(&self, side: Side, check: &OffsetCheck) -> anyhow::Result<()> {
        if check.reconstructs {
            return Ok(());
        }
        let at = check
            .mismatch_at
            .map(|i| i.to_string())
            .unwrap_or_else(|| "?".to_string());
        let msg = format!(
            "{} analysis does not reconstruct its text (first difference at char {at}); offsets may drift",
            side.label()
        );
        if self.options.strict_offsets {
            return Err(anyhow!(msg));
        }
        self.progress.warn(msg);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes text back as its own translation and analyzes each space-separated word as
    /// `^w/w<x>$`.
    struct Identity;

    impl Translator for Identity {
        fn analyze(&self, text: &str, _side: Side) -> anyhow::Result<String> {
            Ok(text
                .split(' ')
                .filter(|w| !w.is_empty())
                .map(|w| format!("^{w}/{w}<x>$"))
                .collect::<Vec<_>>()
                .join(" "))
        }

        fn translate(&self, text: &str) -> anyhow::Result<String> {
            Ok(text.to_string())
        }
    }

    #[test]
    fn identity_translation_aligns_every_subsegment_to_itself() {
        let mut aligner = Aligner::new(Identity, AlignOptions::default());
        let out = aligner.align("a bb ccc").unwrap();
        assert_eq!(out.source_subsegments, 6);
        assert_eq!(out.correspondences.len(), 6);
        assert!(out.gaps.is_empty());
        for c in &out.correspondences {
            assert_eq!(c.source_start, c.translation_start);
            assert_eq!(c.source_end, c.translation_end);
        }
        assert!(out.source_check.reconstructs);
    }

    #[test]
    fn zero_max_length_yields_nothing() {
        let opts = AlignOptions {
            max_source_length: 0,
            ..AlignOptions::default()
        };
        let out = Aligner::new(Identity, opts).align("a b").unwrap();
        assert!(out.correspondences.is_empty());
        assert!(out.gaps.is_empty());
    }

    #[test]
    fn display_shows_both_spans() {
        let c = Correspondence {
            source_text: "cat".into(),
            translated_text: "gato".into(),
            source_start: 4,
            source_end: 6,
            translation_start: 3,
            translation_end: 6,
        };
        assert_eq!(c.to_string(), r#"4..=6 "cat" => 3..=6 "gato""#);
    }
}
