use std::fmt;

use anyhow::{anyhow, bail, Context};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Knownness {
    Known,
    /// `*` marker: not in the monolingual dictionary.
    Unknown,
    /// `@` marker: not in the bilingual dictionary.
    BiUnknown,
    /// `#` marker: the generator could not produce a surface form.
    GenUnknown,
}

impl Knownness {
    fn from_marker(raw_reading: &str) -> Self {
        match raw_reading.chars().next() {
            Some('*') => Self::Unknown,
            Some('@') => Self::BiUnknown,
            Some('#') => Self::GenUnknown,
            _ => Self::Known,
        }
    }
}

/// One `lemma<tag>...` chunk of a reading. Multiword readings are several of these joined by `+`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubReading {
    pub lemma: String,
    pub tags: Vec<String>,
    /// Lemma queue of split multiwords (`take<vblex># out`), kept raw.
    pub queue: String,
}

impl SubReading {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut lemma = String::new();
        let mut tags = Vec::new();
        let mut chars = raw.chars().peekable();

        while let Some(&ch) = chars.peek() {
            if ch == '<' {
                break;
            }
            chars.next();
            lemma.push(ch);
            if ch == '\\' {
                if let Some(next) = chars.next() {
                    lemma.push(next);
                }
            }
        }

        while chars.peek() == Some(&'<') {
            chars.next();
            let mut tag = String::new();
            loop {
                match chars.next() {
                    Some('>') => break,
                    Some(c) => tag.push(c),
                    None => bail!("unterminated tag in reading: {raw}"),
                }
            }
            tags.push(tag);
        }

        let queue: String = chars.collect();
        Ok(Self { lemma, tags, queue })
    }
}

impl fmt::Display for SubReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lemma)?;
        for tag in &self.tags {
            write!(f, "<{tag}>")?;
        }
        f.write_str(&self.queue)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reading {
    pub parts: Vec<SubReading>,
}

impl Reading {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        let parts = split_unescaped(raw, '+')
            .iter()
            .map(|p| SubReading::parse(p))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { parts })
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexicalUnit {
    /// Everything between `^` and `$`, escapes included.
    pub raw: String,
    /// Surface form with stream escapes removed.
    pub wordform: String,
    pub readings: Vec<Reading>,
    pub knownness: Knownness,
}

impl LexicalUnit {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let mut fields = split_unescaped(raw, '/').into_iter();
        let wordform = unescape(&fields.next().unwrap_or_default());
        let raw_readings: Vec<String> = fields.collect();

        let knownness = match raw_readings.as_slice() {
            [only] => Knownness::from_marker(only),
            _ => Knownness::Known,
        };
        let readings = raw_readings
            .iter()
            .map(|r| Reading::parse(r))
            .collect::<anyhow::Result<Vec<_>>>()
            .with_context(|| format!("parse lexical unit: ^{raw}$"))?;

        Ok(Self {
            raw: raw.to_string(),
            wordform,
            readings,
            knownness,
        })
    }

    /// String form of all readings, used as the identity of the unit when matching.
    /// Units without readings fall back to their raw text.
    #[must_use]
    pub fn reading_key(&self) -> String {
        if self.readings.is_empty() {
            return self.raw.clone();
        }
        self.readings
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// A lexical unit together with the blank text that precedes it in the stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyzedUnit {
    pub blank: String,
    pub unit: LexicalUnit,
}

impl AnalyzedUnit {
    #[must_use]
    pub fn blank_len(&self) -> usize {
        self.blank.chars().count()
    }

    /// Characters this unit occupies in the analyzed text: blank plus wordform.
    #[must_use]
    pub fn surface_len(&self) -> usize {
        self.blank_len() + self.unit.wordform.chars().count()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParsedStream {
    pub units: Vec<AnalyzedUnit>,
    /// Blank text after the last lexical unit.
    pub trailing: String,
}

impl ParsedStream {
    /// Rebuilds the text the analyzer saw, minus the trailing blank.
    #[must_use]
    pub fn surface(&self) -> String {
        let mut out = String::new();
        for u in &self.units {
            out.push_str(&u.blank);
            out.push_str(&u.unit.wordform);
        }
        out
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Blank,
    Superblank,
    Unit,
}

pub fn parse_stream(stream: &str) -> anyhow::Result<ParsedStream> {
    let mut units = Vec::new();
    let mut blank = String::new();
    let mut lu = String::new();
    let mut state = State::Blank;
    let mut unit_start = 0usize;

    let mut chars = stream.chars().enumerate();
    while let Some((pos, ch)) = chars.next() {
        match state {
            State::Blank => match ch {
                '\\' => {
                    let (_, next) = chars
                        .next()
                        .ok_or_else(|| anyhow!("dangling escape at end of stream"))?;
                    blank.push(next);
                }
                '[' => {
                    blank.push(ch);
                    state = State::Superblank;
                }
                '^' => {
                    unit_start = pos;
                    state = State::Unit;
                }
                '$' => bail!("unexpected '$' outside lexical unit at char {pos}"),
                _ => blank.push(ch),
            },
            State::Superblank => {
                blank.push(ch);
                match ch {
                    '\\' => {
                        if let Some((_, next)) = chars.next() {
                            blank.push(next);
                        }
                    }
                    ']' => state = State::Blank,
                    _ => {}
                }
            }
            State::Unit => match ch {
                '\\' => {
                    let (_, next) = chars
                        .next()
                        .ok_or_else(|| anyhow!("dangling escape in lexical unit at char {pos}"))?;
                    lu.push(ch);
                    lu.push(next);
                }
                '$' => {
                    let unit = LexicalUnit::parse(&lu)?;
                    units.push(AnalyzedUnit {
                        blank: std::mem::take(&mut blank),
                        unit,
                    });
                    lu.clear();
                    state = State::Blank;
                }
                '^' => bail!("unexpected '^' inside lexical unit at char {pos}"),
                _ => lu.push(ch),
            },
        }
    }

    match state {
        State::Unit => bail!("unterminated lexical unit starting at char {unit_start}"),
        State::Superblank => bail!("unterminated superblank"),
        State::Blank => {}
    }

    Ok(ParsedStream {
        units,
        trailing: blank,
    })
}

/// Splits on `sep` where it is neither escaped nor inside a `<tag>`. Pieces keep their escapes.
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                cur.push(ch);
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            '<' => {
                depth += 1;
                cur.push(ch);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                cur.push(ch);
            }
            c if c == sep && depth == 0 => parts.push(std::mem::take(&mut cur)),
            c => cur.push(c),
        }
    }
    parts.push(cur);
    parts
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}
