use serde::Serialize;

/// One line of the character reference table. Out-of-range positions are blank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub index: usize,
    pub source: char,
    pub translation: char,
}

#[must_use]
pub fn table_rows(source: &str, translation: &str) -> Vec<TableRow> {
    let s: Vec<char> = source.chars().collect();
    let t: Vec<char> = translation.chars().collect();
    (0..s.len().max(t.len()))
        .map(|i| TableRow {
            index: i,
            source: s.get(i).copied().unwrap_or(' '),
            translation: t.get(i).copied().unwrap_or(' '),
        })
        .collect()
}

#[must_use]
pub fn render_table(source: &str, translation: &str) -> String {
    table_rows(source, translation)
        .iter()
        .map(|r| format!("{:<2}: {} {}", r.index, r.source, r.translation))
        .collect::<Vec<_>>()
        .join("\n")
}
