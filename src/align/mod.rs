mod aligner;
mod offsets;
mod subsegment;
mod table;
mod trace;

pub use aligner::{
    AlignOptions, Aligner, Alignment, Correspondence, Gap, GapReason, DEFAULT_MAX_LENGTH,
};
pub use offsets::{CharSpan, OffsetCheck, SpanIndex};
pub use subsegment::{enumerate_subsegments, reading_keys, CandidateIndex, Subsegment};
pub use table::{render_table, table_rows, TableRow};
pub use trace::TraceWriter;
