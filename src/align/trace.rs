use std::path::{Path, PathBuf};

use anyhow::Context;

/// Dumps the input and raw output of every external call, numbered in call order.
pub struct TraceWriter {
    dir: Option<PathBuf>,
    seq: usize,
}

impl TraceWriter {
    pub fn new(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create trace dir: {}", dir.display()))?;
        Ok(Self {
            dir: Some(dir),
            seq: 0,
        })
    }

    pub fn disabled() -> Self {
        Self { dir: None, seq: 0 }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn write_call(&mut self, kind: &str, input: &str, output: &str) -> anyhow::Result<()> {
        let Some(dir) = self.dir.as_ref() else {
            return Ok(());
        };
        self.seq += 1;
        let name = format!("{:06}.{}.txt", self.seq, sanitize_filename(kind));
        let path = dir.join(name);
        let body = format!("INPUT:\n{input}\n\nOUTPUT:\n{output}\n");
        std::fs::write(&path, body).with_context(|| format!("write trace: {}", path.display()))?;
        Ok(())
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            _ => ch,
        })
        .collect()
}
