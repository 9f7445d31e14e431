use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Language tag put on every code fence, whatever the file type.
pub const FENCE_LANGUAGE: &str = "python";

/// Message recorded for a finished assembly.
pub const ASSEMBLED_MESSAGE: &str = "Markdown document assembled from all collected files";

/// A collected file and the text read from it (empty when the read failed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub content: String,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Renders one file as a heading followed by a fenced block.
pub fn render_entry(entry: &FileEntry) -> String {
    format!(
        "## File: {}\n\n```{}\n{}\n```\n\n",
        entry.path.display(),
        FENCE_LANGUAGE,
        entry.content
    )
}

/// Concatenates every entry, in order, into one document.
pub fn assemble_document(entries: &[FileEntry]) -> (String, &'static str) {
    let mut markdown = String::new();
    for entry in entries {
        markdown.push_str(&render_entry(entry));
    }
    (markdown, ASSEMBLED_MESSAGE)
}

pub struct MarkdownWriter<W: AsyncWrite + Unpin> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> MarkdownWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }

    pub async fn write_document(&mut self, markdown: &str) -> Result<()> {
        self.writer
            .write_all(markdown.as_bytes())
            .await
            .context("Failed to write markdown document")
    }

    /// Flushes buffered output and hands back the underlying writer.
    pub async fn finish(mut self) -> Result<W> {
        self.writer.flush().await.context("Failed to flush output")?;
        Ok(self.writer.into_inner())
    }
}

/// Creates (or truncates) `output_path` and writes `markdown` to it.
pub async fn write_output(output_path: &Path, markdown: &str) -> Result<()> {
    let file = File::create(output_path)
        .await
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

    let mut md_writer = MarkdownWriter::new(file);
    md_writer.write_document(markdown).await?;
    md_writer.finish().await?;

    debug!("Wrote {} bytes to {}", markdown.len(), output_path.display());
    Ok(())
}
