//! Persisting markdown artifacts and the index
//!
//! Every file goes through [`write_atomic`]: contents land in a sibling
//! temporary file that is renamed over the destination, so a reader never
//! observes a truncated artifact.

use crate::error::WriteError;
use crate::layout::{page_anchor, OutputLayout};
use crate::pipeline::MarkdownArtifact;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Header of the single-file layout
pub const SINGLE_FILE_HEADER: &str =
    "# Documentation\n\nThis file contains documentation fetched by DocFetch.\n\n---\n\n";

/// Name of the file used to check that the output location is writable
const WRITE_CHECK_FILE: &str = ".doc-fetch-write-check";

/// Files produced by a finished writer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Paths written, in write order
    pub files: Vec<PathBuf>,
    /// Artifact writes that failed
    pub failed: usize,
}

/// Writes artifacts according to the output layout
///
/// The directory layout writes each artifact as it arrives; the single-file
/// layout buffers them and writes once in [`Writer::finish`], in discovery
/// order.
#[derive(Debug)]
pub struct Writer {
    layout: OutputLayout,
    pending: Vec<MarkdownArtifact>,
    used_paths: HashSet<PathBuf>,
    report: WriteReport,
    accepted: usize,
}

impl Writer {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            pending: Vec::new(),
            used_paths: HashSet::new(),
            report: WriteReport::default(),
            accepted: 0,
        }
    }

    /// Check that the destination can be created and written
    pub async fn check_writable(layout: &OutputLayout) -> Result<(), WriteError> {
        let dir = match layout {
            OutputLayout::Directory(root) => root.clone(),
            OutputLayout::SingleFile(path) => {
                if path.is_dir() {
                    return Err(WriteError::Unwritable {
                        path: path.clone(),
                        source: std::io::Error::other("output path is a directory"),
                    });
                }
                parent_dir(path)
            }
        };

        let unwritable = |source| WriteError::Unwritable {
            path: layout.path().to_path_buf(),
            source,
        };
        tokio::fs::create_dir_all(&dir).await.map_err(unwritable)?;
        let marker = dir.join(WRITE_CHECK_FILE);
        tokio::fs::write(&marker, b"").await.map_err(unwritable)?;
        tokio::fs::remove_file(&marker).await.map_err(unwritable)?;
        Ok(())
    }

    /// Accept one artifact
    ///
    /// Returns the written path in the directory layout, `None` when the
    /// artifact was buffered.
    pub async fn accept(
        &mut self,
        artifact: &MarkdownArtifact,
    ) -> Result<Option<PathBuf>, WriteError> {
        self.accepted += 1;
        let OutputLayout::Directory(_) = self.layout else {
            self.pending.push(artifact.clone());
            return Ok(None);
        };

        let path = self.unique_page_path(artifact);
        match write_atomic(&path, render_page_file(artifact).as_bytes()).await {
            Ok(()) => {
                debug!(url = %artifact.url, path = %path.display(), "Wrote page");
                self.report.files.push(path.clone());
                Ok(Some(path))
            }
            Err(e) => {
                warn!(url = %artifact.url, error = %e, "Failed to write page");
                self.report.failed += 1;
                Err(e)
            }
        }
    }

    /// Flush buffered output and report what was written
    pub async fn finish(mut self) -> Result<WriteReport, WriteError> {
        if let OutputLayout::SingleFile(path) = &self.layout {
            self.pending.sort_by_key(|a| a.seq);
            let contents = render_single_file(&self.pending);
            write_atomic(path, contents.as_bytes()).await?;
            self.report.files.push(path.clone());
            return Ok(self.report);
        }

        if self.accepted > 0 && self.report.files.is_empty() {
            return Err(WriteError::NothingWritten {
                failed: self.report.failed,
            });
        }
        Ok(self.report)
    }

    /// Page path in the directory layout; colliding URLs get a sequence suffix
    fn unique_page_path(&mut self, artifact: &MarkdownArtifact) -> PathBuf {
        let mut path = self
            .layout
            .page_path(&artifact.url)
            .unwrap_or_else(|| self.layout.path().join("index.md"));
        if !self.used_paths.insert(path.clone()) {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            path.set_file_name(format!("{stem}-{}.md", artifact.seq));
            self.used_paths.insert(path.clone());
        }
        path
    }
}

/// One page file with its front matter
pub fn render_page_file(artifact: &MarkdownArtifact) -> String {
    // serde_json string quoting is valid YAML.
    let title = serde_json::to_string(&artifact.title).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        "---\nurl: {}\ntitle: {}\ncategory: {}\n---\n\n{}",
        artifact.url, title, artifact.category, artifact.markdown
    )
}

/// The concatenated single-file document
///
/// Each page section opens with an anchor so in-document links land on it.
/// Links to pages that are not part of the document point back at the site.
pub fn render_single_file(artifacts: &[MarkdownArtifact]) -> String {
    let anchors: HashSet<String> = artifacts.iter().map(|a| page_anchor(&a.url)).collect();
    let mut out = String::from(SINGLE_FILE_HEADER);
    for artifact in artifacts {
        let mut markdown = artifact.markdown.clone();
        for (anchor, url) in &artifact.anchor_links {
            if !anchors.contains(anchor) {
                markdown = markdown.replace(&format!("](#{anchor})"), &format!("]({url})"));
            }
        }
        out.push_str(&format!(
            "<a id=\"{}\"></a>\n\n## {}\n\nSource: {}\n\n{}\n---\n\n",
            page_anchor(&artifact.url),
            artifact.title,
            artifact.url,
            markdown
        ));
    }
    out
}

/// Write a file atomically: temp file in the same directory, then rename
///
/// Parent directories are created as needed. The temporary file is removed
/// if any step fails.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    tokio::fs::create_dir_all(parent_dir(path))
        .await
        .map_err(io_err)?;

    let temp_path = temp_path_for(path);
    let result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(io_err(e));
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
