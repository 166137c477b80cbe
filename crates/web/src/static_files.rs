//! Serving files from a directory.
//!
//! [`App::register_static`](crate::App::register_static) mounts a root directory under a
//! prefix. Files are read through a [`FileSource`], [`TokioFs`] in production. Paths
//! escaping the root are refused, missing files fall through to the next matching route.

use crate::ctx::{Ctx, CustomCtx};
use crate::error::Error;
use crate::handler::{Handler, HandlerResult, handler_fn};
use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderValue;
use http::header::{CACHE_CONTROL, CONTENT_DISPOSITION};
use mime::Mime;
use serde::Deserialize;
use std::fmt::{self, Write};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// File served when a directory is requested, empty to disable.
    pub index: String,

    /// Lists directory entries when no index file exists.
    pub browse: bool,

    /// `Cache-Control` max age in seconds, `0` sends no header.
    pub max_age: u32,

    /// Sends files as attachments.
    pub download: bool,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self { index: "index.html".to_string(), browse: false, max_age: 0, download: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File { len: u64 },
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read access to the files behind a static mount.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn metadata(&self, path: &Path) -> io::Result<FileKind>;

    async fn read(&self, path: &Path) -> io::Result<Bytes>;

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

/// Reads files with `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

#[async_trait]
impl FileSource for TokioFs {
    async fn metadata(&self, path: &Path) -> io::Result<FileKind> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(if metadata.is_dir() { FileKind::Dir } else { FileKind::File { len: metadata.len() } })
    }

    async fn read(&self, path: &Path) -> io::Result<Bytes> {
        tokio::fs::read(path).await.map(Bytes::from)
    }

    async fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut dir = tokio::fs::read_dir(path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            entries.push(DirEntry { name: entry.file_name().to_string_lossy().into_owned(), is_dir });
        }
        Ok(entries)
    }
}

pub(crate) struct StaticMount {
    prefix: String,
    root: PathBuf,
    config: StaticConfig,
    source: Arc<dyn FileSource>,
}

impl StaticMount {
    pub(crate) fn new(prefix: &str, root: PathBuf, config: StaticConfig, source: Arc<dyn FileSource>) -> Self {
        Self { prefix: prefix.to_string(), root, config, source }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn into_handler<C: CustomCtx>(self) -> Handler<C> {
        let mount = Arc::new(self);
        handler_fn(move |ctx: &mut C| {
            let mount = Arc::clone(&mount);
            Box::pin(async move { mount.serve(ctx).await })
        })
    }

    async fn serve<C: CustomCtx>(&self, ctx: &mut C) -> HandlerResult {
        let relative = ctx.param("filepath").unwrap_or_default().to_string();
        let path = self.resolve(&relative)?;

        match self.source.metadata(&path).await {
            Ok(FileKind::File { .. }) => self.send_file(ctx, &path).await,
            Ok(FileKind::Dir) => {
                if !self.config.index.is_empty() {
                    let index = path.join(&self.config.index);
                    if let Ok(FileKind::File { .. }) = self.source.metadata(&index).await {
                        return self.send_file(ctx, &index).await;
                    }
                }
                if self.config.browse {
                    return self.send_listing(ctx, &path).await;
                }
                Err(Error::forbidden())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(prefix = %self.prefix, file = %path.display(), "static file not found");
                ctx.next().await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Joins a request relative path to the root, refusing anything but plain names.
    fn resolve(&self, relative: &str) -> Result<PathBuf, Error> {
        let mut path = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return Err(Error::forbidden()),
            }
        }
        Ok(path)
    }

    async fn send_file<C: Ctx>(&self, ctx: &mut C, path: &Path) -> HandlerResult {
        let content = self.source.read(path).await?;

        ctx.content_type(&guess_mime(path))?;
        if self.config.max_age > 0 {
            ctx.set(CACHE_CONTROL, HeaderValue::from_str(&format!("public, max-age={}", self.config.max_age))?);
        }
        if self.config.download {
            let disposition = path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")).ok())
                .unwrap_or_else(|| HeaderValue::from_static("attachment"));
            ctx.set(CONTENT_DISPOSITION, disposition);
        }
        ctx.send(content)
    }

    async fn send_listing<C: Ctx>(&self, ctx: &mut C, dir: &Path) -> HandlerResult {
        let mut entries = self.source.list(dir).await?;
        entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));

        let base = ctx.path().trim_end_matches('/').to_string();
        let mut html = String::with_capacity(256 + entries.len() * 64);
        let _ = write!(html, "<!DOCTYPE html><html><head><title>{}</title></head><body><ul>", escape_html(&base));
        for entry in &entries {
            let suffix = if entry.is_dir { "/" } else { "" };
            let name = escape_html(&entry.name);
            let _ = write!(html, "<li><a href=\"{}/{name}{suffix}\">{name}{suffix}</a></li>", escape_html(&base));
        }
        html.push_str("</ul></body></html>");

        ctx.content_type(&mime::TEXT_HTML_UTF_8)?;
        ctx.send(html)
    }
}

impl fmt::Debug for StaticMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticMount")
            .field("prefix", &self.prefix)
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn guess_mime(path: &Path) -> Mime {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html" | "htm") => mime::TEXT_HTML_UTF_8,
        Some("css") => mime::TEXT_CSS_UTF_8,
        Some("js" | "mjs") => mime::APPLICATION_JAVASCRIPT_UTF_8,
        Some("json") => mime::APPLICATION_JSON,
        Some("txt") => mime::TEXT_PLAIN_UTF_8,
        Some("csv") => mime::TEXT_CSV_UTF_8,
        Some("xml") => mime::TEXT_XML,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("svg") => mime::IMAGE_SVG,
        Some("bmp") => mime::IMAGE_BMP,
        Some("woff") => mime::FONT_WOFF,
        Some("woff2") => mime::FONT_WOFF2,
        Some("pdf") => mime::APPLICATION_PDF,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
