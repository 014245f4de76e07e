//! Interchangeable representations of one file.

use std::fmt;
use std::io;
use std::sync::Arc;

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use facetfs_resolver::{BoxError, FactoryRegistry, ResolveError, ValueResolver};
use futures::StreamExt;
use lazy_static::lazy_static;
use tracing::debug;
use url::Url;

use crate::actor::{Actor, Capability};
use crate::entry::{NodeLocator, StorageLocator};
use crate::path::FsPath;
use crate::service::Filesystem;
use crate::stream::ByteStream;
use crate::subject::Subject;
use crate::Error;

/// The kinds of representation a [`FileFacade`] can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FacetKind {
    Uid,
    Path,
    Node,
    StorageLocator,
    Stream,
    Buffer,
    WebUrl,
    DataUrl,
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacetKind::Uid => "uid",
            FacetKind::Path => "path",
            FacetKind::Node => "fs-node",
            FacetKind::StorageLocator => "s3-info",
            FacetKind::Stream => "stream",
            FacetKind::Buffer => "buffer",
            FacetKind::WebUrl => "web_url",
            FacetKind::DataUrl => "data_url",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum Facet {
    Uid(String),
    Path(FsPath),
    Node(Arc<Subject>),
    StorageLocator(StorageLocator),
    /// Take-once; see [`ByteStream`].
    Stream(ByteStream),
    Buffer(Bytes),
    WebUrl(Url),
    /// A `data:` URL with a base64 payload.
    DataUrl(String),
}

impl Facet {
    pub fn kind(&self) -> FacetKind {
        match self {
            Facet::Uid(_) => FacetKind::Uid,
            Facet::Path(_) => FacetKind::Path,
            Facet::Node(_) => FacetKind::Node,
            Facet::StorageLocator(_) => FacetKind::StorageLocator,
            Facet::Stream(_) => FacetKind::Stream,
            Facet::Buffer(_) => FacetKind::Buffer,
            Facet::WebUrl(_) => FacetKind::WebUrl,
            Facet::DataUrl(_) => FacetKind::DataUrl,
        }
    }
}

/// What every derivation may use: the filesystem, the acting identity, and
/// an HTTP client for remote content.
#[derive(Debug, Clone)]
pub struct FacadeContext {
    pub filesystem: Arc<Filesystem>,
    pub actor: Actor,
    pub http: reqwest::Client,
}

impl FacadeContext {
    pub fn new(filesystem: Arc<Filesystem>, actor: Actor) -> Self {
        Self {
            filesystem,
            actor,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

type Registry = FactoryRegistry<FacetKind, Facet, FacadeContext>;

lazy_static! {
    static ref REGISTRY: Arc<Registry> = Arc::new(registry());
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .add_factory(FacetKind::Node, FacetKind::Uid, node_from_uid)
        .add_factory(FacetKind::Node, FacetKind::Path, node_from_path)
        .add_factory(FacetKind::StorageLocator, FacetKind::Node, locator_from_node)
        .add_factory(FacetKind::Stream, FacetKind::Node, stream_from_node)
        .add_factory(FacetKind::Stream, FacetKind::WebUrl, stream_from_web_url)
        .add_factory(FacetKind::Stream, FacetKind::DataUrl, stream_from_data_url)
        .add_factory(FacetKind::Buffer, FacetKind::Stream, buffer_from_stream);
    registry
}

fn unexpected(expected: FacetKind) -> BoxError {
    format!("expected a {} representation", expected).into()
}

async fn node_from_uid(ctx: FacadeContext, facet: Facet) -> Result<Option<Facet>, BoxError> {
    let Facet::Uid(uid) = facet else {
        return Err(unexpected(FacetKind::Uid));
    };
    let subject = ctx.filesystem.node(NodeLocator::Uid(uid));
    Ok(Some(Facet::Node(Arc::new(subject))))
}

async fn node_from_path(ctx: FacadeContext, facet: Facet) -> Result<Option<Facet>, BoxError> {
    let Facet::Path(path) = facet else {
        return Err(unexpected(FacetKind::Path));
    };
    let subject = ctx.filesystem.node(NodeLocator::Path(path));
    Ok(Some(Facet::Node(Arc::new(subject))))
}

/// Best effort: any failure means there is no locator to offer.
async fn locator_from_node(ctx: FacadeContext, facet: Facet) -> Result<Option<Facet>, BoxError> {
    let Facet::Node(subject) = facet else {
        return Err(unexpected(FacetKind::Node));
    };
    let entry = match subject.fetch_entry().await {
        Ok(Some(entry)) => entry,
        Ok(None) => return Ok(None),
        Err(e) => {
            debug!(error = %e, "node lookup failed, no storage locator");
            return Ok(None);
        }
    };
    let gate = ctx.filesystem.gate();
    if let Err(e) = gate.authorize(&ctx.actor, &subject, &Capability::READ).await {
        debug!(error = %e, "storage locator withheld");
        return Ok(None);
    }
    match ctx.filesystem.backend().storage_locator(entry).await {
        Ok(locator) => Ok(locator.map(Facet::StorageLocator)),
        Err(e) => {
            debug!(error = %e, "storage locator lookup failed");
            Ok(None)
        }
    }
}

async fn stream_from_node(ctx: FacadeContext, facet: Facet) -> Result<Option<Facet>, BoxError> {
    let Facet::Node(subject) = facet else {
        return Err(unexpected(FacetKind::Node));
    };
    // a node the actor may not see reads exactly like a missing one
    match ctx.filesystem.read(&ctx.actor, &subject).await {
        Ok(stream) => Ok(Some(Facet::Stream(stream))),
        Err(Error::SubjectNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn stream_from_web_url(ctx: FacadeContext, facet: Facet) -> Result<Option<Facet>, BoxError> {
    let Facet::WebUrl(url) = facet else {
        return Err(unexpected(FacetKind::WebUrl));
    };
    debug!(url = %url, "fetching remote content");
    let response = ctx.http.get(url).send().await?.error_for_status()?;
    let chunks = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(io::Error::other));
    Ok(Some(Facet::Stream(ByteStream::new(chunks))))
}

async fn stream_from_data_url(
    _ctx: FacadeContext,
    facet: Facet,
) -> Result<Option<Facet>, BoxError> {
    let Facet::DataUrl(data_url) = facet else {
        return Err(unexpected(FacetKind::DataUrl));
    };
    let (_, payload) = data_url
        .split_once(',')
        .ok_or("data url has no payload")?;
    let bytes = BASE64_STANDARD.decode(payload.trim())?;
    Ok(Some(Facet::Stream(ByteStream::from_bytes(bytes))))
}

async fn buffer_from_stream(
    _ctx: FacadeContext,
    facet: Facet,
) -> Result<Option<Facet>, BoxError> {
    let Facet::Stream(stream) = facet else {
        return Err(unexpected(FacetKind::Stream));
    };
    Ok(Some(Facet::Buffer(stream.collect().await?)))
}

/// Several representations of one file, derived from each other on demand.
///
/// Seed whatever is known with [`set`](Self::set) and ask for what is
/// needed; derived representations are cached for the life of the facade
/// and concurrent requests share one derivation, so asking for the buffer
/// twice opens the file once.
///
/// Derivations:
///
/// | target | source |
/// |---|---|
/// | fs-node | uid, path |
/// | s3-info | fs-node (needs `read`; absent on any failure) |
/// | stream | fs-node (read as the actor), web_url, data_url |
/// | buffer | stream |
#[derive(Debug)]
pub struct FileFacade {
    resolver: ValueResolver<FacetKind, Facet, FacadeContext>,
}

impl FileFacade {
    pub fn new(context: FacadeContext) -> Self {
        Self {
            resolver: ValueResolver::new(REGISTRY.clone(), context),
        }
    }

    /// `(target, source)` pairs of every registered derivation.
    pub fn derivations() -> Vec<(FacetKind, FacetKind)> {
        REGISTRY.edges().collect()
    }

    pub fn set(&self, facet: Facet) {
        self.resolver.set(facet.kind(), facet);
    }

    pub fn is_resolved(&self, kind: FacetKind) -> bool {
        self.resolver.is_resolved(kind)
    }

    /// Get a representation, deriving it if needed.
    ///
    /// A derivation refused by the permission gate fails with the gate's
    /// own error rather than a resolution failure.
    pub async fn get(&self, kind: FacetKind) -> Result<Facet, Error> {
        self.resolver.get(kind).await.map_err(surface_denial)
    }

    pub async fn node(&self) -> Result<Arc<Subject>, Error> {
        match self.get(FacetKind::Node).await? {
            Facet::Node(subject) => Ok(subject),
            other => Err(mismatch(FacetKind::Node, &other)),
        }
    }

    pub async fn storage_locator(&self) -> Result<StorageLocator, Error> {
        match self.get(FacetKind::StorageLocator).await? {
            Facet::StorageLocator(locator) => Ok(locator),
            other => Err(mismatch(FacetKind::StorageLocator, &other)),
        }
    }

    /// The content as a stream.
    ///
    /// Content read from a node is buffered first, so every call gets a
    /// fresh stream and [`buffer`](Self::buffer) keeps working. A remote or
    /// `data:` stream is handed out as is and can only be taken once;
    /// after that `buffer` fails unless it was resolved earlier.
    pub async fn stream(&self) -> Result<ByteStream, Error> {
        if self.resolver.is_resolved(FacetKind::Buffer) || self.streams_from_node() {
            return Ok(ByteStream::from_bytes(self.buffer().await?));
        }
        match self.get(FacetKind::Stream).await? {
            Facet::Stream(stream) => Ok(stream),
            other => Err(mismatch(FacetKind::Stream, &other)),
        }
    }

    fn streams_from_node(&self) -> bool {
        !self.resolver.is_resolved(FacetKind::Stream)
            && self
                .resolver
                .plan_chain(FacetKind::Stream)
                .and_then(|chain| chain.last().copied())
                == Some((FacetKind::Stream, FacetKind::Node))
    }

    pub async fn buffer(&self) -> Result<Bytes, Error> {
        match self.get(FacetKind::Buffer).await? {
            Facet::Buffer(buffer) => Ok(buffer),
            other => Err(mismatch(FacetKind::Buffer, &other)),
        }
    }
}

fn surface_denial(error: ResolveError<FacetKind>) -> Error {
    if let ResolveError::Factory { cause, .. } = &error {
        if let Some(denial @ (Error::PermissionDenied { .. } | Error::Forbidden)) =
            cause.downcast_ref::<Error>()
        {
            return denial.clone();
        }
    }
    Error::Resolve(error)
}

fn mismatch(expected: FacetKind, got: &Facet) -> Error {
    Error::backend(format!(
        "resolved {} holds a {} representation",
        expected,
        got.kind()
    ))
}
