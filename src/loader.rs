//! Resolve template names to compiled templates.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cache::LruCache;
use crate::compile;
use crate::functions::{self, Function, FunctionArgs, FunctionReturn, Functions};
use crate::{Error, Result, Template, Value};

/// A function that reads the source of a template.
type ReadFn = dyn Fn(&Path) -> io::Result<String> + Send + Sync + 'static;

/// Loads, compiles and caches templates found under a root directory.
///
/// Compiled templates are cached by their normalized path. When the cache is
/// full the least recently used template is evicted. Templates that extend or
/// include other templates load them through the same loader and therefore
/// share its cache.
///
/// # Examples
///
/// ```no_run
/// let loader = flango::Loader::new("templates");
/// let result = loader.render("index.html", flango::value! { title: "Hello" })?;
/// # Ok::<(), flango::Error>(())
/// ```
pub struct Loader {
    root: PathBuf,
    autoescape: bool,
    functions: Arc<Functions>,
    reader: Arc<ReadFn>,
    cache: Mutex<LruCache<PathBuf, Arc<Template>>>,
}

/// A builder for a [`Loader`].
pub struct LoaderBuilder {
    root: PathBuf,
    capacity: usize,
    autoescape: bool,
    functions: Functions,
    reader: Option<Arc<ReadFn>>,
}

impl LoaderBuilder {
    /// The maximum number of compiled templates to keep, defaults to 128.
    ///
    /// A capacity of zero disables caching.
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Whether `{{ expr }}` output is HTML escaped, defaults to `false`.
    #[inline]
    pub fn autoescape(mut self, autoescape: bool) -> Self {
        self.autoescape = autoescape;
        self
    }

    /// Register a function that can be called from template expressions.
    ///
    /// Functions with the same name as a builtin shadow it. See the
    /// [`Function`] trait for the supported signatures.
    #[inline]
    pub fn function<F, R, A>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<R, A> + Send + Sync + 'static,
        R: FunctionReturn,
        A: FunctionArgs,
    {
        self.functions.insert(name.into(), functions::new(f));
        self
    }

    /// Set the function used to read template sources.
    ///
    /// The function is given the resolved path and should fail with
    /// [`io::ErrorKind::NotFound`] if there is no template there. The default
    /// reads from the filesystem.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io;
    ///
    /// let loader = flango::Loader::builder("/")
    ///     .reader(|path| match path.to_str() {
    ///         Some("/hello") => Ok(String::from("Hello {{ name }}!")),
    ///         _ => Err(io::ErrorKind::NotFound.into()),
    ///     })
    ///     .build();
    ///
    /// let result = loader.render("hello", flango::value! { name: "World" })?;
    /// assert_eq!(result, "Hello World!");
    /// # Ok::<(), flango::Error>(())
    /// ```
    #[inline]
    pub fn reader<F>(mut self, f: F) -> Self
    where
        F: Fn(&Path) -> io::Result<String> + Send + Sync + 'static,
    {
        self.reader = Some(Arc::new(f));
        self
    }

    /// Construct the loader.
    pub fn build(self) -> Loader {
        let reader = match self.reader {
            Some(reader) => reader,
            None => Arc::new(read_file),
        };
        Loader {
            root: self.root,
            autoescape: self.autoescape,
            functions: Arc::new(self.functions),
            reader,
            cache: Mutex::new(LruCache::new(self.capacity)),
        }
    }
}

impl Loader {
    /// Construct a loader for templates under `root` using the default
    /// settings.
    #[inline]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::builder(root).build()
    }

    /// Construct a builder for a loader for templates under `root`.
    #[inline]
    pub fn builder(root: impl Into<PathBuf>) -> LoaderBuilder {
        LoaderBuilder {
            root: root.into(),
            capacity: 128,
            autoescape: false,
            functions: Functions::new(),
            reader: None,
        }
    }

    /// Load the template with the given name, relative to the root.
    ///
    /// Returns the cached template if there is one, otherwise the template
    /// is read, compiled and added to the cache.
    pub fn load(&self, name: &str) -> Result<Arc<Template>> {
        self.load_nested(name, &mut Vec::new())
    }

    /// Load a template while the templates in `loading` are being compiled.
    pub(crate) fn load_nested(
        &self,
        name: &str,
        loading: &mut Vec<PathBuf>,
    ) -> Result<Arc<Template>> {
        let path = self.resolve(name);

        if let Some(template) = self.cache().get(&path) {
            tracing::debug!(path = %path.display(), "template cache hit");
            return Ok(template.clone());
        }
        tracing::debug!(path = %path.display(), "template cache miss");

        let source = (self.reader)(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::not_found(name),
            _ => Error::io(err, name),
        })?;

        loading.push(path.clone());
        let result = compile::template(self, &source, Some(name), loading);
        loading.pop();
        let template = Arc::new(result.map_err(|err| err.with_template_name(Some(name)))?);
        tracing::trace!(name, "compiled template");

        if let Some((evicted, _)) = self.cache().set(path.clone(), template.clone()) {
            if evicted != path {
                tracing::debug!(path = %evicted.display(), "evicted template from cache");
            }
        }
        Ok(template)
    }

    /// Compile a template from source.
    ///
    /// The template has no name and is not cached. It can still extend and
    /// include templates under the root.
    pub fn compile(&self, source: &str) -> Result<Template> {
        compile::template(self, source, None, &mut Vec::new())
    }

    /// Load and render the template with the given name.
    #[cfg(feature = "serde")]
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn render<S>(&self, name: &str, ctx: S) -> Result<String>
    where
        S: serde::Serialize,
    {
        self.load(name)?.render(ctx)
    }

    /// Load and render the template with the given name using a [`Value`].
    pub fn render_from(&self, name: &str, ctx: &Value) -> Result<String> {
        self.load(name)?.render_from(ctx)
    }

    /// The maximum number of cached templates.
    pub fn capacity(&self) -> usize {
        self.cache().capacity()
    }

    /// The number of cached templates.
    pub fn len(&self) -> usize {
        self.cache().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The directory template names are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `{{ expr }}` output is HTML escaped.
    pub fn autoescape(&self) -> bool {
        self.autoescape
    }

    pub(crate) fn functions(&self) -> &Arc<Functions> {
        &self.functions
    }

    /// Join the name onto the root and normalize the result.
    pub(crate) fn resolve(&self, name: &str) -> PathBuf {
        normalize(&self.root.join(name))
    }

    // The lock is only ever held for a single cache operation.
    fn cache(&self) -> MutexGuard<'_, LruCache<PathBuf, Arc<Template>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("root", &self.root)
            .field("autoescape", &self.autoescape)
            .field("functions", &self.functions.keys())
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for LoaderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderBuilder")
            .field("root", &self.root)
            .field("capacity", &self.capacity)
            .field("autoescape", &self.autoescape)
            .field("functions", &self.functions.keys())
            .finish_non_exhaustive()
    }
}

fn read_file(path: &Path) -> io::Result<String> {
    fs::read_to_string(path)
}

/// Removes `.` components and applies `..` components lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            component => out.push(component.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lexically() {
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(normalize(Path::new("../a/..")), PathBuf::from(".."));
        assert_eq!(normalize(Path::new("./a")), PathBuf::from("a"));
    }

    #[test]
    fn resolve_joins_root() {
        let loader = Loader::new("/templates");
        assert_eq!(
            loader.resolve("pages/../base.html"),
            PathBuf::from("/templates/base.html")
        );
        assert_eq!(
            loader.resolve("./base.html"),
            loader.resolve("base.html")
        );
    }

    #[test]
    fn builder_defaults() {
        let loader = Loader::new(".");
        assert_eq!(loader.capacity(), 128);
        assert!(!loader.autoescape());
        assert!(loader.is_empty());
    }
}
