use anyhow::Result;
use once_cell::sync::OnceCell;

type Loader<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// A model handle that loads its weights on first use, exactly once.
///
/// Concurrent first callers block on the same initialisation; a failed load
/// leaves the cell empty so a later call retries.
pub struct LazyModel<T> {
    label: &'static str,
    cell: OnceCell<T>,
    loader: Loader<T>,
}

impl<T> LazyModel<T> {
    pub fn new(label: &'static str, loader: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Self { label, cell: OnceCell::new(), loader: Box::new(loader) }
    }

    pub fn get(&self) -> Result<&T> {
        self.cell.get_or_try_init(|| {
            tracing::info!(model = self.label, "Loading model");
            let loaded = (self.loader)();
            match &loaded {
                Ok(_) => tracing::info!(model = self.label, "Model loaded"),
                Err(e) => tracing::error!(model = self.label, error = %e, "Model load failed"),
            }
            loaded
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}
