use log::warn;

/// How a component's bytes are initialized when no value is supplied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InitStrategy {
    /// Fill with zero bytes. Components not registered as zeroable fall back to their default
    /// constructor.
    Zero,
    /// Run the component's default constructor.
    #[default]
    DefaultConstructor,
}

/// Tunables of an [`Entities`](super::Entities) store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bytes per storage chunk.
    pub chunk_size: usize,

    /// Initialization used by `create_entity` and `add_component`.
    pub init_strategy: InitStrategy,

    /// Record created and deleted entities until the next `flush_lifecycle`.
    pub track_lifecycle: bool,

    /// Free chunks kept for reuse.
    pub pool_limit: usize,
}

impl Config {
    /// Default bytes per chunk.
    pub const DEFAULT_CHUNK_SIZE: usize = 4096;

    /// Smallest accepted chunk size.
    pub const MIN_CHUNK_SIZE: usize = 64;

    /// Default number of pooled free chunks.
    pub const DEFAULT_POOL_LIMIT: usize = 64;

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the default initialization strategy.
    pub fn with_init_strategy(mut self, init_strategy: InitStrategy) -> Self {
        self.init_strategy = init_strategy;
        self
    }

    /// Enable or disable lifecycle tracking.
    pub fn with_lifecycle_tracking(mut self, track_lifecycle: bool) -> Self {
        self.track_lifecycle = track_lifecycle;
        self
    }

    /// Set the number of free chunks kept for reuse.
    pub fn with_pool_limit(mut self, pool_limit: usize) -> Self {
        self.pool_limit = pool_limit;
        self
    }

    /// Clamp out-of-range values.
    pub(crate) fn normalized(mut self) -> Self {
        if self.chunk_size < Self::MIN_CHUNK_SIZE {
            warn!(
                "chunk size {} below minimum, using {}",
                self.chunk_size,
                Self::MIN_CHUNK_SIZE
            );
            self.chunk_size = Self::MIN_CHUNK_SIZE;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            init_strategy: InitStrategy::default(),
            track_lifecycle: true,
            pool_limit: Self::DEFAULT_POOL_LIMIT,
        }
    }
}
