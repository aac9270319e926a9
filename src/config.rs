/// Default number of compiled expressions kept by an engine.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Settings of one [`UnifiedEngine`](crate::UnifiedEngine).
///
/// `lenient` and `silent` are forwarded to the expression engine verbatim. The
/// template layer additionally honours `silent` by logging failed evaluations
/// and substituting null instead of returning an error.
///
/// ```
/// use unilate::EngineConfig;
///
/// let config = EngineConfig::new().with_cache_capacity(128).silent(true);
/// assert_eq!(config.cache_capacity, 128);
/// assert!(config.silent);
/// assert!(!config.lenient);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    /// Maximum number of cached compiled expressions; 0 disables caching.
    pub cache_capacity: usize,
    /// Undefined names and null operands evaluate quietly instead of failing.
    pub lenient: bool,
    /// Evaluation failures are logged and yield null instead of an error.
    pub silent: bool,
}

impl EngineConfig {
    pub const fn new() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            lenient: false,
            silent: false,
        }
    }

    #[must_use]
    pub const fn with_cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    #[must_use]
    pub const fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    #[must_use]
    pub const fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
