//! Configuration for the coalesce layer.

/// Configuration for the coalesce layer.
#[derive(Debug, Clone)]
pub struct CoalesceConfig<F> {
    /// Derives the deduplication key from a request.
    pub(crate) key_extractor: F,
    pub(crate) name: String,
}

impl<F> CoalesceConfig<F> {
    pub fn new(key_extractor: F) -> Self {
        Self {
            key_extractor,
            name: "<unnamed>".to_string(),
        }
    }

    pub fn builder(key_extractor: F) -> CoalesceConfigBuilder<F> {
        CoalesceConfigBuilder::new(key_extractor)
    }
}

/// Builder for [`CoalesceConfig`].
#[derive(Debug, Clone)]
pub struct CoalesceConfigBuilder<F> {
    key_extractor: F,
    name: String,
}

impl<F> CoalesceConfigBuilder<F> {
    pub fn new(key_extractor: F) -> Self {
        Self {
            key_extractor,
            name: "<unnamed>".to_string(),
        }
    }

    /// Set a name for this instance (for metrics/tracing).
    ///
    /// # Example
    ///
    /// ```rust
    /// use billy_coalesce::CoalesceConfig;
    ///
    /// let config = CoalesceConfig::builder(|req: &String| req.clone())
    ///     .name("billy-dedup")
    ///     .build();
    /// ```
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> CoalesceConfig<F> {
        CoalesceConfig {
            key_extractor: self.key_extractor,
            name: self.name,
        }
    }
}
