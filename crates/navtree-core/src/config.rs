//! Navigator model configuration.

/// How events reach listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventDelivery {
    /// Listeners run synchronously inside the mutating call.
    #[default]
    Direct,
    /// Events are buffered and delivered by
    /// [`NavigatorModel::dispatch_events`](crate::NavigatorModel::dispatch_events).
    Queued,
}

/// Configuration for a [`NavigatorModel`](crate::NavigatorModel).
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    /// Separator placed between segments by `path_name`.
    pub path_separator: String,
    /// Whether objects reporting `is_system()` are materialized.
    pub show_system_objects: bool,
    /// Event delivery mode.
    pub event_delivery: EventDelivery,
    /// Whether overwriting an identity registry entry is logged.
    pub warn_on_duplicate_registration: bool,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            path_separator: ".".to_string(),
            show_system_objects: true,
            event_delivery: EventDelivery::Direct,
            warn_on_duplicate_registration: true,
        }
    }
}

impl NavigatorConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> NavigatorConfigBuilder {
        NavigatorConfigBuilder::new()
    }
}

/// Builder for [`NavigatorConfig`].
#[derive(Debug, Default)]
pub struct NavigatorConfigBuilder {
    config: NavigatorConfig,
}

impl NavigatorConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the path separator.
    pub fn path_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.path_separator = separator.into();
        self
    }

    /// Show or hide system objects.
    pub fn show_system_objects(mut self, show: bool) -> Self {
        self.config.show_system_objects = show;
        self
    }

    /// Set the event delivery mode.
    pub fn event_delivery(mut self, delivery: EventDelivery) -> Self {
        self.config.event_delivery = delivery;
        self
    }

    /// Enable or disable the duplicate registration warning.
    pub fn warn_on_duplicate_registration(mut self, warn: bool) -> Self {
        self.config.warn_on_duplicate_registration = warn;
        self
    }

    /// Finish building.
    pub fn build(self) -> NavigatorConfig {
        self.config
    }
}
