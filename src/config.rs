//! Router configuration.

/// Tunables for a [`crate::Router`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Longest accepted subscription path.
    pub max_path_depth: usize,
    /// Catch panics raised by traverser stages and subscribers and report them
    /// in the publish result. When false, a panic unwinds into the publisher.
    pub isolate_panics: bool,
    /// Buffer size for channel subscriptions created without an explicit
    /// capacity.
    pub stream_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_path_depth: 64,
            isolate_panics: true,
            stream_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_isolate_failures() {
        let cfg = RouterConfig::default();
        assert!(cfg.isolate_panics);
        assert_eq!(cfg.max_path_depth, 64);
        assert_eq!(cfg.stream_capacity, 1024);
    }
}
