use crate::classifier::{
    AlwaysTerminal, Classification, FaultClassifier, FnClassifier, KindClassifier,
};
use crate::events::ConnectionEvent;
use crate::policy::ReconnectPolicy;
use self_healing_core::{EventListeners, FaultKind, FaultTagged, FnListener};
use std::sync::Arc;
use std::time::Duration;

/// Default capacity of the fault event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Configuration for a self-healing connection.
///
/// `E` is the error type of the wrapped client.
pub struct SelfHealingConfig<E> {
    /// Name used in events, logs and metrics.
    pub(crate) name: Arc<str>,

    /// The reconnection policy determining backoff strategy.
    pub(crate) policy: ReconnectPolicy,

    /// Maximum number of attempts per reconnect cycle.
    /// None means unlimited attempts.
    pub(crate) max_attempts: Option<u32>,

    /// Decides which errors are terminal connection faults.
    pub(crate) classifier: Arc<dyn FaultClassifier<E>>,

    /// Capacity of the fault event broadcast channel.
    pub(crate) event_capacity: usize,

    /// Lifecycle event listeners.
    pub(crate) event_listeners: EventListeners<ConnectionEvent>,
}

impl<E> Clone for SelfHealingConfig<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            policy: self.policy.clone(),
            max_attempts: self.max_attempts,
            classifier: self.classifier.clone(),
            event_capacity: self.event_capacity,
            event_listeners: self.event_listeners.clone(),
        }
    }
}

impl<E> std::fmt::Debug for SelfHealingConfig<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfHealingConfig")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("max_attempts", &self.max_attempts)
            .field("event_capacity", &self.event_capacity)
            .field("event_listeners", &self.event_listeners.len())
            .finish_non_exhaustive()
    }
}

impl<E: FaultTagged + 'static> SelfHealingConfig<E> {
    /// Creates a new builder for configuring a self-healing connection.
    ///
    /// Errors are classified by their [`FaultKind`] with
    /// [`KindClassifier::default`]: closed or reset transports, expired
    /// authentication, protocol corruption and unclassified errors are
    /// terminal; business-level errors and timeouts are passed through.
    pub fn builder() -> SelfHealingConfigBuilder<E> {
        crate::describe_metrics();
        SelfHealingConfigBuilder::new()
    }
}

impl<E> SelfHealingConfig<E> {
    /// Creates a builder for an error type without a [`FaultTagged`]
    /// implementation.
    ///
    /// Such errors carry no category, so every error counts as terminal
    /// until a classifier is set with
    /// [`classifier`](SelfHealingConfigBuilder::classifier) or
    /// [`classify_with`](SelfHealingConfigBuilder::classify_with).
    pub fn builder_untagged() -> SelfHealingConfigBuilder<E> {
        crate::describe_metrics();
        SelfHealingConfigBuilder::with_classifier(Arc::new(AlwaysTerminal))
    }

    /// Returns the connection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the reconnection policy.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Returns the maximum number of attempts per reconnect cycle.
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns the capacity of the fault event channel.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Classifies an error with the configured classifier.
    pub fn classify(&self, error: &E) -> Classification {
        self.classifier.classify(error)
    }
}

impl<E: FaultTagged + 'static> Default for SelfHealingConfig<E> {
    fn default() -> Self {
        SelfHealingConfigBuilder::new().build()
    }
}

/// Builder for constructing a [`SelfHealingConfig`].
pub struct SelfHealingConfigBuilder<E> {
    name: Arc<str>,
    policy: ReconnectPolicy,
    max_attempts: Option<u32>,
    classifier: Arc<dyn FaultClassifier<E>>,
    event_capacity: usize,
    event_listeners: EventListeners<ConnectionEvent>,
}

impl<E> std::fmt::Debug for SelfHealingConfigBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfHealingConfigBuilder")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("max_attempts", &self.max_attempts)
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

impl<E: FaultTagged + 'static> Default for SelfHealingConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: FaultTagged + 'static> SelfHealingConfigBuilder<E> {
    /// Creates a new builder with default settings.
    ///
    /// Defaults:
    /// - name: `"<unnamed>"`
    /// - policy: exponential backoff from 100ms to 30s
    /// - max_attempts: unlimited
    /// - classifier: [`KindClassifier::default`]
    /// - event_capacity: 64
    pub fn new() -> Self {
        Self::with_classifier(Arc::new(KindClassifier::default()))
    }
}

impl<E> SelfHealingConfigBuilder<E> {
    fn with_classifier(classifier: Arc<dyn FaultClassifier<E>>) -> Self {
        Self {
            name: Arc::from("<unnamed>"),
            policy: ReconnectPolicy::default(),
            max_attempts: None,
            classifier,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name for this connection (used in events, logs and metrics).
    pub fn name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Arc::from(name.as_ref());
        self
    }

    /// Sets the reconnection policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use self_healing_connection::{ReconnectPolicy, SelfHealingConfig};
    ///
    /// let config = SelfHealingConfig::<std::io::Error>::builder()
    ///     .policy(ReconnectPolicy::exponential(
    ///         Duration::from_millis(100),
    ///         Duration::from_secs(10),
    ///     ))
    ///     .build();
    /// ```
    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bounds the number of attempts in one reconnect cycle.
    ///
    /// When the bound is reached the cycle is abandoned and the next terminal
    /// fault starts a new one.
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Keeps reconnecting until an attempt succeeds (the default).
    pub fn unlimited_attempts(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Sets the fault classifier.
    pub fn classifier<C>(mut self, classifier: C) -> Self
    where
        C: FaultClassifier<E> + 'static,
    {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Classifies errors with a closure.
    ///
    /// # Examples
    ///
    /// ```
    /// use self_healing_connection::{Classification, SelfHealingConfig};
    /// use self_healing_core::FaultKind;
    ///
    /// let config = SelfHealingConfig::<String>::builder_untagged()
    ///     .classify_with(|error: &String| {
    ///         if error.contains("closed") {
    ///             Classification::Terminal(FaultKind::TransportClosed)
    ///         } else {
    ///             Classification::NonTerminal(FaultKind::Operation)
    ///         }
    ///     })
    ///     .build();
    ///
    /// assert!(config.classify(&"socket closed".to_string()).is_terminal());
    /// ```
    pub fn classify_with<F>(self, f: F) -> Self
    where
        F: Fn(&E) -> Classification + Send + Sync + 'static,
    {
        self.classifier(FnClassifier::new(f))
    }

    /// Sets the capacity of the fault event channel. Subscribers falling
    /// further behind than this lose the oldest events.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Registers a callback invoked when a forwarded operation reports a
    /// terminal fault.
    ///
    /// The callback receives the operation name, the generation the
    /// operation ran against, and the fault kind.
    pub fn on_fault_reported<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str, u64, FaultKind) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ConnectionEvent| {
            if let ConnectionEvent::FaultReported {
                operation,
                generation,
                kind,
                ..
            } = event
            {
                f(*operation, *generation, *kind);
            }
        }));
        self
    }

    /// Registers a callback invoked before each reconnect attempt.
    ///
    /// The callback receives the attempt number, starting at 1.
    pub fn on_reconnect_attempt<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ConnectionEvent| {
            if let ConnectionEvent::ReconnectAttempt { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a callback invoked when a reconnect attempt fails.
    ///
    /// The callback receives the attempt number and the delay before the
    /// next attempt.
    pub fn on_reconnect_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ConnectionEvent| {
            if let ConnectionEvent::ReconnectFailed { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when a new connection is installed.
    ///
    /// The callback receives the new generation.
    pub fn on_reconnected<F>(mut self, f: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ConnectionEvent| {
            if let ConnectionEvent::Reconnected { generation, .. } = event {
                f(*generation);
            }
        }));
        self
    }

    /// Registers a callback invoked when a reconnect cycle gives up after
    /// `max_attempts`.
    pub fn on_reconnect_abandoned<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &ConnectionEvent| {
            if let ConnectionEvent::ReconnectAbandoned { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Builds the `SelfHealingConfig`.
    pub fn build(self) -> SelfHealingConfig<E> {
        SelfHealingConfig {
            name: self.name,
            policy: self.policy,
            max_attempts: self.max_attempts,
            classifier: self.classifier,
            event_capacity: self.event_capacity,
            event_listeners: self.event_listeners,
        }
    }
}

impl<E: FaultTagged + 'static> SelfHealingConfigBuilder<E> {
    /// Classifies errors by their [`FaultKind`] using the default terminal
    /// set (closed, reset, authentication, protocol corruption, unclassified).
    ///
    /// This is what [`SelfHealingConfig::builder`] starts with; calling it
    /// restores that classifier after another one was set.
    ///
    /// # Examples
    ///
    /// ```
    /// use self_healing_connection::{AlwaysTerminal, SelfHealingConfig};
    /// use std::io::{Error, ErrorKind};
    ///
    /// let config = SelfHealingConfig::<Error>::builder()
    ///     .classifier(AlwaysTerminal)
    ///     .classify_by_kind()
    ///     .build();
    ///
    /// assert!(config.classify(&Error::new(ErrorKind::ConnectionReset, "reset")).is_terminal());
    /// assert!(!config.classify(&Error::new(ErrorKind::NotFound, "missing")).is_terminal());
    /// ```
    pub fn classify_by_kind(self) -> Self {
        self.classifier(KindClassifier::default())
    }

    /// Classifies errors by their [`FaultKind`], treating exactly the given
    /// kinds as terminal.
    pub fn terminal_kinds<I>(self, kinds: I) -> Self
    where
        I: IntoIterator<Item = FaultKind>,
    {
        self.classifier(KindClassifier::new(kinds))
    }
}
