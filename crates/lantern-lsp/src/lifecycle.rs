//! LSP lifecycle handlers and the state they share.
//!
//! The server answers `initialize`, `textDocument/completion` and
//! `shutdown`, and reacts to the `initialized` and `exit` notifications.
//! Everything else falls through to the dispatcher's method-not-found path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lantern_rpc::{ExitSignal, HandlerError, HandlerRegistry, RegistryError, RequestId};
use lsp_types::{
    ClientInfo, CompletionItem, CompletionList, CompletionOptions, CompletionParams,
    CompletionResponse, InitializeResult, ServerCapabilities, ServerInfo,
};
use serde::Deserialize;
use serde_json::Value;

/// Tracing target for lifecycle events.
pub(crate) const LIFECYCLE_TARGET: &str = "lantern_lsp::lifecycle";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "lantern-lsp";

/// Labels of the completion items offered at every position.
pub const SAMPLE_COMPLETIONS: [&str; 2] = ["a sample completion item", "another sample completion item"];

/// Method names handled by [`register`].
pub mod methods {
    /// Handshake request.
    pub const INITIALIZE: &str = "initialize";
    /// Handshake acknowledgement notification.
    pub const INITIALIZED: &str = "initialized";
    /// Completion request.
    pub const COMPLETION: &str = "textDocument/completion";
    /// Shutdown request.
    pub const SHUTDOWN: &str = "shutdown";
    /// Exit notification.
    pub const EXIT: &str = "exit";
}

/// Progress of the LSP handshake, shared between handlers.
#[derive(Debug, Default)]
pub struct Lifecycle {
    initialized: AtomicBool,
    shutdown_requested: AtomicBool,
    exit_signal: ExitSignal,
}

impl Lifecycle {
    /// Creates a lifecycle in its pre-`initialize` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once `initialize` has been answered.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Returns `true` once `shutdown` has been answered.
    #[must_use]
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Signal raised by the `exit` notification.
    #[must_use]
    pub fn exit_signal(&self) -> ExitSignal {
        self.exit_signal.clone()
    }

    /// Returns `true` once `exit` has been received.
    #[must_use]
    pub fn exit_requested(&self) -> bool {
        self.exit_signal.is_raised()
    }

    pub(crate) fn mark_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    fn ensure_running(&self, method: &str) -> Result<(), HandlerError> {
        if self.shutdown_requested() {
            return Err(HandlerError::invalid_request(format!(
                "'{method}' received after shutdown"
            )));
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), HandlerError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(HandlerError::NotInitialized)
        }
    }
}

/// The subset of `InitializeParams` the server reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeHints {
    client_info: Option<ClientInfo>,
}

/// Registers every lifecycle handler with `registry`.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateMethod`] if any of the methods is
/// already registered.
pub fn register(
    registry: &mut HandlerRegistry,
    lifecycle: &Arc<Lifecycle>,
) -> Result<(), RegistryError> {
    let state = Arc::clone(lifecycle);
    registry.register_typed(
        methods::INITIALIZE,
        move |_, hints: Option<InitializeHints>| {
            state.ensure_running(methods::INITIALIZE)?;
            Ok(initialize(&state, hints.unwrap_or_default()))
        },
    )?;

    registry.register(methods::INITIALIZED, |_, _| {
        tracing::debug!(target: LIFECYCLE_TARGET, "client acknowledged initialisation");
        Ok(Value::Null)
    })?;

    let state = Arc::clone(lifecycle);
    registry.register_typed(
        methods::COMPLETION,
        move |_, params: Option<CompletionParams>| {
            state.ensure_running(methods::COMPLETION)?;
            state.ensure_initialized()?;
            Ok(complete(params.as_ref()))
        },
    )?;

    let state = Arc::clone(lifecycle);
    registry.register(methods::SHUTDOWN, move |id, _| {
        shutdown(&state, id);
        Ok(Value::Null)
    })?;

    let state = Arc::clone(lifecycle);
    registry.register(methods::EXIT, move |_, _| {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            after_shutdown = state.shutdown_requested(),
            "exit requested"
        );
        state.exit_signal.raise();
        Ok(Value::Null)
    })
}

fn initialize(lifecycle: &Lifecycle, hints: InitializeHints) -> InitializeResult {
    match hints.client_info {
        Some(client) => tracing::info!(
            target: LIFECYCLE_TARGET,
            client = %client.name,
            client_version = client.version.as_deref(),
            "initialising"
        ),
        None => tracing::info!(target: LIFECYCLE_TARGET, "initialising"),
    }
    lifecycle.initialized.store(true, Ordering::SeqCst);
    server_info()
}

/// Capabilities and identity reported to every `initialize` request.
#[must_use]
pub fn server_info() -> InitializeResult {
    InitializeResult {
        capabilities: ServerCapabilities {
            completion_provider: Some(CompletionOptions::default()),
            ..ServerCapabilities::default()
        },
        server_info: Some(ServerInfo {
            name: SERVER_NAME.to_owned(),
            version: Some(env!("CARGO_PKG_VERSION").to_owned()),
        }),
    }
}

fn complete(params: Option<&CompletionParams>) -> CompletionResponse {
    if let Some(position) = params.map(|p| &p.text_document_position) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            uri = %position.text_document.uri.as_str(),
            line = position.position.line,
            character = position.position.character,
            "completion requested"
        );
    }
    CompletionResponse::List(CompletionList {
        is_incomplete: false,
        items: SAMPLE_COMPLETIONS
            .iter()
            .map(|label| CompletionItem {
                label: (*label).to_owned(),
                ..CompletionItem::default()
            })
            .collect(),
    })
}

fn shutdown(lifecycle: &Lifecycle, id: Option<&RequestId>) {
    lifecycle.mark_shutdown();
    tracing::info!(
        target: LIFECYCLE_TARGET,
        id = id.map(tracing::field::display),
        "shutdown requested"
    );
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    struct Handlers {
        registry: HandlerRegistry,
        lifecycle: Arc<Lifecycle>,
    }

    impl Handlers {
        fn call(&self, method: &str, params: Value) -> Result<Value, HandlerError> {
            let handler = self.registry.get(method).expect("handler registered");
            handler(Some(&RequestId::Number(1)), params)
        }
    }

    #[fixture]
    fn handlers() -> Handlers {
        let lifecycle = Arc::new(Lifecycle::new());
        let mut registry = HandlerRegistry::new();
        register(&mut registry, &lifecycle).expect("register lifecycle handlers");
        Handlers {
            registry,
            lifecycle,
        }
    }

    fn completion_params() -> Value {
        json!({
            "textDocument": {"uri": "file:///tmp/main.rs"},
            "position": {"line": 3, "character": 7}
        })
    }

    #[rstest]
    fn registers_all_methods(handlers: Handlers) {
        assert_eq!(
            handlers.registry.methods(),
            vec![
                "exit",
                "initialize",
                "initialized",
                "shutdown",
                "textDocument/completion"
            ]
        );
    }

    #[rstest]
    fn rejects_double_registration(handlers: Handlers) {
        let mut registry = handlers.registry;
        let result = register(&mut registry, &handlers.lifecycle);
        assert!(matches!(result, Err(RegistryError::DuplicateMethod { .. })));
    }

    #[rstest]
    #[case(Value::Null)]
    #[case(json!({"processId": null, "capabilities": {}, "clientInfo": {"name": "eglot"}}))]
    #[case(json!({"capabilities": {}}))]
    fn initialize_advertises_completion(handlers: Handlers, #[case] params: Value) {
        let result = handlers
            .call(methods::INITIALIZE, params)
            .expect("initialize succeeds");

        assert_eq!(result["capabilities"], json!({"completionProvider": {}}));
        assert_eq!(result["serverInfo"]["name"], json!(SERVER_NAME));
        assert_eq!(
            result["serverInfo"]["version"],
            json!(env!("CARGO_PKG_VERSION"))
        );
        assert!(handlers.lifecycle.is_initialized());
    }

    #[rstest]
    fn repeated_initialize_is_identical(handlers: Handlers) {
        let first = handlers.call(methods::INITIALIZE, Value::Null).expect("first");
        let second = handlers.call(methods::INITIALIZE, Value::Null).expect("second");

        assert_eq!(first, second);
    }

    #[rstest]
    fn completion_requires_initialize(handlers: Handlers) {
        let result = handlers.call(methods::COMPLETION, completion_params());

        assert_eq!(result, Err(HandlerError::NotInitialized));
    }

    #[rstest]
    #[case(completion_params())]
    #[case(Value::Null)]
    fn completion_offers_sample_items(handlers: Handlers, #[case] params: Value) {
        handlers.call(methods::INITIALIZE, Value::Null).expect("initialize");

        let result = handlers
            .call(methods::COMPLETION, params)
            .expect("completion succeeds");

        assert_eq!(
            result,
            json!({
                "isIncomplete": false,
                "items": [
                    {"label": "a sample completion item"},
                    {"label": "another sample completion item"}
                ]
            })
        );
    }

    #[rstest]
    fn malformed_completion_params_are_invalid(handlers: Handlers) {
        handlers.call(methods::INITIALIZE, Value::Null).expect("initialize");

        let result = handlers.call(methods::COMPLETION, json!({"position": "top"}));

        assert!(matches!(result, Err(HandlerError::InvalidParams { .. })));
    }

    #[rstest]
    fn shutdown_blocks_further_requests(handlers: Handlers) {
        handlers.call(methods::INITIALIZE, Value::Null).expect("initialize");

        let reply = handlers.call(methods::SHUTDOWN, Value::Null).expect("shutdown");

        assert_eq!(reply, Value::Null);
        assert!(handlers.lifecycle.shutdown_requested());
        assert!(matches!(
            handlers.call(methods::COMPLETION, completion_params()),
            Err(HandlerError::InvalidRequest { .. })
        ));
        assert!(matches!(
            handlers.call(methods::INITIALIZE, Value::Null),
            Err(HandlerError::InvalidRequest { .. })
        ));
    }

    #[rstest]
    fn exit_raises_signal(handlers: Handlers) {
        let signal = handlers.lifecycle.exit_signal();

        handlers.call(methods::EXIT, Value::Null).expect("exit");

        assert!(signal.is_raised());
        assert!(handlers.lifecycle.exit_requested());
    }
}
