//! Tool Dispatcher use case.
//!
//! Executes the tool calls attached to one assistant entry, strictly in
//! declaration order. Each call sees the Context Store writes of the calls
//! dispatched before it. Tool failures become tool-result content, never
//! session errors.

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use atelier_domain::util::preview;
use atelier_domain::{
    AgentName, AgentRegistry, AgentTool, ContextStore, RoutingDirective, ToolCallRequest,
    ToolCallResult, ToolError, ToolInvocation,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a single dispatched call.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// What goes into the tool-result entry
    pub result: ToolCallResult,
    /// Directive returned by the tool, already merged into the store
    pub directive: Option<RoutingDirective>,
}

impl DispatchOutcome {
    fn failed(call: &ToolCallRequest, error: &ToolError) -> Self {
        Self {
            result: ToolCallResult::failure(call, format!("Error: {}", error)),
            directive: None,
        }
    }
}

/// Resolution of every call on one entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolResolution {
    /// Results in declaration order
    pub results: Vec<ToolCallResult>,
    /// First next-agent named by a directive, in declaration order
    pub next_agent: Option<AgentName>,
}

/// Executes tool calls against an [`AgentRegistry`].
pub struct ToolDispatcher {
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl Clone for ToolDispatcher {
    fn clone(&self) -> Self {
        Self {
            conversation_logger: self.conversation_logger.clone(),
        }
    }
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self {
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    /// Dispatch every call of one entry, in order.
    pub async fn dispatch_all(
        &self,
        registry: &AgentRegistry,
        caller: &AgentName,
        calls: &[ToolCallRequest],
        store: &mut ContextStore,
    ) -> ToolResolution {
        let mut resolution = ToolResolution::default();
        for call in calls {
            let outcome = self.dispatch(registry, caller, call, store).await;
            if resolution.next_agent.is_none()
                && let Some(next) = outcome.directive.and_then(|d| d.next_agent)
            {
                resolution.next_agent = Some(next);
            }
            resolution.results.push(outcome.result);
        }
        resolution
    }

    /// Execute exactly one tool call.
    ///
    /// The callee is looked up in `caller`'s tool table, or in the union of
    /// all tables when `caller` is the tool-executor identity. Directive
    /// deltas are merged into `store` only after the tool returned `Ok`.
    pub async fn dispatch(
        &self,
        registry: &AgentRegistry,
        caller: &AgentName,
        call: &ToolCallRequest,
        store: &mut ContextStore,
    ) -> DispatchOutcome {
        let Some(tool) = lookup(registry, caller, &call.tool_name) else {
            let error = ToolError::not_found(format!("tool '{}'", call.tool_name))
                .with_details(format!("caller: {}", caller));
            warn!("Tool '{}' not available to {}", call.tool_name, caller);
            let outcome = DispatchOutcome::failed(call, &error);
            self.log_dispatch(caller, call, &outcome);
            return outcome;
        };

        debug!("Dispatching tool '{}' for {}", call.tool_name, caller);

        let result = {
            let shared = tool.definition().wants_shared_state.then_some(&*store);
            tool.invoke(ToolInvocation::new(call, shared)).await
        };

        let outcome = match result {
            Ok(output) => {
                let directive = output.directive().cloned();
                if let Some(directive) = &directive {
                    store.merge(&directive.context_updates);
                }
                DispatchOutcome {
                    result: ToolCallResult::success(call, output.content()),
                    directive,
                }
            }
            Err(error) => {
                warn!("Tool '{}' failed: {}", call.tool_name, error);
                DispatchOutcome::failed(call, &error)
            }
        };

        self.log_dispatch(caller, call, &outcome);
        outcome
    }

    fn log_dispatch(&self, caller: &AgentName, call: &ToolCallRequest, outcome: &DispatchOutcome) {
        let directive = outcome.directive.as_ref();
        self.conversation_logger.log(ConversationEvent::new(
            "tool_dispatched",
            json!({
                "caller": caller.as_str(),
                "tool": call.tool_name,
                "call_id": call.id,
                "is_error": outcome.result.is_error,
                "next_agent": directive.and_then(|d| d.next_agent.as_ref()).map(|a| a.as_str()),
                "updated_keys": directive
                    .map(|d| d.context_updates.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default(),
                "content": preview(&outcome.result.content, 200),
            }),
        ));
    }
}

fn lookup<'r>(
    registry: &'r AgentRegistry,
    caller: &AgentName,
    tool_name: &str,
) -> Option<&'r Arc<dyn AgentTool>> {
    if caller.is_tool_executor() {
        registry.find_tool(tool_name)
    } else {
        registry.get(caller.as_str()).and_then(|agent| agent.tool(tool_name))
    }
}
