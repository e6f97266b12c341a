//! Tool traits - the seam between the dispatcher and tool implementations
//!
//! Tools never write the Context Store directly. They read it through the
//! injected reference (when [`ToolDefinition::wants_shared_state`] is set)
//! and express writes as [`RoutingDirective`](super::value_objects::RoutingDirective)
//! deltas, which the dispatcher merges after the call completes. A tool that
//! fails therefore cannot leave a partial write behind.

use super::entities::{ToolCallRequest, ToolDefinition};
use super::value_objects::{ToolError, ToolOutput};
use crate::context::ContextStore;
use async_trait::async_trait;

/// Arguments handed to a tool for one call.
#[derive(Debug, Clone, Copy)]
pub struct ToolInvocation<'a> {
    /// The request being served
    pub call: &'a ToolCallRequest,
    /// Shared state, present only for tools that declared they want it
    pub shared: Option<&'a ContextStore>,
}

impl<'a> ToolInvocation<'a> {
    pub fn new(call: &'a ToolCallRequest, shared: Option<&'a ContextStore>) -> Self {
        Self { call, shared }
    }

    /// The injected Context Store, or an error for tools that forgot to declare it.
    pub fn require_shared(&self) -> Result<&'a ContextStore, ToolError> {
        self.shared.ok_or_else(|| {
            ToolError::execution_failed(format!(
                "Tool '{}' needs shared state but did not declare it",
                self.call.tool_name
            ))
        })
    }
}

/// A callable tool registered on an agent.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Static description of the tool.
    fn definition(&self) -> &ToolDefinition;

    /// Run the tool.
    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError>;
}

/// Adapter turning a synchronous closure into an [`AgentTool`].
pub struct FnTool<F> {
    definition: ToolDefinition,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(ToolInvocation<'_>) -> Result<ToolOutput, ToolError> + Send + Sync,
{
    pub fn new(definition: ToolDefinition, func: F) -> Self {
        Self { definition, func }
    }
}

#[async_trait]
impl<F> AgentTool for FnTool<F>
where
    F: Fn(ToolInvocation<'_>) -> Result<ToolOutput, ToolError> + Send + Sync,
{
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, invocation: ToolInvocation<'_>) -> Result<ToolOutput, ToolError> {
        (self.func)(invocation)
    }
}
