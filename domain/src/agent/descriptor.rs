//! Static description of one conversation participant.

use super::handoff::{FallbackPolicy, HandOffRule};
use super::value_objects::{AgentKind, AgentName};
use crate::context::ContextStore;
use crate::tool::entities::ToolDefinition;
use crate::tool::traits::AgentTool;
use std::sync::Arc;

/// A participant: its name, tools, hand-off rules and fallback policy.
///
/// Descriptors are plain values. Everything about an agent's social or
/// emotional state lives in [`PersonaState`](super::persona::PersonaState),
/// keyed by the same name and passed around explicitly where needed.
///
/// Tools keep their declaration order; the hand-off list is evaluated top to
/// bottom.
#[derive(Clone)]
pub struct AgentDescriptor {
    name: AgentName,
    kind: AgentKind,
    description: String,
    instructions: String,
    tools: Vec<Arc<dyn AgentTool>>,
    hand_offs: Vec<HandOffRule>,
    fallback: Option<FallbackPolicy>,
}

impl AgentDescriptor {
    fn with_kind(name: impl Into<AgentName>, kind: AgentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            instructions: String::new(),
            tools: Vec::new(),
            hand_offs: Vec::new(),
            fallback: None,
        }
    }

    /// An agent driven by the reasoning collaborator.
    pub fn synthetic(name: impl Into<AgentName>) -> Self {
        Self::with_kind(name, AgentKind::Synthetic)
    }

    /// A human participant; the session suspends when it gets the floor.
    pub fn human(name: impl Into<AgentName>) -> Self {
        Self::with_kind(name, AgentKind::Human)
    }

    // ==================== Builder Methods ====================

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// System instructions. `{key}` placeholders are filled from the
    /// Context Store before every reply.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_tool(mut self, tool: impl AgentTool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Register a tool that is shared with other agents.
    pub fn with_shared_tool(mut self, tool: Arc<dyn AgentTool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_hand_off(mut self, rule: HandOffRule) -> Self {
        self.hand_offs.push(rule);
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Append a hand-off rule after construction (before the session starts).
    pub fn push_hand_off(&mut self, rule: HandOffRule) {
        self.hand_offs.push(rule);
    }

    // ==================== Accessors ====================

    pub fn name(&self) -> &AgentName {
        &self.name
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn is_human(&self) -> bool {
        self.kind == AgentKind::Human
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Instructions with placeholders filled from `store`.
    pub fn render_instructions(&self, store: &ContextStore) -> String {
        store.render_template(&self.instructions)
    }

    pub fn tools(&self) -> &[Arc<dyn AgentTool>] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.definition().name == name)
    }

    pub fn tool_definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|t| t.definition())
    }

    pub fn hand_offs(&self) -> &[HandOffRule] {
        &self.hand_offs
    }

    pub fn fallback(&self) -> Option<&FallbackPolicy> {
        self.fallback.as_ref()
    }

    pub(crate) fn renamed(mut self, name: AgentName) -> Self {
        self.name = name;
        self
    }

    pub(crate) fn replace_hand_offs(mut self, rules: Vec<HandOffRule>) -> Self {
        self.hand_offs = rules;
        self
    }

    /// Name of the first tool declared twice, if any.
    pub(crate) fn duplicate_tool(&self) -> Option<&str> {
        self.tools.iter().enumerate().find_map(|(i, tool)| {
            let name = tool.definition().name.as_str();
            self.tools[..i]
                .iter()
                .any(|earlier| earlier.definition().name == name)
                .then_some(name)
        })
    }
}

impl std::fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field(
                "tools",
                &self
                    .tool_definitions()
                    .map(|d| d.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("hand_offs", &self.hand_offs)
            .field("fallback", &self.fallback)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::handoff::AfterWork;
    use crate::tool::traits::{FnTool, ToolInvocation};
    use crate::tool::value_objects::ToolOutput;
    use serde_json::json;

    fn echo_tool(name: &str) -> Arc<dyn AgentTool> {
        Arc::new(FnTool::new(
            ToolDefinition::new(name, "echo"),
            |_inv: ToolInvocation<'_>| Ok(ToolOutput::value("echo")),
        ))
    }

    #[test]
    fn test_builder() {
        let agent = AgentDescriptor::synthetic("filter")
            .with_description("Screens messages")
            .with_shared_tool(echo_tool("scan"))
            .with_hand_off(HandOffRule::on_condition("closer", "not hacking"))
            .with_fallback(FallbackPolicy::Terminate);

        assert_eq!(agent.name(), "filter");
        assert!(!agent.is_human());
        assert!(agent.tool("scan").is_some());
        assert!(agent.tool("missing").is_none());
        assert_eq!(agent.hand_offs().len(), 1);
        assert!(matches!(agent.fallback(), Some(FallbackPolicy::Terminate)));
    }

    #[test]
    fn test_push_hand_off_appends_in_order() {
        let mut agent = AgentDescriptor::synthetic("closer");
        agent.push_hand_off(HandOffRule::on_condition("emotion_estimator", "continues"));
        agent.push_hand_off(HandOffRule::after_work(AfterWork::Terminate));

        assert_eq!(agent.hand_offs()[0].target(), Some(&AgentName::new("emotion_estimator")));
        assert_eq!(agent.hand_offs()[1].target(), None);
    }

    #[test]
    fn test_render_instructions() {
        let agent = AgentDescriptor::synthetic("negotiator")
            .with_instructions("Never sell below {bottom_price}.");
        let store = ContextStore::from_pairs([("bottom_price", json!(1000))]);
        assert_eq!(agent.render_instructions(&store), "Never sell below 1000.");
    }

    #[test]
    fn test_duplicate_tool_detection() {
        let agent = AgentDescriptor::synthetic("a")
            .with_shared_tool(echo_tool("one"))
            .with_shared_tool(echo_tool("two"))
            .with_shared_tool(echo_tool("one"));
        assert_eq!(agent.duplicate_tool(), Some("one"));

        let human = AgentDescriptor::human("buyer");
        assert!(human.is_human());
        assert_eq!(human.duplicate_tool(), None);
    }
}
