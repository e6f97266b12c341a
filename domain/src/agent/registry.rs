//! Agent Registry - an arena of descriptors indexed by name.
//!
//! Agents refer to each other only by [`AgentName`]; there are no object
//! references between descriptors. Nested helper agents are registered like
//! any other agent, with a single after-work edge back to their parent.

use super::descriptor::AgentDescriptor;
use super::handoff::{AfterWork, HandOffRule};
use super::value_objects::{AgentName, TOOL_EXECUTOR};
use crate::core::error::ConfigurationError;
use crate::tool::traits::AgentTool;
use std::collections::HashMap;
use std::sync::Arc;

/// Participants of one session topology.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
    index: HashMap<AgentName, usize>,
    helper_counts: HashMap<AgentName, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent, rejecting malformed, reserved or duplicate names.
    pub fn register(&mut self, agent: AgentDescriptor) -> Result<(), ConfigurationError> {
        let name = agent.name().clone();
        if !name.is_well_formed() || name.is_tool_executor() {
            return Err(ConfigurationError::InvalidAgentName(name.to_string()));
        }
        if self.index.contains_key(&name) {
            return Err(ConfigurationError::DuplicateAgent(name.to_string()));
        }
        if let Some(tool) = agent.duplicate_tool() {
            return Err(ConfigurationError::DuplicateTool {
                agent: name.to_string(),
                tool: tool.to_string(),
            });
        }
        if agent.is_human()
            && let Some(existing) = self.human()
        {
            return Err(ConfigurationError::MultipleHumans {
                first: existing.name().to_string(),
                second: name.to_string(),
            });
        }

        self.index.insert(name, self.agents.len());
        self.agents.push(agent);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_agent(mut self, agent: AgentDescriptor) -> Result<Self, ConfigurationError> {
        self.register(agent)?;
        Ok(self)
    }

    /// Append a hand-off rule to an already registered agent.
    pub fn register_hand_off(
        &mut self,
        agent: &str,
        rule: HandOffRule,
    ) -> Result<(), ConfigurationError> {
        let slot = self
            .index
            .get(agent)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownAgent(agent.to_string()))?;
        self.agents[slot].push_hand_off(rule);
        Ok(())
    }

    /// Register `helper` as a nested helper of `parent`.
    ///
    /// The helper is renamed `nested_{parent}_{n}`, its hand-offs are
    /// replaced by a single after-work transfer back to the parent, and the
    /// parent gains a conditional rule pointing at the helper.
    pub fn attach_helper(
        &mut self,
        parent: &str,
        helper: AgentDescriptor,
        condition: impl Into<String>,
    ) -> Result<AgentName, ConfigurationError> {
        let parent_name = self
            .get(parent)
            .map(|p| p.name().clone())
            .ok_or_else(|| ConfigurationError::UnknownAgent(parent.to_string()))?;

        let count = self.helper_counts.entry(parent_name.clone()).or_default();
        *count += 1;
        let helper_name = AgentName::new(format!("nested_{}_{}", parent_name, count));

        let helper = helper
            .renamed(helper_name.clone())
            .replace_hand_offs(vec![HandOffRule::after_work(AfterWork::Agent(
                parent_name.clone(),
            ))]);
        self.register(helper)?;
        self.register_hand_off(
            parent_name.as_str(),
            HandOffRule::on_condition(helper_name.clone(), condition),
        )?;
        Ok(helper_name)
    }

    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.index.get(name).map(|&slot| &self.agents[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Agents in registration order.
    pub fn agents(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.iter()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The human participant, if one is registered.
    pub fn human(&self) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.is_human())
    }

    /// Look up a tool across every agent, in registration order.
    ///
    /// This is the tool table of the tool-executor identity. When two agents
    /// declare the same tool name the earlier registration wins.
    pub fn find_tool(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.agents.iter().find_map(|agent| agent.tool(name))
    }

    /// Check that the topology can run, starting from `initial`.
    ///
    /// Every hand-off target must be registered and the initial agent must
    /// exist. Violations are reported here, never mid-session.
    pub fn validate(&self, initial: &str) -> Result<(), ConfigurationError> {
        if self.agents.is_empty() {
            return Err(ConfigurationError::EmptyRegistry);
        }
        if initial == TOOL_EXECUTOR || !self.contains(initial) {
            return Err(ConfigurationError::UnknownInitialAgent(initial.to_string()));
        }
        for agent in &self.agents {
            for target in agent.hand_offs().iter().filter_map(HandOffRule::target) {
                if !self.contains(target.as_str()) {
                    return Err(ConfigurationError::UnknownHandOffTarget {
                        agent: agent.name().to_string(),
                        target: target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
