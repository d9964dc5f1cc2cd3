//! Agent Registry: named agents with declared input/output contracts
//!
//! Agents are registered into a [`RegistryBuilder`] at startup. [`RegistryBuilder::build`]
//! validates every agent (an agent without an output contract is fatal) and
//! returns an immutable [`AgentRegistry`] that is shared behind an `Arc` for
//! the life of the process.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::contracts::Contract;
use crate::error::{SupportError, SupportResult};

/// JSON Schema of a contract record, as handed to reasoning engines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractSchema {
    /// Record name (e.g. `TriageResult`).
    pub name: String,
    /// Declared top-level fields.
    pub fields: Vec<String>,
    /// Full JSON Schema document.
    pub schema: Value,
}

impl ContractSchema {
    pub fn of<T: Contract>() -> Self {
        let root = schemars::schema_for!(T);
        Self {
            name: T::NAME.to_string(),
            fields: T::FIELDS.iter().map(|f| f.to_string()).collect(),
            schema: serde_json::to_value(&root).unwrap_or_default(),
        }
    }
}

/// Another agent exposed to this one as a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolBinding {
    /// Name the tool is invoked by.
    pub tool_name: String,
    pub description: String,
    /// Registered agent that backs the tool.
    pub agent: String,
}

/// Agent definition prior to validation.
#[derive(Debug, Clone, Default)]
pub struct AgentSpec {
    pub instructions: String,
    pub input_contract: Option<ContractSchema>,
    pub output_contract: Option<ContractSchema>,
    pub tools: Vec<ToolBinding>,
    /// The agent must call a tool before answering.
    pub tool_required: bool,
}

impl AgentSpec {
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Self::default()
        }
    }

    pub fn input<T: Contract>(mut self) -> Self {
        self.input_contract = Some(ContractSchema::of::<T>());
        self
    }

    pub fn output<T: Contract>(mut self) -> Self {
        self.output_contract = Some(ContractSchema::of::<T>());
        self
    }

    pub fn tool(
        mut self,
        tool_name: impl Into<String>,
        description: impl Into<String>,
        agent: impl Into<String>,
    ) -> Self {
        self.tools.push(ToolBinding {
            tool_name: tool_name.into(),
            description: description.into(),
            agent: agent.into(),
        });
        self
    }

    pub fn require_tool(mut self) -> Self {
        self.tool_required = true;
        self
    }
}

/// Check that an agent declares an output contract.
pub fn validate(name: &str, spec: &AgentSpec) -> SupportResult<()> {
    if spec.output_contract.is_none() {
        return Err(SupportError::MissingContract {
            agent: name.to_string(),
        });
    }
    Ok(())
}

/// A validated, registered agent.
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    name: String,
    instructions: String,
    input_contract: Option<ContractSchema>,
    output_contract: ContractSchema,
    tools: Vec<ToolBinding>,
    tool_required: bool,
}

impl Agent {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn input_contract(&self) -> Option<&ContractSchema> {
        self.input_contract.as_ref()
    }

    pub fn output_contract(&self) -> &ContractSchema {
        &self.output_contract
    }

    pub fn tools(&self) -> &[ToolBinding] {
        &self.tools
    }

    pub fn tool_required(&self) -> bool {
        self.tool_required
    }
}

/// Startup-phase registry. Consumed by [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    specs: BTreeMap<String, AgentSpec>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent under `name`. Names are unique.
    pub fn register(&mut self, name: impl Into<String>, spec: AgentSpec) -> SupportResult<&mut Self> {
        let name = name.into();
        if self.specs.contains_key(&name) {
            return Err(SupportError::DuplicateAgent { name });
        }
        self.specs.insert(name, spec);
        Ok(self)
    }

    /// Validate every agent and freeze the registry.
    ///
    /// Fails on the first agent (in name order) without an output contract,
    /// or whose tools reference an unregistered agent.
    pub fn build(self) -> SupportResult<Arc<AgentRegistry>> {
        for (name, spec) in &self.specs {
            validate(name, spec)?;
            if let Some(tool) = spec.tools.iter().find(|t| !self.specs.contains_key(&t.agent)) {
                return Err(SupportError::UnknownAgent {
                    name: tool.agent.clone(),
                });
            }
        }

        let agents = self
            .specs
            .into_iter()
            .filter_map(|(name, spec)| {
                let output_contract = spec.output_contract?;
                let agent = Agent {
                    name: name.clone(),
                    instructions: spec.instructions,
                    input_contract: spec.input_contract,
                    output_contract,
                    tools: spec.tools,
                    tool_required: spec.tool_required,
                };
                Some((name, Arc::new(agent)))
            })
            .collect::<BTreeMap<_, _>>();

        tracing::info!(agents = agents.len(), "Agent registry built");
        Ok(Arc::new(AgentRegistry { agents }))
    }
}

/// Immutable name → agent lookup.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<Agent>>,
}

impl AgentRegistry {
    /// Look up an agent by name.
    pub fn resolve(&self, name: &str) -> SupportResult<Arc<Agent>> {
        self.agents
            .get(name)
            .cloned()
            .ok_or_else(|| SupportError::UnknownAgent {
                name: name.to_string(),
            })
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.agents.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.agents.values()
    }
}
