//! The agent that turns one user request into tool calls and a grounded answer.

use std::fmt;

use itertools::Itertools;
use nonempty::NonEmpty;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::{Client, ClientError};
use crate::mcp::{ConnectionError, Connector};
use crate::model::{ChatHistory, Conversation, Message, ToolCallRequest, Usage};
use crate::policy::GroundingPolicy;
use crate::status::{Silent, Status, StatusSink};
use crate::tools::{ResultFlag, ResultRule, ToolError, ToolRegistry, ToolService};

/// States of a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Connecting,
    Discovering,
    Planning,
    ExecutingTools,
    Synthesizing,
    Done,
    Aborted,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::Connecting => "CONNECTING",
            TurnState::Discovering => "DISCOVERING",
            TurnState::Planning => "PLANNING",
            TurnState::ExecutingTools => "EXECUTING_TOOLS",
            TurnState::Synthesizing => "SYNTHESIZING",
            TurnState::Done => "DONE",
            TurnState::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}

/// Why a turn was aborted.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Tool discovery failed: {0}")]
    Discovery(#[source] ToolError),

    #[error("Tool {name} failed: {source}")]
    ToolInvocation {
        name: String,
        #[source]
        source: ToolError,
    },

    #[error(transparent)]
    Model(#[from] ClientError),
}

/// A tool call that was resolved and executed during the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCall {
    pub call_id: String,
    pub name: String,
    pub flag: ResultFlag,
}

/// Outcome of a completed turn.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Content of the final assistant message.
    pub answer: String,
    pub conversation: Conversation,
    pub executed: Vec<ExecutedCall>,
    /// Tool names requested by the model that were not registered.
    pub skipped: Vec<String>,
    pub states: Vec<TurnState>,
    pub usage: Usage,
}

/// Knobs that do not change the shape of a turn.
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    pub result_rule: ResultRule,
    /// Also report unknown tool names on the status channel.
    pub warn_unresolved_tools: bool,
}

/// Agent that plans with the model, runs the chosen tools once, and asks the
/// model for a final answer.
///
/// Every turn opens a fresh session with the tool provider:
/// 1. Connects and discovers the available tools
/// 2. Sends the grounding policy, the request and the tool catalog to the model
/// 3. Executes the requested tool calls in the order they were issued
/// 4. Sends the tool results back for one final synthesis
///
/// There is no second round of tool calls. Tool calls in the final response
/// are logged and ignored.
///
/// # Example
/// ```ignore
/// let client = Groq::create(api_key, Groq::DEFAULT_MODEL.to_string());
/// let agent = Agent::new(client, HttpConnector::new(server_url));
///
/// let mut history = ChatHistory::new();
/// let answer = agent.respond(&mut history, "Weekend in Lisbon from Paris").await;
/// ```
pub struct Agent<C: Client> {
    client: C,
    connector: Box<dyn Connector>,
    policy: GroundingPolicy,
    status: Box<dyn StatusSink>,
    options: AgentOptions,
}

impl<C: Client> Agent<C> {
    pub fn new<K: Connector + 'static>(client: C, connector: K) -> Self {
        Self {
            client,
            connector: Box::new(connector),
            policy: GroundingPolicy::default(),
            status: Box::new(Silent),
            options: AgentOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: GroundingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_status<S: StatusSink + 'static>(mut self, status: S) -> Self {
        self.status = Box::new(status);
        self
    }

    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn policy(&self) -> &GroundingPolicy {
        &self.policy
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one turn and record the result in `history`.
    ///
    /// Failures never escape: they are reported on the status channel and
    /// `None` is returned, leaving only the user's message in the history.
    pub async fn respond(&self, history: &mut ChatHistory, query: &str) -> Option<String> {
        history.push_user(query);

        match self.run_turn(query).await {
            Ok(turn) => {
                self.status.clear();
                if turn.answer.is_empty() {
                    warn!("Model returned an empty final answer");
                    return None;
                }
                history.push_assistant(turn.answer.clone());
                Some(turn.answer)
            }
            Err(e) => {
                self.status.update(Status::error(format!("Error: {}", e)));
                None
            }
        }
    }

    /// Run one turn: connect, discover, plan, execute, synthesize.
    ///
    /// The session is closed before this returns, whatever the outcome.
    pub async fn run_turn(&self, query: &str) -> Result<Turn, TurnError> {
        let span = info_span!("turn", id = %Uuid::new_v4());
        async move {
            let mut states = Vec::new();
            let result = self.connect_and_drive(query, &mut states).await;
            match result {
                Ok(mut turn) => {
                    self.enter(&mut states, TurnState::Done);
                    turn.states = states;
                    Ok(turn)
                }
                Err(e) => {
                    if let Some(state) = states.last() {
                        warn!(%state, "Turn aborted: {}", e);
                    }
                    self.enter(&mut states, TurnState::Aborted);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn connect_and_drive(
        &self,
        query: &str,
        states: &mut Vec<TurnState>,
    ) -> Result<Turn, TurnError> {
        self.enter(states, TurnState::Connecting);
        self.status.update(Status::info("Connecting to server..."));
        let session = self.connector.connect().await?;

        let outcome = self.drive(session.service(), query, states).await;
        session.close().await;
        outcome
    }

    async fn drive(
        &self,
        service: &dyn ToolService,
        query: &str,
        states: &mut Vec<TurnState>,
    ) -> Result<Turn, TurnError> {
        self.enter(states, TurnState::Discovering);
        self.status.update(Status::info("Connected! Discovering tools..."));
        let registry = ToolRegistry::discover(service)
            .await
            .map_err(TurnError::Discovery)?;
        let catalog = registry.specs();

        self.enter(states, TurnState::Planning);
        self.status.update(Status::info(format!(
            "Found {} tools. Thinking...",
            registry.len()
        )));

        let mut conversation = Conversation::new();
        conversation.push(Message::System(self.policy.text().to_string()));
        conversation.push(Message::User(query.to_string()));

        let plan = self
            .client
            .request(conversation.messages().to_vec(), catalog.clone())
            .await?;
        let mut usage = plan.usage.unwrap_or_default();
        let requested = plan.message.tool_calls().to_vec();
        conversation.push(plan.message);

        if registry.is_empty() && !requested.is_empty() {
            warn!(
                "Model requested {} tool calls but no tools are registered",
                requested.len()
            );
        }

        let mut executed = Vec::new();
        let mut skipped = Vec::new();
        let pending = if registry.is_empty() { Vec::new() } else { requested };

        if let Some(calls) = NonEmpty::from_vec(pending) {
            self.enter(states, TurnState::ExecutingTools);
            self.status.update(Status::info(format!(
                "Decided to call {} tools...",
                calls.len()
            )));
            info!("Planned tool calls: {}", calls.iter().map(|c| &c.name).join(", "));

            for call in calls {
                match registry.get(&call.name) {
                    Some(handle) => {
                        info!("Tool call requested: {}", call.name);
                        debug!("Tool arguments: {}", call.arguments);
                        self.status.tool_call(&call.name, &call.arguments);

                        let result = handle.invoke(&call.arguments).await.map_err(|source| {
                            TurnError::ToolInvocation {
                                name: call.name.clone(),
                                source,
                            }
                        })?;
                        debug!("Tool result: {}", result.content);

                        let flag = self.options.result_rule.classify(&result);
                        self.report_flag(&call, flag);

                        conversation.push_tool_result(&call, result.content);
                        executed.push(ExecutedCall {
                            call_id: call.id,
                            name: call.name,
                            flag,
                        });
                    }
                    None => {
                        // No tool result is appended for an unknown name.
                        warn!("Model requested unknown tool {}, skipping", call.name);
                        if self.options.warn_unresolved_tools {
                            self.status
                                .update(Status::info(format!("Skipped unknown tool {}", call.name)));
                        }
                        skipped.push(call.name);
                    }
                }
            }
        }

        self.enter(states, TurnState::Synthesizing);
        self.status
            .update(Status::info("Generating final itinerary..."));
        let synthesis = self
            .client
            .request(conversation.messages().to_vec(), catalog)
            .await?;
        if let Some(u) = synthesis.usage {
            usage = usage + u;
        }

        let extra_calls = synthesis.message.tool_calls().len();
        if extra_calls > 0 {
            warn!(
                "Final response requested {} more tool calls, ignoring them",
                extra_calls
            );
        }
        let answer = synthesis.message.content().unwrap_or_default().to_string();
        conversation.push(synthesis.message);

        Ok(Turn {
            answer,
            conversation,
            executed,
            skipped,
            states: Vec::new(),
            usage,
        })
    }

    fn report_flag(&self, call: &ToolCallRequest, flag: ResultFlag) {
        match flag {
            ResultFlag::Data => {}
            ResultFlag::Empty => {
                info!("Tool {} returned no data", call.name);
                self.status
                    .update(Status::info(format!("{} returned no results", call.name)));
            }
            ResultFlag::Error => {
                info!("Tool {} returned an error payload", call.name);
                self.status
                    .update(Status::info(format!("{} reported an error", call.name)));
            }
        }
    }

    fn enter(&self, states: &mut Vec<TurnState>, state: TurnState) {
        debug!("Entering {}", state);
        states.push(state);
    }
}
