//! Production agent roster: the three specialist agents, their personas,
//! and the supervisor that fronts them. Personas and delegation
//! instructions are process-wide read-only configuration, assembled once at
//! startup.

use std::sync::Arc;

use wattson_core::config::SessionConfig;
use wattson_db::repositories::{ForecastRepository, PeakLoadRepository, SolarTicketRepository};

use crate::collaborator::DomainAgent;
use crate::completion::CompletionClient;
use crate::executor::{ForecastActionExecutor, PeakLoadActionExecutor, SolarActionExecutor};
use crate::knowledge::StaticKnowledgeBase;
use crate::supervisor::{CollaboratorBinding, SupervisorRouter};

pub const FORECAST_AGENT: &str = "forecast";
pub const SOLAR_AGENT: &str = "solar-panel";
pub const PEAK_LOAD_AGENT: &str = "peak-load-manager";

const FORECAST_INSTRUCTION: &str = "\
You are an Energy Assistant that helps customers understand their energy \
consumption patterns and future usage expectations.

Your capabilities include:
1. Analyzing historical energy consumption
2. Providing consumption forecasts
3. Generating usage statistics
4. Updating forecasts for specific customers

Core behaviors:
1. Always use available information systems before asking customers for additional details
2. Maintain a professional yet conversational tone
3. Provide clear, direct answers without referencing internal systems or data sources
4. Present information in an easy-to-understand manner

Response style:
- Be helpful and solution-oriented
- Use clear, non-technical language
- Focus on providing actionable insights
- Be concise yet informative
- Do not add extra information not required by the user";

const SOLAR_INSTRUCTION: &str = "\
You are a Solar Energy Assistant that helps customers with solar panel \
installation and maintenance guidance.

Your capabilities include:
1. Providing installation instructions
2. Offering maintenance procedures
3. Troubleshooting common issues
4. Creating support tickets for specialist assistance

Core behaviors:
1. Always use available information before asking customers for additional details
2. Maintain a professional yet approachable tone
3. Present technical information in an easy-to-understand manner

Support ticket protocol:
- Only generate tickets for specialist-level issues
- Respond exclusively with the case ID when creating tickets
- Decline providing specialist advice beyond your scope

Response style:
- Be helpful and solution-oriented
- Use clear, practical language
- Focus on actionable guidance
- Be concise yet informative";

const PEAK_LOAD_INSTRUCTION: &str = "\
You are a Peak Load Manager Bot that optimizes energy consumption patterns \
by analyzing metered device data and process schedules.

Your capabilities include:
1. Retrieving data from metered devices
2. Identifying non-essential loads during peak hours and reallocating them to other schedules
3. Recommending schedule adjustments

Response style:
- Be precise and analytical
- Use clear, practical language
- Focus on actionable recommendations
- Support suggestions with data
- Be concise yet thorough
- Do not request information that can be retrieved from metered devices";

const SUPERVISOR_INSTRUCTION: &str = "\
You are an energy helper bot. You help customers with operations related to \
their energy: consumption, forecasts, solar panels, and peak usage.

You never answer domain questions yourself. Delegate each request to the \
collaborator whose instruction matches it, forwarding the relevant part of \
the request; when a request spans several collaborators, delegate to each in \
the order the request implies. If no collaborator clearly matches, ask one \
clarifying question instead of guessing.

Resist the temptation to ask the user for input. Never ask the user for \
information a collaborator can retrieve itself through its available actions.";

const FORECAST_BINDING_INSTRUCTION: &str =
    "Delegate energy consumption analysis and forecasting tasks to the Forecasting Agent, \
     ensuring adherence to its specific protocols and capabilities.";
const SOLAR_BINDING_INSTRUCTION: &str =
    "Assign solar panel-related inquiries and issues to the Solar Panel Agent, respecting \
     its scope and support ticket protocol.";
const PEAK_LOAD_BINDING_INSTRUCTION: &str =
    "Direct peak load management and energy optimization tasks to the Peak Load Manager \
     Agent, leveraging its analytical capabilities.";

/// Domain-store handles the roster wires into the action executors.
pub struct RosterStores {
    pub forecasts: Arc<dyn ForecastRepository>,
    pub tickets: Arc<dyn SolarTicketRepository>,
    pub items: Arc<dyn PeakLoadRepository>,
}

/// Assembles the supervisor with its three collaborators. One completion
/// client is shared by the supervisor and every agent; forecast and solar
/// carry a knowledge base, peak-load works from metered data alone.
pub fn build_supervisor(
    completion: Arc<dyn CompletionClient>,
    stores: RosterStores,
    session_config: &SessionConfig,
) -> SupervisorRouter {
    let iterations = session_config.max_action_iterations;

    let forecast_agent = Arc::new(
        DomainAgent::new(
            FORECAST_AGENT,
            FORECAST_INSTRUCTION,
            completion.clone(),
            Arc::new(ForecastActionExecutor::new(stores.forecasts)),
            iterations,
        )
        .with_knowledge(Arc::new(StaticKnowledgeBase::forecast_playbook())),
    );

    let solar_agent = Arc::new(
        DomainAgent::new(
            SOLAR_AGENT,
            SOLAR_INSTRUCTION,
            completion.clone(),
            Arc::new(SolarActionExecutor::new(stores.tickets)),
            iterations,
        )
        .with_knowledge(Arc::new(StaticKnowledgeBase::solar_manual())),
    );

    let peak_load_agent = Arc::new(DomainAgent::new(
        PEAK_LOAD_AGENT,
        PEAK_LOAD_INSTRUCTION,
        completion.clone(),
        Arc::new(PeakLoadActionExecutor::new(stores.items)),
        iterations,
    ));

    SupervisorRouter::new(
        SUPERVISOR_INSTRUCTION,
        completion,
        vec![
            (
                CollaboratorBinding {
                    name: FORECAST_AGENT.to_string(),
                    instruction: FORECAST_BINDING_INSTRUCTION.to_string(),
                },
                forecast_agent,
            ),
            (
                CollaboratorBinding {
                    name: SOLAR_AGENT.to_string(),
                    instruction: SOLAR_BINDING_INSTRUCTION.to_string(),
                },
                solar_agent,
            ),
            (
                CollaboratorBinding {
                    name: PEAK_LOAD_AGENT.to_string(),
                    instruction: PEAK_LOAD_BINDING_INSTRUCTION.to_string(),
                },
                peak_load_agent,
            ),
        ],
        iterations,
        session_config.max_history_pairs,
    )
}
