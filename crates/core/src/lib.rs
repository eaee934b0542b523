pub mod actions;
pub mod config;
pub mod domain;
pub mod errors;

pub use actions::{
    ActionDeclaration, ActionGroup, ActionRequest, Decision, ParameterSpec, ParameterType,
};
pub use domain::customer::CustomerId;
pub use domain::forecast::{ForecastEntry, MonthKey};
pub use domain::peak_load::{ItemId, PeakLoadItem};
pub use domain::session::{ConversationSession, ConversationTurn, Speaker};
pub use domain::solar::{SolarTicket, TicketId, TicketStatus};
pub use errors::{ActionError, TurnError, LOOP_FALLBACK_REPLY};

pub use chrono;
