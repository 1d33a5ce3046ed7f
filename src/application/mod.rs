pub mod bot;
pub mod broadcast;
pub mod scheduler;

pub use bot::{BotService, Action, render_rates, run_polling};
pub use broadcast::{BroadcastDispatcher, BroadcastError, BroadcastReport, DEFAULT_SEND_DELAY};
pub use scheduler::{settle, BroadcastScheduler, DailySchedule};
