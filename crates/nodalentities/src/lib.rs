//! Standard entity library
//!
//! Collection of built-in entities for common operations

mod debug;
mod logic;
mod loops;
mod telegram;
mod time;

pub use debug::{debug_entity, LogMethod};
pub use logic::{logic_entity, IfMethod, Operand, Operator};
pub use loops::{loop_entity, ForeachMethod};
pub use telegram::{
    message_from_update, telegram_entity, GetMessagesMethod, SendMessageMethod, TelegramClient,
    TelegramConfig, DEFAULT_TELEGRAM_API,
};
pub use time::{time_entity, DelayMethod};

use nodalcore::Entity;

/// All standard entities, ready to hand to a runner
pub fn standard_entities(telegram: TelegramConfig) -> Vec<Entity> {
    vec![
        debug_entity(),
        logic_entity(),
        loop_entity(),
        telegram_entity(telegram),
        time_entity(),
    ]
}
