// contains core functionality

mod analysis;
mod card;
mod card_processor;
mod competitor;
mod course;
mod editor;
mod errors;
mod event;
mod ports;
mod ranking;
mod receipt;
mod retime;
mod run;
mod scheduler;
mod stage;
pub mod timing;
pub mod utils;

pub use analysis::*;
pub use card::*;
pub use card_processor::*;
pub use competitor::*;
pub use course::*;
pub use editor::*;
pub use errors::*;
pub use event::*;
pub use ports::*;
pub use ranking::*;
pub use receipt::*;
pub use retime::*;
pub use run::*;
pub use scheduler::*;
pub use stage::*;

use std::sync::Arc;

/// Core of the race office. Provides:
/// - card readout processing with receipt printing
/// - single-day and multi-day rankings
/// - start-slot scheduling with a logged seed
/// - competitor registration and record editing
///
/// Core holds the connection to the store port; receipt sinks are handed in
/// per call because every readout acquires its own device.
pub struct Core {
    pub database: Arc<dyn DatabasePort>,
}

pub struct NoDB {}

pub struct DynDB(Arc<dyn DatabasePort>);

/// Builder forcing a database port before a Core can exist.
pub struct CoreBuilder<DB> {
    state_db: DB,
}

impl CoreBuilder<NoDB> {
    pub fn new() -> Self {
        CoreBuilder { state_db: NoDB {} }
    }

    pub fn set_db(self, database: Arc<dyn DatabasePort>) -> CoreBuilder<DynDB> {
        CoreBuilder {
            state_db: DynDB(database),
        }
    }
}

impl Default for CoreBuilder<NoDB> {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreBuilder<DynDB> {
    pub fn build(self) -> Core {
        Core {
            database: self.state_db.0,
        }
    }
}
