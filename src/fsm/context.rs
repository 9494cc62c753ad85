//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard state handlers read from and write to:
//! the timing configuration, a snapshot of whether the radio stack is up,
//! the connection timer, and the command list the dispatch will return.

use log::warn;

use crate::app::commands::{Command, CommandList};
use crate::config::{SystemConfig, TickRates};
use crate::fsm::DeviceMode;

pub struct FsmContext {
    // -- Configuration --
    pub config: SystemConfig,

    // -- Inputs (refreshed by the service before each dispatch) --
    /// Whether the radio stack is currently up.
    pub radio_active: bool,

    // -- Connection timer --
    /// Milliseconds accumulated in the current connected session.
    pub connection_elapsed_ms: u32,
    /// Set once the timeout has fired for this session.
    pub disconnect_requested: bool,

    // -- Outputs --
    pub commands: CommandList,
}

impl FsmContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            radio_active: false,
            connection_elapsed_ms: 0,
            disconnect_requested: false,
            commands: CommandList::new(),
        }
    }

    /// Queue a command for the service to execute.
    pub fn emit(&mut self, cmd: Command) {
        if self.commands.push(cmd).is_err() {
            warn!("FSM: command list full, dropping {:?}", cmd);
        }
    }

    /// Tick rates configured for `mode`.
    pub fn rates(&self, mode: DeviceMode) -> TickRates {
        match mode {
            DeviceMode::Sensing => self.config.sensing,
            DeviceMode::Advertising => self.config.advertising,
            DeviceMode::Connected => self.config.connected,
        }
    }

    pub fn reset_connection_timer(&mut self) {
        self.connection_elapsed_ms = 0;
        self.disconnect_requested = false;
    }

    pub(crate) fn take_commands(&mut self) -> CommandList {
        core::mem::take(&mut self.commands)
    }
}
