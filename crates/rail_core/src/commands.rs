use crate::switches::toggle_switch_state;
use crate::{Command, Pos, SimState};

/// Swaps a cell between `Safety` and its prior kind. Rejected under a train.
pub fn toggle_safety_tile(state: &mut SimState, pos: Pos) -> bool {
    !state.trains.is_occupied(pos)
        && state
            .grid
            .toggle_safety(pos, state.constants.safety_wait_ticks)
}

/// Applies one host command between ticks. Returns `false` when the command
/// was rejected and left the state untouched.
pub fn apply_command(state: &mut SimState, command: &Command) -> bool {
    let applied = match command {
        Command::ToggleSafetyTile { pos } => toggle_safety_tile(state, *pos),
        Command::ToggleSwitch { letter } => toggle_switch_state(state, *letter),
        Command::EmergencyHalt {
            center,
            radius,
            ticks,
        } => *ticks > 0 && state.halts.trigger(*center, *radius, *ticks),
    };
    if applied {
        tracing::debug!(?command, tick = state.meta.tick, "command applied");
    } else {
        tracing::debug!(?command, tick = state.meta.tick, "command rejected");
    }
    applied
}

pub(crate) fn apply_commands(state: &mut SimState, commands: &[Command]) {
    for command in commands {
        apply_command(state, command);
    }
}
