//! Switch controller: entry counters, deferred flips, and signal severity.

use ahash::AHashSet;

use crate::{Event, EventEnvelope, EventLevel, Pos, Signal, SimState, SwitchId, SwitchMode};

/// Counts every train standing on a switch cell, once per tick it stands
/// there. Disabled counters (K = 0) never move off zero.
pub(crate) fn update_counters(state: &mut SimState) {
    let entries: Vec<(SwitchId, usize)> = state
        .trains
        .active()
        .filter_map(|train| {
            let id = state.grid.switch_id(train.pos)?;
            Some((id, train.heading.index()))
        })
        .collect();

    for (id, direction_index) in entries {
        let Some(switch) = state.switches.get_mut(id) else {
            continue;
        };
        let index = match switch.mode {
            SwitchMode::Global => 0,
            SwitchMode::PerDirection => direction_index,
        };
        if switch.thresholds[index] > 0 {
            switch.counters[index] += 1;
        }
    }
}

/// Marks a pending flip for every counter that reached its K-value and resets it.
pub(crate) fn schedule_flips(state: &mut SimState) {
    for switch in state.switches.iter_mut() {
        let relevant = match switch.mode {
            SwitchMode::Global => 1,
            SwitchMode::PerDirection => 4,
        };
        for index in 0..relevant {
            let k = switch.thresholds[index];
            if k > 0 && switch.counters[index] >= k {
                switch.pending_flip = true;
                switch.counters[index] = 0;
            }
        }
    }
}

/// Toggles every switch with a pending flip. Runs only after movement commits.
pub(crate) fn apply_deferred_flips(state: &mut SimState, events: &mut Vec<EventEnvelope>) {
    let current_tick = state.meta.tick;
    let mut flipped = Vec::new();
    for switch in state.switches.iter_mut().filter(|s| s.pending_flip) {
        switch.state ^= 1;
        switch.pending_flip = false;
        flipped.push((switch.id, switch.state));
    }

    for (switch_id, new_state) in flipped {
        state.counters.switch_flips += 1;
        tracing::debug!(switch = %switch_id, state = new_state, tick = current_tick, "switch flipped");
        events.push(crate::emit(
            &mut state.counters,
            current_tick,
            Event::SwitchFlipped {
                switch_id,
                state: new_state,
            },
        ));
    }
}

/// Severity seen from one switch cell: any train one step away is `Red`,
/// otherwise any train two steps away in a straight line is `Yellow`.
pub fn signal_at(cell: Pos, occupied: &AHashSet<Pos>) -> Signal {
    let mut signal = Signal::Green;
    for direction in crate::Direction::ALL {
        let near = cell.step(direction);
        if occupied.contains(&near) {
            return Signal::Red;
        }
        if occupied.contains(&near.step(direction)) {
            signal = Signal::Yellow;
        }
    }
    signal
}

/// Recomputes every switch signal from scratch against current positions.
pub(crate) fn compute_signals(
    state: &mut SimState,
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let occupied: AHashSet<Pos> = state.trains.active().map(|train| train.pos).collect();
    let mut severity = [Signal::Green; SwitchId::COUNT];
    for (pos, kind) in state.grid.cells() {
        if let crate::TileKind::Switch(id) = kind {
            let slot = &mut severity[id.index()];
            *slot = (*slot).max(signal_at(pos, &occupied));
        }
    }

    let current_tick = state.meta.tick;
    let mut changed = Vec::new();
    for switch in state.switches.iter_mut() {
        let signal = severity[switch.id.index()];
        if switch.signal != signal {
            switch.signal = signal;
            changed.push((switch.id, signal));
        }
    }

    if event_level == EventLevel::Debug {
        for (switch_id, signal) in changed {
            events.push(crate::emit(
                &mut state.counters,
                current_tick,
                Event::SignalChanged { switch_id, signal },
            ));
        }
    }
}

/// Manual 0↔1 toggle. Returns `false` for letters without a definition.
pub fn toggle_switch_state(state: &mut SimState, letter: char) -> bool {
    let Some(switch) = SwitchId::from_letter(letter).and_then(|id| state.switches.get_mut(id))
    else {
        return false;
    };
    switch.state ^= 1;
    true
}
