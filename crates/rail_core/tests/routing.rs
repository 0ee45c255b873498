use rail_core::{
    next_direction, smart_direction, switch_direction, Direction, Grid, Pos, SwitchDef,
    SwitchId, SwitchMode, SwitchTable, Train, TrainId,
};

fn grid(rows: &[&str]) -> Grid {
    Grid::from_symbols(rows, 1).unwrap()
}

fn train(pos: Pos, heading: Direction, destination: Option<Pos>) -> Train {
    Train {
        id: TrainId(0),
        pos,
        direction: heading,
        heading,
        color: 0,
        wait_ticks: 0,
        move_counter: 0,
        destination,
        spawn_index: 0,
    }
}

#[test]
fn test_crossing_prefers_shorter_manhattan_route() {
    let g = grid(&["D....", "|....", "+---S"]);
    let dir = smart_direction(&g, Pos::new(2, 0), Direction::Left, Some(Pos::new(0, 0)));
    assert_eq!(dir, Direction::Up);
}

#[test]
fn test_undefined_switch_behaves_as_state_zero() {
    let g = grid(&[".|.", "-Q-", ".|."]);
    let pos = Pos::new(1, 1);
    assert_eq!(
        switch_direction(&g, None, pos, Direction::Up),
        Direction::Up
    );
    let no_straight = grid(&["...", "-Q-", ".|."]);
    assert_eq!(
        switch_direction(&no_straight, None, pos, Direction::Up),
        Direction::Right
    );
}

#[test]
fn test_next_direction_reads_switch_table() {
    let g = grid(&["...", "-A-", "..."]);
    let table = SwitchTable::from_defs(&[SwitchDef {
        letter: 'A',
        mode: SwitchMode::Global,
        initial_state: 1,
        k_values: [1, 0, 0, 0],
    }]);
    assert_eq!(table.get(SwitchId(0)).map(|s| s.state), Some(1));
    // Heading north with no straight exit: state 1 prefers the left turn.
    let t = train(Pos::new(1, 1), Direction::Up, None);
    assert_eq!(next_direction(&g, &table, &t), Direction::Left);
}
