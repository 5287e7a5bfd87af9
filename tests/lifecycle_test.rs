use step_ngin::{EngineState, HeadlessBackend, LoopControl, render::Surface};

use crate::common::test_utils::{FRAME, TestBoard, two_part_glb};

mod common;

#[test]
fn should_unmount_before_anything_was_acquired() {
    let mut board = TestBoard::new(&[]);
    board.engine.unmount();
    assert_eq!(board.engine.state(), EngineState::Disposed);
    assert!(board.errors().is_empty());
}

#[test]
fn should_stop_after_failed_acquisition() {
    let mut board = TestBoard::new(&[]);
    let result = board
        .engine
        .attach_context(Err(anyhow::anyhow!("webgl unavailable")), (1280, 720));
    assert!(result.is_err());
    assert_eq!(board.engine.state(), EngineState::Error);
    assert_eq!(board.errors(), vec!["failed to initialize rendering context".to_string()]);

    board.engine.start_loop(0.0);
    assert_eq!(board.engine.frame(FRAME), LoopControl::Stop);
    board.engine.unmount();
    assert_eq!(board.engine.state(), EngineState::Disposed);
}

#[test]
fn should_release_partial_scene_on_unmount() {
    let mut board = TestBoard::new(&[4]);
    let backend = board.backend.take().unwrap();
    board.engine.attach_context(Ok(backend), (1280, 720)).unwrap();
    board.engine.build_scene();
    assert_eq!(board.engine.state(), EngineState::Initializing);

    board.engine.unmount();
    assert_eq!(board.probe.leaked_at_dispose(), Some(0));
    assert_eq!(board.probe.double_disposals(), 0);
    assert_eq!(board.probe.live_geometries(), 0);
    assert_eq!(board.probe.live_materials(), 0);
    assert_eq!(board.probe.live_lights(), 0);
}

#[test]
fn should_release_everything_in_order_when_ready() {
    let mut board = TestBoard::mounted(&[1, 2, 3]);
    board.source.settle(Ok(two_part_glb()));
    board.run_frames(FRAME, 100.0);
    assert!(board.engine.token().is_some());

    board.engine.unmount();
    assert_eq!(board.engine.state(), EngineState::Disposed);
    // every resource was released individually before the context went away
    assert_eq!(board.probe.leaked_at_dispose(), Some(0));
    assert_eq!(board.probe.double_disposals(), 0);
    assert!(board.engine.context().is_none());
    assert!(board.engine.board().is_none());
    assert!(board.engine.token().is_none());
}

#[test]
fn should_not_draw_after_unmount() {
    let mut board = TestBoard::mounted(&[]);
    board.run_frames(FRAME, 500.0);
    let draws = board.probe.draws();
    assert!(draws > 0);

    board.engine.unmount();
    for i in 0..120 {
        assert_eq!(board.engine.frame(500.0 + i as f64 * FRAME), LoopControl::Stop);
    }
    assert_eq!(board.probe.draws(), draws);
}

#[test]
fn should_discard_model_arriving_after_unmount() {
    let mut board = TestBoard::mounted(&[]);
    board.engine.unmount();
    assert!(!board.source.settle(Ok(two_part_glb())));
    board.engine.frame(FRAME);
    assert_eq!(board.load_complete(), 0);
    assert_eq!(board.probe.live_resources(), 0);
}

#[test]
fn should_report_lost_context_and_stop() {
    let mut board = TestBoard::mounted(&[]);
    board.run_frames(FRAME, 100.0);
    let draws = board.probe.draws();

    board.probe.lose_context();
    let mut now = 100.0;
    let control = loop {
        now += FRAME;
        let control = board.engine.frame(now);
        if control == LoopControl::Stop || now > 1_000.0 {
            break control;
        }
    };
    assert_eq!(control, LoopControl::Stop);
    assert_eq!(board.events.borrow().context_lost, 1);
    assert_eq!(board.engine.state(), EngineState::Error);
    assert!(board.errors().is_empty());
    let looping = board.engine.context().map(|ctx| ctx.render_loop.is_active());
    assert_eq!(looping, Some(false));

    // no more frames, no more notifications
    board.run_frames(now + FRAME, now + 500.0);
    assert_eq!(board.events.borrow().context_lost, 1);
    assert_eq!(board.probe.draws(), draws);

    board.engine.unmount();
    assert_eq!(board.probe.leaked_at_dispose(), Some(0));
}

#[test]
fn should_resize_only_when_ready() {
    let mut board = TestBoard::mounted(&[]);
    board.engine.resize(800, 600);
    assert_eq!(board.probe.size(), (800, 600));
    board.engine.resize(0, 600);
    assert_eq!(board.probe.size(), (800, 600));

    board.engine.unmount();
    board.engine.resize(1920, 1080);
    assert_eq!(board.probe.size(), (800, 600));
}

#[test]
fn should_start_from_mount_size_when_surface_was_unsized() {
    let mut board = TestBoard::new(&[]);
    // a canvas that had no layout yet when the context was created
    let backend = HeadlessBackend::new(0, 0);
    board.probe = backend.probe();
    board.backend = Some(backend);
    board.mount(0.0);

    assert_eq!(board.probe.size(), (1280, 720));
    board.engine.frame(FRAME);
    assert_eq!(board.probe.draws(), 1);
}

#[test]
fn should_draw_translucent_special_cells_last() {
    let mut board = TestBoard::mounted(&[5, 10]);
    board.engine.frame(FRAME);

    let batches = board.probe.last_frame_batches();
    assert_eq!(batches.first(), Some(&(Surface::Opaque, 98)));
    assert_eq!(batches.last(), Some(&(Surface::Translucent, 2)));
    let outlines: u32 = batches
        .iter()
        .filter(|(surface, _)| *surface == Surface::Lines)
        .map(|(_, count)| count)
        .sum();
    assert_eq!(outlines, 100);

    let board_cells = board.engine.board().unwrap();
    assert_eq!(board_cells.len(), 100);
    let special: Vec<u32> = board_cells
        .cells()
        .iter()
        .filter(|cell| cell.special)
        .map(|cell| cell.index)
        .collect();
    assert_eq!(special, vec![5, 10]);
}
