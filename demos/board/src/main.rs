use std::{thread, time::Duration};

use step_ngin::{BoardSetup, EngineConfig, EngineError, EngineListener, run};

struct Log;

impl EngineListener for Log {
    fn on_load_complete(&mut self) {
        log::info!("token placed");
    }

    fn on_error(&mut self, error: &EngineError) {
        log::error!("board error: {}", error);
    }

    fn on_context_lost(&mut self) {
        log::error!("context lost, restart the demo");
    }
}

fn main() -> anyhow::Result<()> {
    let setup = BoardSetup::new("pawn.glb", [4, 9, 16, 25, 36, 49, 64, 81].into_iter().collect());
    run(setup, EngineConfig::default(), Box::new(Log), |handle| {
        // a dice-rolling player: one to six cells per turn until the end of the path
        thread::spawn(move || {
            let mut step = 0;
            let mut roll = 3u32;
            while step < step_ngin::BOARD_CELLS {
                thread::sleep(Duration::from_millis(1500));
                roll = roll * 5 % 7;
                step = (step + roll).min(step_ngin::BOARD_CELLS);
                if !handle.set_step(step) {
                    return;
                }
            }
        });
    })
}
