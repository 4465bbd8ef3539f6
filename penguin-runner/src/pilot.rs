use penguin_core::{Direction, HeldDirections};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Something that decides which keys are held on each tick.
pub trait Pilot {
    fn next(&mut self) -> HeldDirections;
}

/// Walks a rectangle: right, down, left, up, each for `leg_ticks` ticks.
pub struct PatrolPilot {
    leg_ticks: u32,
    tick: u32,
}

const PATROL_LEGS: [Direction; 4] = [Direction::Right, Direction::Down, Direction::Left, Direction::Up];

impl PatrolPilot {
    pub fn new(leg_ticks: u32) -> Self {
        Self {
            leg_ticks: leg_ticks.max(1),
            tick: 0,
        }
    }
}

impl Pilot for PatrolPilot {
    fn next(&mut self) -> HeldDirections {
        let leg = (self.tick / self.leg_ticks) as usize % PATROL_LEGS.len();
        self.tick = self.tick.wrapping_add(1);
        HeldDirections::only(PATROL_LEGS[leg])
    }
}

/// Holds a random set of keys and reshuffles every `wander_ticks` ticks.
/// Sometimes it stands still, so the idle path of the throttle gets used.
pub struct WanderPilot {
    rng: StdRng,
    wander_ticks: u32,
    remaining: u32,
    held: HeldDirections,
}

impl WanderPilot {
    pub fn new(wander_ticks: u32, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            wander_ticks: wander_ticks.max(1),
            remaining: 0,
            held: HeldDirections::NONE,
        }
    }

    fn reshuffle(&mut self) {
        let mut held = HeldDirections::NONE;
        for direction in Direction::ALL {
            if self.rng.gen_bool(0.3) {
                held.press(direction);
            }
        }
        self.held = held;
    }
}

impl Pilot for WanderPilot {
    fn next(&mut self) -> HeldDirections {
        if self.remaining == 0 {
            self.reshuffle();
            self.remaining = self.wander_ticks;
        }
        self.remaining -= 1;
        self.held
    }
}
