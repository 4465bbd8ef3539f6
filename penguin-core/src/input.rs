/// A single directional input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
}

/// Directions currently held down. Any subset is valid, including opposing pairs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldDirections {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl HeldDirections {
    pub const NONE: HeldDirections = HeldDirections { up: false, down: false, left: false, right: false };

    pub fn only(direction: Direction) -> Self {
        let mut held = Self::NONE;
        held.press(direction);
        held
    }

    pub fn press(&mut self, direction: Direction) {
        self.set(direction, true);
    }

    pub fn release(&mut self, direction: Direction) {
        self.set(direction, false);
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }

    fn set(&mut self, direction: Direction, held: bool) {
        match direction {
            Direction::Up => self.up = held,
            Direction::Down => self.down = held,
            Direction::Left => self.left = held,
            Direction::Right => self.right = held,
        }
    }
}

impl FromIterator<Direction> for HeldDirections {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        let mut held = HeldDirections::NONE;
        for direction in iter {
            held.press(direction);
        }
        held
    }
}
