//! Fixed-size seat pool.

/// The seats of one room, `0..capacity`.
///
/// Allocation always returns the lowest free index. The pool is small
/// (tens of seats) so a linear scan over a flag per seat is all it needs.
#[derive(Debug, Clone)]
pub struct SeatPool {
    taken: Vec<bool>,
}

impl SeatPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            taken: vec![false; capacity],
        }
    }

    /// Reserves the lowest free seat.
    pub fn acquire(&mut self) -> Option<usize> {
        let index = self.taken.iter().position(|taken| !taken)?;
        self.taken[index] = true;
        Some(index)
    }

    /// Frees `index`. Returns `false` if it was not taken.
    pub fn release(&mut self, index: usize) -> bool {
        match self.taken.get_mut(index) {
            Some(taken) if *taken => {
                *taken = false;
                true
            }
            _ => false,
        }
    }

    /// Occupied seat indices in ascending order.
    pub fn occupied(&self) -> Vec<usize> {
        self.taken
            .iter()
            .enumerate()
            .filter_map(|(index, taken)| taken.then_some(index))
            .collect()
    }
}
