//! Edition-number supply
//!
//! Every edition number of the run is produced once, up front, and handed out
//! one per accepted edition.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;

fn numbers(first: u32, count: u32) -> impl Iterator<Item = u32> {
    (0..count).map_while(move |offset| first.checked_add(offset))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditionSupply {
    numbers: VecDeque<u32>,
}

impl EditionSupply {
    /// Sequential numbers `first, first + 1, ...`, `count` of them, stopping
    /// early at `u32::MAX`.
    pub fn new(first: u32, count: u32) -> Self {
        Self {
            numbers: numbers(first, count).collect(),
        }
    }

    /// The same numbers in random order.
    pub fn shuffled<R: Rng + ?Sized>(first: u32, count: u32, rng: &mut R) -> Self {
        let mut numbers: Vec<u32> = numbers(first, count).collect();
        numbers.shuffle(rng);
        Self {
            numbers: numbers.into(),
        }
    }

    /// Number the next accepted edition will get.
    pub fn peek(&self) -> Option<u32> {
        self.numbers.front().copied()
    }

    /// Consume the next number.
    pub fn take(&mut self) -> Option<u32> {
        self.numbers.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.numbers.len()
    }
}
