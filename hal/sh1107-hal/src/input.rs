//! Inbound command byte queue
//!
//! The processor pulls opcode and operand bytes one at a time, only when it
//! is ready to act on them. A single byte of lookahead is enough: the
//! producer must not outrun the consumer.

use heapless::spsc::{Consumer, Queue};
use heapless::Deque;

/// Source of inbound command and operand bytes
pub trait CommandSource {
    /// Look at the next byte without consuming it
    fn peek(&self) -> Option<u8>;

    /// Consume the next byte
    fn pop(&mut self) -> Option<u8>;

    /// A byte is waiting
    fn has_data(&self) -> bool {
        self.peek().is_some()
    }
}

impl<T: CommandSource + ?Sized> CommandSource for &mut T {
    fn peek(&self) -> Option<u8> {
        (**self).peek()
    }

    fn pop(&mut self) -> Option<u8> {
        (**self).pop()
    }
}

impl<const N: usize> CommandSource for Deque<u8, N> {
    fn peek(&self) -> Option<u8> {
        self.front().copied()
    }

    fn pop(&mut self) -> Option<u8> {
        self.pop_front()
    }
}

impl<const N: usize> CommandSource for Queue<u8, N> {
    fn peek(&self) -> Option<u8> {
        Queue::peek(self).copied()
    }

    fn pop(&mut self) -> Option<u8> {
        self.dequeue()
    }
}

/// Consumer half of a split SPSC queue, for a producer in interrupt context
impl<const N: usize> CommandSource for Consumer<'_, u8, N> {
    fn peek(&self) -> Option<u8> {
        Consumer::peek(self).copied()
    }

    fn pop(&mut self) -> Option<u8> {
        self.dequeue()
    }
}
