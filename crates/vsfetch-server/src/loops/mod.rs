//! Background loops.

pub mod poll_loop;
