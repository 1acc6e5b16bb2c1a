//! Grouping of commands contributed by extensions.

use poise::Command;

use crate::bot::Data;
use crate::bot::Error;

/// A group of related commands added to the bot together.
pub trait Cog {
    fn commands(&self) -> Vec<Command<Data, Error>>;
}

impl<F> Cog for F
where
    F: Fn() -> Vec<Command<Data, Error>>,
{
    fn commands(&self) -> Vec<Command<Data, Error>> {
        self()
    }
}
