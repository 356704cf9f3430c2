mod activity;
mod binding;
mod catalog;
mod client;
mod sim_card;

pub use activity::*;
pub use binding::*;
pub use catalog::*;
pub use client::*;
pub use sim_card::*;
