//! Constraint label namespace shared by exported entities.
//!
//! Activities and participants *require* labels; rooms and timeslots
//! *fulfill* them. The solver only places a slot where every required label
//! is fulfilled.

use std::fmt::Display;

/// Required by resolution activities, fulfilled before the deadline.
pub const RESOLUTION: &str = "resolution";

/// Required and fulfilled unless a proxy label is involved.
pub const NO_PROXY: &str = "no-proxy";

const PROXY_PREFIX: &str = "proxy";

/// `availability-room-<id>`
pub fn room(id: impl Display) -> String {
    format!("availability-room-{id}")
}

/// `availability-ak-<id>`
pub fn activity(id: impl Display) -> String {
    format!("availability-ak-{id}")
}

/// `availability-person-<id>`
pub fn person(id: impl Display) -> String {
    format!("availability-person-{id}")
}

/// `availability-participant-<id>`
pub fn participant(id: impl Display) -> String {
    format!("availability-participant-{id}")
}

/// `availability-cat-<name>`
pub fn category(name: &str) -> String {
    format!("availability-cat-{name}")
}

/// `fixed-akslot-<id>`
pub fn fixed_slot(id: impl Display) -> String {
    format!("fixed-akslot-{id}")
}

/// `fixed-room-<id>`
pub fn fixed_room(id: impl Display) -> String {
    format!("fixed-room-{id}")
}

/// `notblock<index>`
pub fn not_block(index: usize) -> String {
    format!("notblock{index}")
}

/// Appends [`NO_PROXY`] unless some label starts with `proxy`.
pub fn add_no_proxy(labels: &mut Vec<String>) {
    if !labels.iter().any(|l| l.starts_with(PROXY_PREFIX)) {
        labels.push(NO_PROXY.to_string());
    }
}

/// Sorts and removes duplicates.
pub fn normalize(mut labels: Vec<String>) -> Vec<String> {
    labels.sort();
    labels.dedup();
    labels
}
