use crate::{commands, models::data::Data, util::alias::Error};

pub fn create_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        commands::music::join::join(),
        commands::music::leave::leave(),
        commands::music::play::play(),
        commands::music::replay::replay(),
    ]
}
