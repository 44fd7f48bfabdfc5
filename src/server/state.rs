use crate::gym::Gym;
use crate::places::{GymFinder, MapsClient};
use std::sync::Mutex;

pub struct AppState {
    pub gyms: Vec<Gym>,
    pub finder: Mutex<GymFinder<MapsClient>>,
}
