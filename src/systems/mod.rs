mod aircraft;
mod airlines;
mod runways;
mod tower;
mod traffic;
mod weather;

pub use aircraft::AircraftSystem;
pub use airlines::AirlineSystem;
pub use runways::RunwaySystem;
pub use tower::TowerSystem;
pub use traffic::TrafficSystem;
pub use weather::WeatherSystem;
