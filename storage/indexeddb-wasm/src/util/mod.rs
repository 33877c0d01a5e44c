pub mod cb_future;
pub mod cb_race;
pub mod require;

pub use cb_future::CBFuture;
pub use cb_race::CBRace;
pub use require::Require;
