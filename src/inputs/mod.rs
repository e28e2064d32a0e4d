pub mod key_router;
pub mod swipe;

pub use key_router::KeyRouter;
pub use swipe::{SwipeTracker, SWIPE_DEAD_ZONE};
