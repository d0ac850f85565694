pub mod preview;
pub mod score_poller;

pub use preview::render_preview;
pub use score_poller::ScorePoller;
