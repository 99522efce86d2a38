pub mod clip_store;
pub mod dispatcher;
pub mod persistence;
pub mod playback;
pub mod project;
pub mod selector;
