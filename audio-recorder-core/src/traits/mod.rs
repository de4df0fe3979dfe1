pub mod audio_cue;
pub mod input_provider;
pub mod path_resolver;
pub mod permission;
pub mod player;
pub mod session_gateway;
