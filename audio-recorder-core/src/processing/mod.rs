pub mod elapsed;
pub mod pcm;
pub mod power;
pub mod time_format;
