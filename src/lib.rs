pub mod assets;
pub mod avatars;
pub mod config;
pub mod http_client;
pub mod identity;
pub mod model;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod players;
pub mod prompt;
pub mod session;
pub mod src_api;
pub mod timeline;
pub mod twitch;
pub mod youtube;
