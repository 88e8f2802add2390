mod config_cmd;
mod request;
mod sync_cmd;
mod task;

pub use config_cmd::ConfigCommand;
pub use request::RequestCommand;
pub use sync_cmd::SyncCommand;
pub use task::TaskCommand;
