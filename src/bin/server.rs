//! Episode Talk Maker server binary.
//! Run with: cargo run --bin episode-talk-server

use std::process::ExitCode;

use episode_talk_maker::start_talk_server;

fn main() -> ExitCode {
    start_talk_server::run()
}
