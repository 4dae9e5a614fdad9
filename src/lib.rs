pub mod board;
pub mod errors;
pub mod eval;
pub mod logging;
pub mod movegen;
pub mod perft;
pub mod search;
pub mod state;
pub mod time;
pub mod tt;
pub mod uci;
pub mod zobrist;

use std::env;
use std::thread;

/// One-time setup of every global table. Idempotent, so tests call it
/// freely.
pub fn init_static_tables() {
    zobrist::init_zobrist();
    board::init_tables();
    search::init_lmr();
}

pub fn run_cli() {
    logging::init_logging();
    init_static_tables();

    let args: Vec<String> = env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "perft" => {
                perft::run_perft_suite();
                return;
            }
            "eval" => {
                let pos = state::Position::new();
                println!("eval: {}", eval::evaluate(&pos));
                return;
            }
            "bench" => {
                let mut pos = state::Position::new();
                let mut searcher = search::Searcher::new(16);
                println!("bench: startpos to depth 10");
                searcher.think(&mut pos, 10, 0, true);
                return;
            }
            _ => {}
        }
    }

    // The recursive search wants more stack than some platforms hand the
    // main thread.
    let builder = thread::Builder::new()
        .name("uci_thread".into())
        .stack_size(32 * 1024 * 1024);
    let handle = builder
        .spawn(uci::uci_loop)
        .expect("failed to spawn uci thread");
    let _ = handle.join();
}
